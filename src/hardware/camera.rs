//! Still-camera backends.
//!
//! The hardware backend drives the Pi camera through the `rpicam-still`
//! command-line program, one process per capture. The simulated backend
//! writes empty placeholder files and records every call.

use crate::config::Resolution;
use crate::error::{Result, SentryError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::process::Command;
use tracing::debug;

/// Camera capability consumed by the image capturer.
#[async_trait]
pub trait CameraDevice: Send {
    /// Set the still resolution. Called before `start`.
    fn configure(&mut self, resolution: Resolution) -> Result<()>;

    /// Bring the sensor up.
    async fn start(&mut self) -> Result<()>;

    /// Release the sensor.
    async fn stop(&mut self) -> Result<()>;

    /// Write one JPEG to `path`.
    async fn capture_to_file(&mut self, path: &Path) -> Result<()>;
}

/// Pi camera driven through `rpicam-still` (or the older `libcamera-still`).
pub struct RpicamCamera {
    command: String,
    resolution: Resolution,
    running: bool,
}

impl RpicamCamera {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            resolution: Resolution::default(),
            running: false,
        }
    }

    /// Arguments for a single non-interactive still capture.
    pub fn still_args(resolution: Resolution, path: &Path) -> Vec<String> {
        vec![
            "--nopreview".to_string(),
            "--immediate".to_string(),
            "--timeout".to_string(),
            "1".to_string(),
            "--width".to_string(),
            resolution.width.to_string(),
            "--height".to_string(),
            resolution.height.to_string(),
            "--encoding".to_string(),
            "jpg".to_string(),
            "--output".to_string(),
            path.display().to_string(),
        ]
    }
}

#[async_trait]
impl CameraDevice for RpicamCamera {
    fn configure(&mut self, resolution: Resolution) -> Result<()> {
        self.resolution = resolution;
        Ok(())
    }

    async fn start(&mut self) -> Result<()> {
        let output = Command::new(&self.command)
            .arg("--list-cameras")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                SentryError::camera_error(format!(
                    "Failed to run {}. Is it installed? ({})",
                    self.command, e
                ))
            })?;

        let listing = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() || listing.contains("No cameras available") {
            return Err(SentryError::camera_error(format!(
                "No camera detected by {}",
                self.command
            )));
        }

        debug!("{} --list-cameras: {}", self.command, listing.trim());
        self.running = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.running = false;
        Ok(())
    }

    async fn capture_to_file(&mut self, path: &Path) -> Result<()> {
        if !self.running {
            return Err(SentryError::camera_error("Camera is not running"));
        }

        let args = Self::still_args(self.resolution, path);
        debug!("{} args: {:?}", self.command, args);

        let output = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                SentryError::camera_error(format!("Failed to spawn {}: {}", self.command, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr.lines().last().unwrap_or("no output").trim().to_string();
            return Err(SentryError::camera_error(format!(
                "{} exited with {}: {}",
                self.command, output.status, reason
            )));
        }

        Ok(())
    }
}

/// Calls recorded by a [`SimulatedCamera`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraLog {
    pub configured: Option<Resolution>,
    pub starts: usize,
    pub stops: usize,
    pub captures: Vec<PathBuf>,
}

#[derive(Debug, Default)]
struct SimulatedCameraState {
    log: CameraLog,
    fail_captures: bool,
}

/// Camera stand-in for mock mode: captures produce empty files.
///
/// Clones share the same call log.
#[derive(Debug, Clone, Default)]
pub struct SimulatedCamera {
    state: Arc<Mutex<SimulatedCameraState>>,
}

impl SimulatedCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following capture fail with a camera error.
    pub fn fail_captures(&self, fail: bool) {
        self.lock().fail_captures = fail;
    }

    /// Snapshot of the calls made so far.
    pub fn log(&self) -> CameraLog {
        self.lock().log.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimulatedCameraState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CameraDevice for SimulatedCamera {
    fn configure(&mut self, resolution: Resolution) -> Result<()> {
        self.lock().log.configured = Some(resolution);
        Ok(())
    }

    async fn start(&mut self) -> Result<()> {
        self.lock().log.starts += 1;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.lock().log.stops += 1;
        Ok(())
    }

    async fn capture_to_file(&mut self, path: &Path) -> Result<()> {
        let fail = self.lock().fail_captures;
        if fail {
            return Err(SentryError::camera_error("Simulated capture failure"));
        }

        tokio::fs::File::create(path).await?;
        debug!("[MOCK] Would capture image to {}", path.display());
        self.lock().log.captures.push(path.to_path_buf());
        Ok(())
    }
}
