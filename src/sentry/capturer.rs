//! Still-image capture.

use crate::config::Resolution;
use crate::error::{Result, SentryError};
use crate::hardware::CameraDevice;
use chrono::{DateTime, Local, TimeZone};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time;
use tracing::debug;

/// Sensor settling time after the camera starts.
pub const CAMERA_WARMUP: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CameraState {
    Idle,
    Running,
    Stopped,
}

/// Owns the camera and writes captures into one directory.
pub struct ImageCapturer {
    camera: Box<dyn CameraDevice>,
    captures_dir: PathBuf,
    warmup: Duration,
    state: CameraState,
}

impl ImageCapturer {
    /// Configure `camera` for `resolution`; captures land in `captures_dir`.
    pub fn new(
        mut camera: Box<dyn CameraDevice>,
        captures_dir: impl Into<PathBuf>,
        resolution: Resolution,
    ) -> Result<Self> {
        camera.configure(resolution)?;
        Ok(Self {
            camera,
            captures_dir: captures_dir.into(),
            warmup: CAMERA_WARMUP,
            state: CameraState::Idle,
        })
    }

    /// Override the post-start settling time.
    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn captures_dir(&self) -> &Path {
        &self.captures_dir
    }

    /// Start the camera and let the sensor settle. Required before capturing.
    pub async fn start(&mut self) -> Result<()> {
        if self.state == CameraState::Running {
            return Ok(());
        }
        self.camera.start().await?;
        self.state = CameraState::Running;
        time::sleep(self.warmup).await;
        debug!("Camera started");
        Ok(())
    }

    /// Capture one image.
    ///
    /// Without a filename the name is derived from the local wall clock as
    /// `capture_YYYYMMDD_HHMMSS.jpg`. Returns the full path written.
    pub async fn capture(&mut self, filename: Option<&str>) -> Result<PathBuf> {
        if self.state != CameraState::Running {
            return Err(SentryError::camera_error("Camera not started"));
        }

        let filename = match filename {
            Some(name) => name.to_string(),
            None => capture_filename(&Local::now()),
        };

        tokio::fs::create_dir_all(&self.captures_dir).await?;
        let path = self.captures_dir.join(filename);
        self.camera.capture_to_file(&path).await?;

        debug!("Captured image to {}", path.display());
        Ok(path)
    }

    /// Stop the camera. Safe to call more than once.
    pub async fn stop(&mut self) -> Result<()> {
        if self.state == CameraState::Stopped {
            return Ok(());
        }
        self.state = CameraState::Stopped;
        self.camera.stop().await
    }
}

/// Timestamped capture name, e.g. `capture_20240131_235959.jpg`.
pub fn capture_filename<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("capture_%Y%m%d_%H%M%S.jpg").to_string()
}

/// Capture once with a freshly started camera, stopping it afterwards even
/// when the capture fails.
pub async fn capture_single_image(
    capturer: &mut ImageCapturer,
    filename: Option<&str>,
) -> Result<PathBuf> {
    capturer.start().await?;
    let captured = capturer.capture(filename).await;
    let stopped = capturer.stop().await;
    let path = captured?;
    stopped?;
    Ok(path)
}
