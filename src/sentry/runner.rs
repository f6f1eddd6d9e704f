//! The sentry control loop.
//!
//! Calibrate, signal readiness, then repeatedly wait for motion, capture,
//! signal, upload and cool down until a shutdown is requested. Hardware is
//! released exactly once on every exit path.

use crate::config::SentryConfig;
use crate::error::Result;
use crate::hardware::Hardware;
use crate::sentry::capturer::ImageCapturer;
use crate::sentry::detector::MotionDetector;
use crate::sentry::indicator::{StatusIndicator, BLINK_DURATION};
use crate::sentry::shutdown::ShutdownFlag;
use crate::sentry::thermal;
use crate::sentry::uploader::CaptureUploader;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, error, info, warn};

/// How long one motion wait lasts before the shutdown flag is re-checked.
pub const WAIT_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentryState {
    Calibrating,
    Ready,
    Waiting,
    Capturing,
    Cooldown,
    ShuttingDown,
    Stopped,
}

/// Totals for one run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentryReport {
    pub captures: u64,
    pub uploads_succeeded: u64,
    pub uploads_failed: u64,
}

/// Motion-triggered capture loop owning all three hardware components.
pub struct SentryLoop {
    detector: MotionDetector,
    capturer: ImageCapturer,
    indicator: StatusIndicator,
    uploader: Option<CaptureUploader>,
    cooldown: Duration,
    thermal_zone: Option<PathBuf>,
    shutdown: ShutdownFlag,
    state: watch::Sender<SentryState>,
    report: SentryReport,
}

impl SentryLoop {
    pub fn new(
        detector: MotionDetector,
        capturer: ImageCapturer,
        indicator: StatusIndicator,
        uploader: Option<CaptureUploader>,
        cooldown: Duration,
    ) -> Self {
        let (state, _) = watch::channel(SentryState::Calibrating);
        Self {
            detector,
            capturer,
            indicator,
            uploader,
            cooldown,
            thermal_zone: None,
            shutdown: ShutdownFlag::new(),
            state,
            report: SentryReport::default(),
        }
    }

    /// Build the loop on the hardware backend the configuration selects.
    pub fn from_config(config: &SentryConfig) -> Result<Self> {
        config.validate()?;
        Self::with_hardware(config, Hardware::from_config(config)?)
    }

    /// Build the loop on already-assembled hardware.
    pub fn with_hardware(config: &SentryConfig, hardware: Hardware) -> Result<Self> {
        let detector = MotionDetector::new(hardware.motion, config.calibration);
        let capturer = ImageCapturer::new(hardware.camera, &config.captures_dir, config.resolution)?
            .with_warmup(config.camera_warmup);
        let indicator = StatusIndicator::new(hardware.led)?;
        let uploader = if config.upload_enabled {
            Some(CaptureUploader::from_config(config)?)
        } else {
            None
        };

        Ok(Self::new(detector, capturer, indicator, uploader, config.cooldown)
            .with_thermal_zone(config.thermal_zone.clone()))
    }

    /// Log the SoC temperature from `path` with each capture.
    pub fn with_thermal_zone(mut self, path: Option<PathBuf>) -> Self {
        self.thermal_zone = path;
        self
    }

    /// Handle for requesting a shutdown, e.g. from a signal handler.
    pub fn shutdown_flag(&self) -> ShutdownFlag {
        self.shutdown.clone()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SentryState> {
        self.state.subscribe()
    }

    /// Run until shutdown is requested or a hardware error occurs.
    ///
    /// Cleanup runs on both paths; a hardware error is returned after it.
    pub async fn run(mut self) -> Result<SentryReport> {
        let outcome = self.monitor().await;
        if let Err(e) = &outcome {
            error!("Unexpected error: {}", e);
        }

        self.set_state(SentryState::ShuttingDown);
        self.cleanup().await;
        self.set_state(SentryState::Stopped);
        info!(
            captures = self.report.captures,
            uploads_succeeded = self.report.uploads_succeeded,
            uploads_failed = self.report.uploads_failed,
            "Shutdown complete"
        );

        outcome.map(|()| self.report)
    }

    async fn monitor(&mut self) -> Result<()> {
        self.set_state(SentryState::Calibrating);
        self.detector.calibrate().await;
        self.detector.start();
        self.capturer.start().await?;

        self.set_state(SentryState::Ready);
        self.indicator.blink(BLINK_DURATION, 2, BLINK_DURATION).await?;
        info!("Monitoring for motion (Ctrl+C to exit)");

        self.set_state(SentryState::Waiting);
        while !self.shutdown.is_requested() {
            if !self.detector.wait_for_motion(Some(WAIT_POLL_TIMEOUT)).await? {
                continue;
            }
            if self.shutdown.is_requested() {
                debug!("Motion ignored, shutdown pending");
                break;
            }
            self.capture_cycle().await?;
        }

        Ok(())
    }

    async fn capture_cycle(&mut self) -> Result<()> {
        self.set_state(SentryState::Capturing);
        info!("Motion detected");

        let path = self.capturer.capture(None).await?;
        self.indicator.blink(BLINK_DURATION, 1, BLINK_DURATION).await?;
        self.report.captures += 1;
        self.log_saved(&path);

        if let Some(uploader) = &self.uploader {
            if uploader.upload(&path).await {
                self.report.uploads_succeeded += 1;
            } else {
                self.report.uploads_failed += 1;
            }
        }

        self.set_state(SentryState::Cooldown);
        time::sleep(self.cooldown).await;
        self.set_state(SentryState::Waiting);
        Ok(())
    }

    fn log_saved(&self, path: &Path) {
        let celsius = self.thermal_zone.as_deref().and_then(thermal::read_celsius);
        match celsius {
            Some(celsius) => info!(cpu_celsius = celsius, "Saved: {}", path.display()),
            None => info!("Saved: {}", path.display()),
        }
    }

    async fn cleanup(&mut self) {
        self.detector.stop();
        if let Err(e) = self.detector.cleanup() {
            warn!("Motion sensor cleanup failed: {}", e);
        }
        if let Err(e) = self.capturer.stop().await {
            warn!("Camera stop failed: {}", e);
        }
        if let Err(e) = self.indicator.cleanup() {
            warn!("Status LED cleanup failed: {}", e);
        }
    }

    fn set_state(&self, state: SentryState) {
        debug!(?state, "Sentry state");
        self.state.send_replace(state);
    }
}
