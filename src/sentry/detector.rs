//! PIR motion detection.

use crate::error::Result;
use crate::hardware::MotionSource;
use std::time::Duration;
use tokio::time;
use tracing::{debug, info, warn};

/// Motion detector wrapping one exclusively owned motion source.
pub struct MotionDetector {
    source: Box<dyn MotionSource>,
    calibration: Duration,
    released: bool,
}

impl MotionDetector {
    pub fn new(source: Box<dyn MotionSource>, calibration: Duration) -> Self {
        Self {
            source,
            calibration,
            released: false,
        }
    }

    /// Wait for the PIR sensor to settle after power-up.
    pub async fn calibrate(&self) {
        info!(
            "Calibrating PIR sensor ({:.0}s)...",
            self.calibration.as_secs_f64()
        );
        time::sleep(self.calibration).await;
        info!("PIR sensor ready");
    }

    /// Whether motion is present right now.
    pub fn motion_detected(&self) -> Result<bool> {
        self.source.is_active()
    }

    /// Block until motion is seen or `timeout` elapses; `None` waits forever.
    pub async fn wait_for_motion(&self, timeout: Option<Duration>) -> Result<bool> {
        self.source.wait_active(timeout).await
    }

    /// Start monitoring for motion.
    pub fn start(&self) {
        debug!("Motion sensor active on {}", self.source.describe());
    }

    /// Stop monitoring.
    pub fn stop(&self) {
        debug!("Motion sensor stopped");
    }

    /// Release the sensor. Safe to call more than once.
    pub fn cleanup(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.source.release()
    }
}

impl Drop for MotionDetector {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            warn!("Failed to release motion sensor: {}", e);
        }
    }
}
