//! # Pi Sentry - Motion-Triggered Camera for Raspberry Pi
//!
//! Watches a PIR sensor, takes a still photo whenever motion is seen, blinks a
//! status LED and optionally uploads each capture to an HTTP endpoint. Every
//! device has a simulated backend so the whole appliance runs on machines
//! without GPIO or a camera.
//!
//! ## Features
//!
//! - **Sentry loop**: calibrate, wait, capture, upload, cool down, repeat
//! - **Hardware abstraction**: rppal GPIO and `rpicam-still` (feature-gated), or simulation
//! - **Capture upload**: JSON + base64 over HTTPS with bearer auth
//! - **Capture receiver**: the matching axum server, with admin list/delete routes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pi_sentry::{install_signal_handler, SentryConfig, SentryLoop};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SentryConfig::from_env().with_mock_hardware(true);
//!     let sentry = SentryLoop::from_config(&config)?;
//!     install_signal_handler(sentry.shutdown_flag())?;
//!
//!     let report = sentry.run().await?;
//!     println!("{} captures", report.captures);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod hardware;
pub mod receiver;
pub mod sentry;

// Re-export public API
pub use config::{Resolution, SentryConfig};
pub use error::{Result, SentryError};
pub use hardware::{CameraDevice, GpioProvider, Hardware, MotionSource, OutputLine};
pub use receiver::{start_receiver, ReceiverConfig};
pub use sentry::{
    capture_single_image, install_signal_handler, CaptureUploader, ImageCapturer,
    MotionDetector, SentryLoop, SentryReport, SentryState, ShutdownFlag, StatusIndicator,
};
