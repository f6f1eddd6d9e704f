//! The capture appliance: components and the loop that ties them together.
//!
//! Data flows MotionDetector → SentryLoop → ImageCapturer → file →
//! CaptureUploader, with the StatusIndicator blinking at each transition.

pub mod capturer;
pub mod detector;
pub mod indicator;
pub mod runner;
pub mod shutdown;
pub mod thermal;
pub mod uploader;

// Re-export commonly used items
pub use capturer::{capture_filename, capture_single_image, ImageCapturer, CAMERA_WARMUP};
pub use detector::MotionDetector;
pub use indicator::{StatusIndicator, BLINK_DURATION};
pub use runner::{SentryLoop, SentryReport, SentryState, WAIT_POLL_TIMEOUT};
pub use shutdown::{install_signal_handler, ShutdownFlag};
pub use uploader::{CapturePayload, CaptureUploader};
