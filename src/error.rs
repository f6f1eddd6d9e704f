//! Error handling for the Pi Sentry crate.

/// A specialized `Result` type for Pi Sentry operations.
pub type Result<T> = std::result::Result<T, SentryError>;

/// The main error type for Pi Sentry hardware and service operations.
///
/// Upload failures never appear here: the uploader reports them as a plain
/// `bool` so they cannot interrupt the sensing loop.
#[derive(Debug, thiserror::Error)]
pub enum SentryError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// GPIO line could not be opened, read or written
    #[error("GPIO error: {0}")]
    Gpio(String),

    /// Camera could not be started, stopped or captured from
    #[error("Camera error: {0}")]
    Camera(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Capture receiver could not bind or serve
    #[error("Receiver error: {0}")]
    Receiver(String),

    /// Generic system error
    #[error("System error: {0}")]
    System(String),
}

impl SentryError {
    /// Create a new GPIO error
    pub fn gpio_error(msg: impl Into<String>) -> Self {
        Self::Gpio(msg.into())
    }

    /// Create a new camera error
    pub fn camera_error(msg: impl Into<String>) -> Self {
        Self::Camera(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new receiver error
    pub fn receiver_error(msg: impl Into<String>) -> Self {
        Self::Receiver(msg.into())
    }

    /// Create a new generic system error
    pub fn system_error(msg: impl Into<String>) -> Self {
        Self::System(msg.into())
    }
}
