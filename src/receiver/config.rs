//! Capture receiver configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default receiver port.
pub const DEFAULT_RECEIVER_PORT: u16 = 3050;

/// Largest accepted request body (base64 images are about 4/3 of the JPEG).
pub const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Configuration for the capture receiver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// Host to bind the server to
    pub host: String,
    /// Port to bind the server to
    pub port: u16,
    /// Directory uploaded captures are stored in
    pub captures_dir: PathBuf,
    /// Bearer token devices upload with
    pub api_key: Option<String>,
    /// Secret guarding the admin routes
    pub admin_api_key: Option<String>,
    /// Maximum request body size in bytes
    pub body_limit: usize,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_RECEIVER_PORT,
            captures_dir: PathBuf::from("captures"),
            api_key: None,
            admin_api_key: None,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl ReceiverConfig {
    /// Create a new receiver configuration with custom host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Set the storage directory.
    pub fn with_captures_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.captures_dir = dir.into();
        self
    }

    /// Set the device upload token. Empty strings count as unset.
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.is_empty());
        self
    }

    /// Set the admin secret. Empty strings count as unset.
    pub fn with_admin_api_key(mut self, key: Option<String>) -> Self {
        self.admin_api_key = key.filter(|k| !k.is_empty());
        self
    }

    /// Set the maximum request body size.
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Get the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
