//! Appliance configuration.
//!
//! Settings are loaded once at process start (defaults, then the
//! environment, then command-line overrides) and never change afterwards.

use crate::error::{Result, SentryError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default BCM pin of the PIR sensor output (physical pin 11).
pub const DEFAULT_PIR_PIN: u8 = 17;

/// Default BCM pin of the status LED (physical pin 15).
pub const DEFAULT_LED_PIN: u8 = 22;

/// Default upload endpoint.
pub const DEFAULT_API_ENDPOINT: &str = "https://sentry.nullpixels.com/capture";

/// Default SoC temperature source.
pub const DEFAULT_THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Still-image resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Resolution {
    // Keeps a Pi Zero comfortably within its memory and thermal budget.
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Static settings for the sentry appliance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentryConfig {
    /// BCM pin number of the PIR sensor
    pub pir_pin: u8,
    /// BCM pin number of the status LED
    pub led_pin: u8,
    /// Capture resolution
    pub resolution: Resolution,
    /// Idle period after each capture
    pub cooldown: Duration,
    /// PIR settling time before readings are trusted
    pub calibration: Duration,
    /// Camera sensor settling time after start
    pub camera_warmup: Duration,
    /// Delay before the simulated sensor reports motion
    pub simulated_motion_delay: Duration,
    /// Directory captures are written to
    pub captures_dir: PathBuf,
    /// Upload endpoint URL
    pub api_endpoint: String,
    /// Bearer token sent with uploads
    pub api_key: String,
    /// Upload request timeout
    pub api_timeout: Duration,
    /// Whether captures are uploaded at all
    pub upload_enabled: bool,
    /// Substitute simulated hardware for GPIO and camera
    pub mock_hardware: bool,
    /// Enable debug logging
    pub debug: bool,
    /// Still-capture program used by the camera backend
    pub camera_command: String,
    /// SoC temperature file logged with each capture
    pub thermal_zone: Option<PathBuf>,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            pir_pin: DEFAULT_PIR_PIN,
            led_pin: DEFAULT_LED_PIN,
            resolution: Resolution::default(),
            cooldown: Duration::from_secs(5),
            calibration: Duration::from_secs(30),
            camera_warmup: Duration::from_millis(500),
            simulated_motion_delay: Duration::from_secs(2),
            captures_dir: PathBuf::from("captures"),
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            api_key: String::new(),
            api_timeout: Duration::from_secs(30),
            upload_enabled: true,
            mock_hardware: false,
            debug: false,
            camera_command: "rpicam-still".to_string(),
            thermal_zone: Some(PathBuf::from(DEFAULT_THERMAL_ZONE)),
        }
    }
}

impl SentryConfig {
    /// Load configuration from the process environment over the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup over the defaults.
    ///
    /// Recognised keys: `MOCK_HARDWARE`, `DEBUG`, `API_UPLOAD_ENABLED`,
    /// `API_ENDPOINT`, `API_KEY` and `CAPTURES_DIR`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("MOCK_HARDWARE") {
            config.mock_hardware = env_flag(&value);
        }
        if let Some(value) = lookup("DEBUG") {
            config.debug = env_flag(&value);
        }
        if let Some(value) = lookup("API_UPLOAD_ENABLED") {
            config.upload_enabled = env_flag(&value);
        }
        if let Some(endpoint) = lookup("API_ENDPOINT").filter(|v| !v.is_empty()) {
            config.api_endpoint = endpoint;
        }
        if let Some(key) = lookup("API_KEY") {
            config.api_key = key;
        }
        if let Some(dir) = lookup("CAPTURES_DIR").filter(|v| !v.is_empty()) {
            config.captures_dir = PathBuf::from(dir);
        }

        config
    }

    /// Switch between simulated and real hardware.
    pub fn with_mock_hardware(mut self, mock: bool) -> Self {
        self.mock_hardware = mock;
        self
    }

    /// Set the captures directory.
    pub fn with_captures_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.captures_dir = dir.into();
        self
    }

    /// Set the upload endpoint and bearer token.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.api_endpoint = endpoint.into();
        self.api_key = api_key.into();
        self
    }

    /// Enable or disable uploads.
    pub fn with_upload(mut self, enabled: bool) -> Self {
        self.upload_enabled = enabled;
        self
    }

    /// Set the post-capture cooldown.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Set the PIR calibration period.
    pub fn with_calibration(mut self, calibration: Duration) -> Self {
        self.calibration = calibration;
        self
    }

    /// Set the camera warm-up period.
    pub fn with_camera_warmup(mut self, warmup: Duration) -> Self {
        self.camera_warmup = warmup;
        self
    }

    /// Set how long the simulated sensor waits before reporting motion.
    pub fn with_simulated_motion_delay(mut self, delay: Duration) -> Self {
        self.simulated_motion_delay = delay;
        self
    }

    /// Set the upload request timeout.
    pub fn with_api_timeout(mut self, timeout: Duration) -> Self {
        self.api_timeout = timeout;
        self
    }

    /// Set or clear the SoC temperature source.
    pub fn with_thermal_zone(mut self, path: Option<PathBuf>) -> Self {
        self.thermal_zone = path;
        self
    }

    /// Check the settings for combinations the appliance cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.resolution.width == 0 || self.resolution.height == 0 {
            return Err(SentryError::config_error(format!(
                "Invalid capture resolution {}",
                self.resolution
            )));
        }

        if self.pir_pin == self.led_pin {
            return Err(SentryError::config_error(format!(
                "PIR and LED cannot share GPIO {}",
                self.pir_pin
            )));
        }

        if self.upload_enabled
            && !(self.api_endpoint.starts_with("http://") || self.api_endpoint.starts_with("https://"))
        {
            return Err(SentryError::config_error(format!(
                "Upload endpoint must be an http(s) URL, got '{}'",
                self.api_endpoint
            )));
        }

        Ok(())
    }
}

/// Parse a boolean environment toggle.
///
/// `1`, `true`, `yes` and `on` (any case) are true; anything else,
/// including an empty string, is false.
pub fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_appliance() {
        let config = SentryConfig::default();
        assert_eq!(config.pir_pin, 17);
        assert_eq!(config.led_pin, 22);
        assert_eq!(config.resolution, Resolution::new(1280, 720));
        assert_eq!(config.cooldown, Duration::from_secs(5));
        assert_eq!(config.calibration, Duration::from_secs(30));
        assert_eq!(config.api_timeout, Duration::from_secs(30));
        assert!(config.upload_enabled);
        assert!(!config.mock_hardware);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_flag_parsing() {
        assert!(env_flag("1"));
        assert!(env_flag("TRUE"));
        assert!(env_flag(" yes "));
        assert!(!env_flag("0"));
        assert!(!env_flag(""));
        assert!(!env_flag("maybe"));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = SentryConfig::from_lookup(lookup_from(&[
            ("MOCK_HARDWARE", "1"),
            ("DEBUG", "0"),
            ("API_UPLOAD_ENABLED", "0"),
            ("API_KEY", "secret"),
            ("CAPTURES_DIR", "/tmp/pi-sentry"),
        ]));

        assert!(config.mock_hardware);
        assert!(!config.debug);
        assert!(!config.upload_enabled);
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.captures_dir, PathBuf::from("/tmp/pi-sentry"));
        assert_eq!(config.api_endpoint, DEFAULT_API_ENDPOINT);
    }

    #[test]
    fn test_empty_lookup_keeps_defaults() {
        let config = SentryConfig::from_lookup(|_| None);
        assert!(!config.mock_hardware);
        assert!(config.upload_enabled);
        assert_eq!(config.captures_dir, PathBuf::from("captures"));
    }

    #[test]
    fn test_validate_rejects_shared_pin() {
        let mut config = SentryConfig::default();
        config.led_pin = config.pir_pin;
        assert!(matches!(config.validate(), Err(SentryError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_endpoint_only_when_uploading() {
        let config = SentryConfig::default().with_endpoint("ftp://example.com", "");
        assert!(config.validate().is_err());
        assert!(config.with_upload(false).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_resolution() {
        let mut config = SentryConfig::default();
        config.resolution = Resolution::new(0, 720);
        assert!(config.validate().is_err());
    }
}
