//! Capture upload client.
//!
//! Uploads are a best-effort side channel: every failure is logged and
//! reported as `false`, never as an error, so a flaky network cannot stop
//! the sensing loop.

use crate::config::SentryConfig;
use crate::error::{Result, SentryError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Longest response body excerpt included in failure logs.
const ERROR_BODY_EXCERPT: usize = 100;

/// JSON body of an upload request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapturePayload {
    /// Upload time, ISO-8601 UTC with a `Z` suffix
    pub date: String,
    /// Base64-encoded image bytes
    pub image: String,
}

impl CapturePayload {
    /// Build a payload from raw image bytes.
    pub fn new(image: &[u8], at: DateTime<Utc>) -> Self {
        Self {
            date: at.to_rfc3339_opts(SecondsFormat::Micros, true),
            image: STANDARD.encode(image),
        }
    }
}

/// Why an upload did not succeed.
#[derive(Debug, thiserror::Error)]
enum UploadError {
    #[error("could not read capture: {0}")]
    Read(#[from] std::io::Error),

    #[error("request timed out")]
    Timeout,

    #[error("request failed: {0}")]
    Request(reqwest::Error),

    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Request(err)
        }
    }
}

/// Posts captures to the remote endpoint with a static bearer token.
#[derive(Debug, Clone)]
pub struct CaptureUploader {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl CaptureUploader {
    /// Create an uploader; `timeout` bounds each whole request.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SentryError::config_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &SentryConfig) -> Result<Self> {
        Self::new(&config.api_endpoint, &config.api_key, config.api_timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Upload one image. Returns `true` only on a 2xx response.
    pub async fn upload(&self, path: &Path) -> bool {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        match self.try_upload(path).await {
            Ok(()) => {
                info!("Uploaded: {}", name);
                true
            }
            Err(UploadError::Timeout) => {
                warn!("Upload timeout for {}", name);
                false
            }
            Err(UploadError::Status { status, body }) => {
                warn!("Upload failed ({}): {}", status, body);
                false
            }
            Err(e) => {
                warn!("Upload error for {}: {}", name, e);
                false
            }
        }
    }

    async fn try_upload(&self, path: &Path) -> std::result::Result<(), UploadError> {
        let image = tokio::fs::read(path).await?;
        let payload = CapturePayload::new(&image, Utc::now());

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(UploadError::Status {
            status: status.as_u16(),
            body: body_excerpt(&body),
        })
    }
}

/// Leading part of an error response body, as logged.
fn body_excerpt(body: &str) -> String {
    body.chars().take(ERROR_BODY_EXCERPT).collect()
}
