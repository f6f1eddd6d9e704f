//! Static-secret authentication for the receiver routes.

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;
use tracing::error;

/// JSON error reply, `{"error": message}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    basic_challenge: bool,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            basic_challenge: false,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    fn with_basic_challenge(mut self) -> Self {
        self.basic_challenge = true;
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(json!({ "error": self.message }))).into_response();
        if self.basic_challenge {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"Admin\""),
            );
        }
        response
    }
}

/// Compare secrets without short-circuiting on the first differing byte.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::AUTHORIZATION)?.to_str().ok()
}

fn unconfigured(key_name: &str) -> ApiError {
    error!("{} not configured", key_name);
    ApiError::internal("Server configuration error")
}

/// Require `Authorization: Bearer <expected>`.
///
/// `key_name` names the setting in the log when no secret is configured.
pub fn require_bearer(
    headers: &HeaderMap,
    expected: Option<&str>,
    key_name: &str,
) -> Result<(), ApiError> {
    let expected = expected.ok_or_else(|| unconfigured(key_name))?;

    let value = authorization(headers)
        .ok_or_else(|| ApiError::unauthorized("Authorization header required"))?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("Bearer token required"))?;

    if !constant_time_eq(token.as_bytes(), expected.as_bytes()) {
        return Err(ApiError::unauthorized("Invalid token"));
    }
    Ok(())
}

/// Require HTTP Basic credentials whose password is `expected`; the user
/// name is ignored.
pub fn require_basic(headers: &HeaderMap, expected: Option<&str>) -> Result<(), ApiError> {
    let expected = expected.ok_or_else(|| unconfigured("ADMIN_API_KEY"))?;
    let challenge = |message: &str| ApiError::unauthorized(message).with_basic_challenge();

    let value = authorization(headers).ok_or_else(|| challenge("Authentication required"))?;
    let encoded = value
        .strip_prefix("Basic ")
        .ok_or_else(|| challenge("Basic authentication required"))?;

    let credentials = STANDARD
        .decode(encoded.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| challenge("Invalid credentials format"))?;

    let password = credentials
        .split_once(':')
        .map(|(_, password)| password)
        .filter(|password| !password.is_empty())
        .ok_or_else(|| challenge("Password required"))?;

    if !constant_time_eq(password.as_bytes(), expected.as_bytes()) {
        return Err(challenge("Invalid credentials"));
    }
    Ok(())
}
