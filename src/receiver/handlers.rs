//! HTTP handlers for the receiver endpoints.

use crate::receiver::auth::{require_basic, require_bearer, ApiError};
use crate::receiver::ReceiverState;
use crate::sentry::CapturePayload;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Path as UrlPath, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Local, SecondsFormat, TimeZone, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{error, info};

const CAPTURE_FIELDS: [&str; 2] = ["date", "image"];

/// One stored capture as listed by the admin API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCapture {
    pub filename: String,
    pub size: u64,
    pub created_at: String,
    /// Inline `data:` URL of the image
    pub url: String,
    #[serde(skip)]
    created: SystemTime,
}

/// Health check endpoint.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Accept one upload from a device.
pub async fn save_capture(
    State(state): State<Arc<ReceiverState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let body = body.map_err(body_rejection)?;
    let payload = parse_capture_body(&body)?;
    require_bearer(&headers, state.config.api_key.as_deref(), "API_KEY")?;

    let image = STANDARD
        .decode(payload.image.as_bytes())
        .map_err(|_| ApiError::bad_request("image must be valid base64"))?;

    let filename = received_filename(&Local::now());
    info!(
        date = %payload.date,
        image_size = payload.image.len(),
        %filename,
        "Saving capture"
    );

    let path = state.config.captures_dir.join(&filename);
    if let Err(e) = store(&state.config.captures_dir, &path, &image).await {
        error!(error = %e, %filename, "Failed to save capture");
        return Err(ApiError::internal("Failed to save image"));
    }

    info!(%filename, "Capture saved");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Capture saved",
            "filename": filename,
            "date": payload.date,
        })),
    ))
}

/// List stored captures, newest first.
pub async fn list_captures(
    State(state): State<Arc<ReceiverState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_bearer(&headers, state.config.admin_api_key.as_deref(), "ADMIN_API_KEY")?;

    let captures = load_captures(&state.config.captures_dir).await.map_err(|e| {
        error!(error = %e, "Failed to list captures");
        ApiError::internal("Failed to list captures")
    })?;

    Ok(Json(json!({
        "count": captures.len(),
        "captures": captures,
    })))
}

/// Delete one stored capture.
pub async fn delete_capture(
    State(state): State<Arc<ReceiverState>>,
    headers: HeaderMap,
    UrlPath(filename): UrlPath<String>,
) -> Result<Json<Value>, ApiError> {
    require_basic(&headers, state.config.admin_api_key.as_deref())?;
    check_deletable(&filename)?;

    let path = state.config.captures_dir.join(&filename);
    if tokio::fs::metadata(&path).await.is_err() {
        return Err(ApiError::not_found("File not found"));
    }

    tokio::fs::remove_file(&path).await.map_err(|e| {
        error!(error = %e, %filename, "Failed to delete capture");
        ApiError::internal("Failed to delete capture")
    })?;

    info!(%filename, "Capture deleted");
    Ok(Json(json!({
        "success": true,
        "message": "Capture deleted",
        "filename": filename,
    })))
}

/// Validate an upload body field by field so clients get a precise reason.
pub fn parse_capture_body(body: &[u8]) -> Result<CapturePayload, ApiError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|_| ApiError::bad_request("Invalid request"))?;
    let object = value
        .as_object()
        .ok_or_else(|| ApiError::bad_request("Invalid request"))?;

    if let Some(missing) = CAPTURE_FIELDS.iter().find(|f| !object.contains_key(**f)) {
        return Err(ApiError::bad_request(format!(
            "Missing required field: {}",
            missing
        )));
    }

    if let Some(unknown) = object
        .keys()
        .find(|k| !CAPTURE_FIELDS.contains(&k.as_str()))
    {
        return Err(ApiError::bad_request(format!("Unknown field: {}", unknown)));
    }

    let (Some(date), Some(image)) = (object["date"].as_str(), object["image"].as_str()) else {
        return Err(ApiError::bad_request("Invalid request"));
    };

    if image.is_empty() {
        return Err(ApiError::bad_request("image cannot be empty"));
    }

    Ok(CapturePayload {
        date: date.to_string(),
        image: image.to_string(),
    })
}

/// Name for a received image, e.g. `img_01312024235959.png`.
pub fn received_filename<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("img_%m%d%Y%H%M%S.png").to_string()
}

fn body_rejection(rejection: BytesRejection) -> ApiError {
    let status = rejection.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::new(status, "Request body too large")
    } else {
        ApiError::new(status, rejection.body_text())
    }
}

fn check_deletable(filename: &str) -> Result<(), ApiError> {
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
    {
        return Err(ApiError::bad_request("Invalid filename"));
    }
    if !filename.ends_with(".png") {
        return Err(ApiError::bad_request("Only PNG files can be deleted"));
    }
    Ok(())
}

async fn store(dir: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(path, bytes).await
}

async fn load_captures(dir: &Path) -> io::Result<Vec<StoredCapture>> {
    tokio::fs::create_dir_all(dir).await?;
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut captures = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let filename = entry.file_name().to_string_lossy().into_owned();
        if !filename.ends_with(".png") {
            continue;
        }

        let metadata = entry.metadata().await?;
        let created = metadata.created().or_else(|_| metadata.modified())?;
        let bytes = tokio::fs::read(entry.path()).await?;

        captures.push(StoredCapture {
            filename,
            size: metadata.len(),
            created_at: DateTime::<Utc>::from(created).to_rfc3339_opts(SecondsFormat::Millis, true),
            url: format!("data:image/png;base64,{}", STANDARD.encode(&bytes)),
            created,
        });
    }

    captures.sort_by(|a, b| b.created.cmp(&a.created));
    Ok(captures)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejection(body: &str) -> String {
        parse_capture_body(body.as_bytes()).unwrap_err().message
    }

    #[test]
    fn test_valid_body_parses() {
        let payload = parse_capture_body(br#"{"date":"2024-01-01T00:00:00Z","image":"aGk="}"#)
            .unwrap();
        assert_eq!(payload.image, "aGk=");
        assert_eq!(payload.date, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_body_rejections() {
        assert_eq!(rejection(r#"{"image":"aGk="}"#), "Missing required field: date");
        assert_eq!(rejection(r#"{"date":"d"}"#), "Missing required field: image");
        assert_eq!(rejection(r#"{"date":"d","image":""}"#), "image cannot be empty");
        assert_eq!(
            rejection(r#"{"date":"d","image":"aGk=","camera":1}"#),
            "Unknown field: camera"
        );
        assert_eq!(rejection(r#"{"date":1,"image":"aGk="}"#), "Invalid request");
        assert_eq!(rejection("[]"), "Invalid request");
        assert_eq!(rejection("not json"), "Invalid request");
    }

    #[test]
    fn test_received_filename_format() {
        let at = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 7).unwrap();
        assert_eq!(received_filename(&at), "img_01312024235907.png");
    }

    #[test]
    fn test_deletable_names() {
        assert!(check_deletable("img_01312024235907.png").is_ok());
        assert_eq!(check_deletable("../etc.png").unwrap_err().message, "Invalid filename");
        assert_eq!(check_deletable("a\\b.png").unwrap_err().message, "Invalid filename");
        assert_eq!(
            check_deletable("capture.jpg").unwrap_err().message,
            "Only PNG files can be deleted"
        );
    }

    #[tokio::test]
    async fn test_load_captures_only_lists_png() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("img_1.png"), b"png").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"text").unwrap();

        let captures = load_captures(dir.path()).await.unwrap();
        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].filename, "img_1.png");
        assert_eq!(captures[0].size, 3);
        assert_eq!(captures[0].url, "data:image/png;base64,cG5n");
    }
}
