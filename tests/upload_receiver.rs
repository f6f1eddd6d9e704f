//! The uploader against an in-process receiver.

mod common;

use common::LogBuffer;

use axum::{http::StatusCode, routing::post, Router};
use pi_sentry::receiver::{serve, ReceiverConfig};
use pi_sentry::CaptureUploader;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::instrument::WithSubscriber;

const DEVICE_KEY: &str = "device-key";

struct Running {
    addr: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
}

impl Running {
    fn endpoint(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

async fn start_receiver(dir: &Path) -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel();

    let config = ReceiverConfig::new("127.0.0.1", addr.port())
        .with_captures_dir(dir)
        .with_api_key(Some(DEVICE_KEY.to_string()));

    tokio::spawn(serve(listener, config, async move {
        let _ = stopped.await;
    }));

    Running {
        addr,
        stop: Some(stop),
    }
}

fn write_capture(dir: &Path, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.join("capture_20240101_000000.jpg");
    std::fs::write(&path, bytes).unwrap();
    path
}

#[tokio::test]
async fn test_upload_is_stored_by_receiver() {
    let source = tempfile::tempdir().unwrap();
    let received = tempfile::tempdir().unwrap();
    let receiver = start_receiver(received.path()).await;
    let image = write_capture(source.path(), b"\xff\xd8\xff\xe0 fake jpeg");

    let uploader =
        CaptureUploader::new(receiver.endpoint("/capture"), DEVICE_KEY, Duration::from_secs(5))
            .unwrap();
    assert!(uploader.upload(&image).await);

    let stored: Vec<_> = std::fs::read_dir(received.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].extension().is_some_and(|ext| ext == "png"));
    assert_eq!(std::fs::read(&stored[0]).unwrap(), b"\xff\xd8\xff\xe0 fake jpeg");
}

#[tokio::test]
async fn test_wrong_token_reports_failure() {
    let source = tempfile::tempdir().unwrap();
    let received = tempfile::tempdir().unwrap();
    let receiver = start_receiver(received.path()).await;
    let image = write_capture(source.path(), b"jpeg");

    let uploader =
        CaptureUploader::new(receiver.endpoint("/capture"), "wrong", Duration::from_secs(5))
            .unwrap();
    assert!(!uploader.upload(&image).await);
    assert_eq!(std::fs::read_dir(received.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_empty_capture_is_rejected() {
    let source = tempfile::tempdir().unwrap();
    let received = tempfile::tempdir().unwrap();
    let receiver = start_receiver(received.path()).await;
    let image = write_capture(source.path(), b"");

    let uploader =
        CaptureUploader::new(receiver.endpoint("/capture"), DEVICE_KEY, Duration::from_secs(5))
            .unwrap();
    assert!(!uploader.upload(&image).await);
}

#[tokio::test]
async fn test_unknown_route_reports_failure() {
    let source = tempfile::tempdir().unwrap();
    let received = tempfile::tempdir().unwrap();
    let receiver = start_receiver(received.path()).await;
    let image = write_capture(source.path(), b"jpeg");

    let uploader =
        CaptureUploader::new(receiver.endpoint("/nope"), DEVICE_KEY, Duration::from_secs(5))
            .unwrap();
    assert!(!uploader.upload(&image).await);
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let source = tempfile::tempdir().unwrap();
    let image = write_capture(source.path(), b"jpeg");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route(
        "/capture",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "late"
        }),
    );
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let uploader = CaptureUploader::new(
        format!("http://{}/capture", addr),
        DEVICE_KEY,
        Duration::from_millis(200),
    )
    .unwrap();

    let started = std::time::Instant::now();
    assert!(!uploader.upload(&image).await);
    assert!(started.elapsed() < Duration::from_secs(4));

    server.abort();
}

#[tokio::test]
async fn test_server_error_logs_body_excerpt() {
    let logs = LogBuffer::default();
    let source = tempfile::tempdir().unwrap();
    let image = write_capture(source.path(), b"jpeg");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route(
        "/capture",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "x".repeat(300)) }),
    );
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let uploader = CaptureUploader::new(
        format!("http://{}/capture", addr),
        DEVICE_KEY,
        Duration::from_secs(5),
    )
    .unwrap();

    let uploaded = uploader
        .upload(&image)
        .with_subscriber(logs.subscriber())
        .await;
    assert!(!uploaded);

    let line = logs
        .lines()
        .into_iter()
        .find(|line| line.contains("Upload failed (500): "))
        .unwrap();
    let logged = line.split("Upload failed (500): ").nth(1).unwrap();
    assert_eq!(logged, "x".repeat(100));

    server.abort();
}
