//! HTTP capture receiver.
//!
//! Accepts the JSON uploads a sentry device posts, stores the decoded images,
//! and exposes admin routes for listing and deleting them.

pub mod auth;
pub mod config;
pub mod handlers;
pub mod router;

// Re-export commonly used items
pub use auth::ApiError;
pub use config::{ReceiverConfig, DEFAULT_BODY_LIMIT, DEFAULT_RECEIVER_PORT};
pub use router::create_app;

use crate::error::{Result, SentryError};
use std::future::Future;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Shared state handed to every handler.
#[derive(Debug)]
pub struct ReceiverState {
    pub config: ReceiverConfig,
}

/// Serve the receiver on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, config: ReceiverConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if config.api_key.is_none() {
        warn!("API_KEY not set, uploads will be refused");
    }
    if config.admin_api_key.is_none() {
        warn!("ADMIN_API_KEY not set, admin routes will be refused");
    }

    let app = create_app(config);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| SentryError::receiver_error(format!("Server error: {}", e)))
}

/// Bind the configured address and serve until Ctrl+C.
pub async fn start_receiver(config: ReceiverConfig) -> Result<()> {
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        SentryError::receiver_error(format!("Failed to bind to {}: {}", addr, e))
    })?;

    info!("Capture receiver listening on http://{}", addr);
    info!(
        captures_dir = %config.captures_dir.display(),
        "Storing uploads"
    );

    serve(listener, config, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Receiver shutting down");
        }
    })
    .await
}
