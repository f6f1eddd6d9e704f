//! Receiver router and middleware setup.

use crate::receiver::config::ReceiverConfig;
use crate::receiver::handlers;
use crate::receiver::ReceiverState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the axum application with all routes and middleware.
pub fn create_app(config: ReceiverConfig) -> Router {
    let body_limit = config.body_limit;
    let state = Arc::new(ReceiverState { config });

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/capture", post(handlers::save_capture))
        .route("/admin/captures", get(handlers::list_captures))
        .route("/admin/captures/:filename", delete(handlers::delete_capture))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
}
