//! HTTP surface.
//!
//! ```text
//! ANY  /               -> 200, empty (liveness probe)
//! POST /<handle-path>  -> 200 accepted | 401 rejected
//! ```
//!
//! The webhook route reads the whole body: axum's default body limit is
//! disabled on it.

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::{any, post};
use axum::Router;
use std::sync::Arc;

use crate::delivery::{deliver, DeliveryHandler};

/// Build the relay router.
///
/// `handle_path` is the path segment without a leading slash, already
/// validated by the options layer.
pub fn app(handler: Arc<DeliveryHandler>, handle_path: &str) -> Router {
    Router::new()
        .route("/", any(health_check))
        .route(
            &format!("/{}", handle_path),
            post(deliver).layer(DefaultBodyLimit::disable()),
        )
        .with_state(handler)
}

/// Unconditional health check; does not touch the broker.
async fn health_check() -> StatusCode {
    StatusCode::OK
}
