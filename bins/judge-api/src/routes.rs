use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::AppState;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/attempts/:attempt_id",
            post(handlers::submit_attempt).get(handlers::get_attempt_result),
        )
        .route("/attempts/:attempt_id/cancel", post(handlers::cancel_attempt))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
