pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::evaluation::handlers;
use crate::models::upload::MAX_UPLOAD_BYTES;
use crate::state::AppState;

/// Whole-request cap for multipart uploads: room for several full-size files.
const MAX_REQUEST_BYTES: usize = 6 * MAX_UPLOAD_BYTES;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/evaluate", post(handlers::handle_evaluate))
        .route(
            "/api/evaluate/upload",
            post(handlers::handle_evaluate_upload),
        )
        .route("/api/parse-files", post(handlers::handle_parse_files))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .with_state(state)
}
