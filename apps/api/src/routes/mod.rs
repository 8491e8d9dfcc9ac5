pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_mb * 1024 * 1024;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/analyze", post(handlers::handle_analyze))
        .route(
            "/api/v1/analyze/sections",
            post(handlers::handle_analyze_sections),
        )
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}
