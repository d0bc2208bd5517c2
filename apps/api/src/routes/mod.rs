pub mod health;
pub mod resume;
pub mod visitors;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::services::{ServeDir, ServeFile};

use crate::state::AppState;

/// Upload ceiling for the whole request body.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();
    // Unknown paths fall back to index.html for client-side routing
    let frontend = ServeDir::new(&static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/api/status", get(health::status_handler))
        .route("/api/config", get(health::config_handler))
        .route(
            "/api/visitors",
            get(visitors::handle_get_visitors).post(visitors::handle_record_visit),
        )
        .route("/api/process_resume", post(resume::handle_process_resume))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .fallback_service(frontend)
        .with_state(state)
}
