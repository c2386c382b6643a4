pub mod health;
pub mod index;

use axum::{
    extract::DefaultBodyLimit,
    http::Uri,
    routing::{get, post},
    Router,
};

use crate::deck::handlers as deck_handlers;
use crate::errors::AppError;
use crate::proxies::handlers as proxy_handlers;
use crate::state::AppState;

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {uri}"))
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(index::index_handler))
        .route("/health", get(health::health_handler))
        .route("/api/parse", post(deck_handlers::handle_parse))
        .route("/api/download", post(proxy_handlers::handle_download))
        .route("/api/pdf", post(proxy_handlers::handle_pdf))
        .fallback(not_found)
        // Generic card backs are full-resolution images; the 2 MB default is too small.
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
