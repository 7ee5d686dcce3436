//! HTTP API server

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::adapter::StorageAdapter;
use crate::config::ServerConfig;

pub mod handlers;
pub mod state;

pub use state::AppState;

/// Build the API router: health, uploads, and the image proxy at `server.mount_path`
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    let proxy = proxy_router(state.adapter.clone());

    let router = Router::new()
        .route("/health", get(handlers::health))
        .nest(
            "/v1",
            Router::new()
                .route("/images", post(handlers::upload_image))
                .layer(DefaultBodyLimit::max(server.max_upload_bytes)),
        )
        .with_state(state);

    match server.mount_path.trim_matches('/') {
        "" => router.fallback_service(proxy),
        mount => router.nest_service(&format!("/{}", mount), proxy),
    }
}

/// Legacy image routes: every path goes through [`serve_from_store`], falling
/// back to a plain 404 when the object is unavailable
pub fn proxy_router(adapter: Arc<dyn StorageAdapter>) -> Router {
    Router::new()
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(adapter, serve_from_store))
}

/// Middleware adapter for [`StorageAdapter::serve`]
pub async fn serve_from_store(
    State(adapter): State<Arc<dyn StorageAdapter>>,
    request: Request,
    next: Next,
) -> Response {
    adapter.serve(request, next).await
}
