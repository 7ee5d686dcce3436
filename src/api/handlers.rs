//! API handlers

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;

use crate::adapter::Image;
use crate::api::AppState;

/// Header carrying the client-side file name of an upload
pub const FILE_NAME_HEADER: &str = "x-file-name";

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Health check
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        bucket: state.bucket.clone(),
        asset_host: state.asset_host.clone(),
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub bucket: String,
    pub asset_host: String,
}

/// Stage the request body in a temp file and hand it to the adapter
pub async fn upload_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, (StatusCode, String)> {
    let original_name = header_str(&headers, FILE_NAME_HEADER)
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                format!("'{}' header is required", FILE_NAME_HEADER),
            )
        })?
        .to_string();
    let content_type =
        header_str(&headers, header::CONTENT_TYPE.as_str()).unwrap_or(DEFAULT_CONTENT_TYPE);

    // Removed on drop, including when the request is cancelled mid-save.
    let staged = tempfile::Builder::new()
        .prefix("s3-image-adapter-")
        .tempfile_in(&state.upload_dir)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    tokio::fs::write(staged.path(), &body)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let image = Image::new(staged.path(), original_name, content_type);
    let saved = state.adapter.save(&image, None).await;

    let staged_path = staged.path().to_path_buf();
    if let Err(err) = staged.close() {
        tracing::warn!(path = %staged_path.display(), error = %err, "Failed to remove staged upload");
    }

    let url = saved.map_err(|e| {
        tracing::error!(error = %e, "Upload failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(Json(UploadResponse { url }))
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Downstream of the image proxy
pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
