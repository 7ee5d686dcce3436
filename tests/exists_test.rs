//! Existence probe against a real HTTP listener

use async_trait::async_trait;
use axum::{http::StatusCode, response::Redirect, routing::get, Router};
use s3_image_adapter::config::AdapterConfig;
use s3_image_adapter::storage::{ObjectStore, PutObjectRequest, StoredObject};
use s3_image_adapter::{Error, Result, S3Adapter, StorageAdapter};
use std::net::SocketAddr;
use std::sync::Arc;

struct NoopStore;

#[async_trait]
impl ObjectStore for NoopStore {
    async fn put_object(&self, _request: PutObjectRequest) -> Result<()> {
        Ok(())
    }

    async fn get_object(&self, _bucket: &str, key: &str) -> Result<StoredObject> {
        Err(Error::ObjectNotFound(key.to_string()))
    }
}

async fn spawn_asset_server() -> SocketAddr {
    let app = Router::new()
        .route("/ok.png", get(|| async { "image" }))
        .route("/forbidden.png", get(|| async { StatusCode::FORBIDDEN }))
        .route("/missing.png", get(|| async { StatusCode::NOT_FOUND }))
        .route("/broken.png", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route("/created.png", get(|| async { StatusCode::CREATED }))
        .route("/moved.png", get(|| async { Redirect::permanent("/ok.png") }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn adapter() -> S3Adapter {
    S3Adapter::new(
        AdapterConfig::new("media", "us-east-1", "key", "secret"),
        Arc::new(NoopStore),
    )
    .unwrap()
}

#[tokio::test]
async fn exists_only_for_status_200() {
    let addr = spawn_asset_server().await;
    let adapter = adapter();

    let expectations = [
        ("ok.png", true),
        ("forbidden.png", false),
        ("missing.png", false),
        ("broken.png", false),
        ("created.png", false),
        ("moved.png", false),
    ];

    for (path, expected) in expectations {
        let url = format!("http://{}/{}", addr, path);
        assert_eq!(adapter.exists(&url).await.unwrap(), expected, "probe of {}", path);
    }
}

#[tokio::test]
async fn network_failure_is_a_probe_error() {
    // Reserve a port, then release it so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = adapter()
        .exists(&format!("http://{}/photo.png", addr))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Probe(_)), "unexpected error: {err:?}");

    let err = adapter().exists("not a url").await.unwrap_err();
    assert!(matches!(err, Error::Probe(_)));
}
