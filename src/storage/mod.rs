//! Object store abstraction
//!
//! The adapter talks to its backend only through [`ObjectStore`], so the S3
//! client can be swapped for the local filesystem store or a test double.

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use axum::http::HeaderMap;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::config::AdapterConfig;
use crate::Result;

pub mod local;
pub mod s3;

/// Body chunks of an object as they arrive from the backend.
pub type ObjectBody = BoxStream<'static, std::io::Result<Bytes>>;

/// Parameters of a single `PutObject` call.
#[derive(Debug)]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub body: ByteStream,
    pub acl: ObjectCannedAcl,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
}

/// A fetched object: response headers plus a streaming body.
pub struct StoredObject {
    pub headers: HeaderMap,
    pub body: ObjectBody,
}

impl std::fmt::Debug for StoredObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredObject")
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Storage backend trait
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload an object
    async fn put_object(&self, request: PutObjectRequest) -> Result<()>;

    /// Start streaming an object; resolves once headers are known
    async fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject>;
}

/// Storage configuration
#[derive(Debug, Clone)]
pub enum StoreConfig {
    S3(AdapterConfig),
    Local { root_path: String },
}

/// Create object store from config
pub async fn create_store(config: StoreConfig) -> Result<Arc<dyn ObjectStore>> {
    match config {
        StoreConfig::S3(adapter) => {
            let store = s3::S3ObjectStore::new(&adapter).await?;
            Ok(Arc::new(store))
        }
        StoreConfig::Local { root_path } => {
            let store = local::LocalObjectStore::new(root_path)?;
            Ok(Arc::new(store))
        }
    }
}
