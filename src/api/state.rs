//! API server state

use std::path::PathBuf;
use std::sync::Arc;

use crate::adapter::{S3Adapter, StorageAdapter};

/// API server state
#[derive(Clone)]
pub struct AppState {
    /// Adapter every route delegates to
    pub adapter: Arc<dyn StorageAdapter>,

    /// Bucket the adapter writes to, reported by the health check
    pub bucket: String,

    /// Public base URL of stored objects
    pub asset_host: String,

    /// Where request bodies are staged before upload
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn new(adapter: Arc<S3Adapter>) -> Self {
        let bucket = adapter.config().bucket.clone();
        let asset_host = adapter.asset_host().to_string();

        Self {
            adapter,
            bucket,
            asset_host,
            upload_dir: std::env::temp_dir(),
        }
    }

    pub fn with_upload_dir(mut self, upload_dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = upload_dir.into();
        self
    }
}
