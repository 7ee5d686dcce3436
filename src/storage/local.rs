//! Local filesystem object store
//!
//! Objects live at `<root>/<bucket>/<key>`. The headers given at upload time
//! are kept in a JSON sidecar under `<root>/.meta/<bucket>/<key>.json`.

use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use crate::{Error, Result};

use super::{ObjectStore, PutObjectRequest, StoredObject};

const META_DIR: &str = ".meta";

#[derive(Debug, Default, Serialize, Deserialize)]
struct ObjectMetadata {
    content_type: Option<String>,
    cache_control: Option<String>,
    acl: Option<String>,
}

/// Local filesystem storage
pub struct LocalObjectStore {
    root_path: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root_path: impl Into<PathBuf>) -> Result<Self> {
        let root_path = root_path.into();
        std::fs::create_dir_all(&root_path)?;
        Ok(Self { root_path })
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        check_relative(bucket)?;
        check_relative(key)?;
        Ok(self.root_path.join(bucket).join(key))
    }

    fn meta_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root_path
            .join(META_DIR)
            .join(bucket)
            .join(format!("{}.json", key))
    }
}

/// Keys must stay inside the root: plain relative segments only.
fn check_relative(segment: &str) -> Result<()> {
    let path = Path::new(segment);
    let valid = !segment.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));

    if valid {
        Ok(())
    } else {
        Err(Error::storage(format!("invalid object path: {:?}", segment)))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put_object(&self, request: PutObjectRequest) -> Result<()> {
        let path = self.object_path(&request.bucket, &request.key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let reader = request.body.into_async_read();
        tokio::pin!(reader);
        let mut file = fs::File::create(&path).await?;
        tokio::io::copy_buf(&mut reader, &mut file).await?;
        file.flush().await?;

        let metadata = ObjectMetadata {
            content_type: request.content_type,
            cache_control: request.cache_control,
            acl: Some(request.acl.as_str().to_string()),
        };
        let meta_path = self.meta_path(&request.bucket, &request.key);
        if let Some(parent) = meta_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&meta_path, serde_json::to_vec(&metadata)?).await?;

        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject> {
        let path = self.object_path(bucket, key)?;
        if !path.is_file() {
            return Err(Error::ObjectNotFound(key.to_string()));
        }

        let file = fs::File::open(&path).await?;
        let length = file.metadata().await?.len();

        let metadata = match fs::read(self.meta_path(bucket, key)).await {
            Ok(raw) => serde_json::from_slice(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => ObjectMetadata::default(),
            Err(err) => return Err(err.into()),
        };

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
        for (name, value) in [
            (header::CONTENT_TYPE, metadata.content_type),
            (header::CACHE_CONTROL, metadata.cache_control),
        ] {
            if let Some(value) = value.and_then(|v| HeaderValue::from_str(&v).ok()) {
                headers.insert(name, value);
            }
        }

        Ok(StoredObject {
            headers,
            body: ReaderStream::new(file).boxed(),
        })
    }
}
