//! The storage adapter the CMS host plugs in

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use bytes::Bytes;
use chrono::{Local, NaiveDate};
use futures::TryStreamExt;

use crate::config::AdapterConfig;
use crate::storage::s3::S3ObjectStore;
use crate::storage::{ObjectStore, PutObjectRequest};
use crate::{Error, Result};

pub mod key;

/// `Cache-Control` max-age sent with every upload: 365 days.
pub const CACHE_MAX_AGE_SECS: u64 = 365 * 24 * 60 * 60;

/// A file the host has staged on local disk and wants persisted.
#[derive(Debug, Clone)]
pub struct Image {
    /// Temporary file holding the upload
    pub path: PathBuf,
    /// Name the client uploaded the file under
    pub original_name: String,
    /// Declared MIME type
    pub content_type: String,
}

impl Image {
    pub fn new(
        path: impl Into<PathBuf>,
        original_name: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            original_name: original_name.into(),
            content_type: content_type.into(),
        }
    }
}

/// Storage contract expected by the host.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Persist an image and return its public URL.
    ///
    /// `target_dir` is part of the host contract but does not influence the key.
    async fn save(&self, image: &Image, target_dir: Option<&str>) -> Result<String>;

    /// Whether `url` answers a GET with `200 OK`.
    async fn exists(&self, url: &str) -> Result<bool>;

    /// Middleware body: stream the object behind the request path, or mark the
    /// response 404 and let `next` produce it.
    async fn serve(&self, request: Request, next: Next) -> Response;

    async fn delete(&self) -> Result<()>;

    async fn read(&self) -> Result<Bytes>;
}

/// Adapter backed by an S3 bucket.
pub struct S3Adapter {
    config: AdapterConfig,
    asset_host: String,
    store: Arc<dyn ObjectStore>,
    http: reqwest::Client,
    today: fn() -> NaiveDate,
}

impl S3Adapter {
    /// Validate `config` and wrap an existing store.
    pub fn new(config: AdapterConfig, store: Arc<dyn ObjectStore>) -> Result<Self> {
        config.validate()?;

        let asset_host = config.asset_host();
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            config,
            asset_host,
            store,
            http,
            today: local_today,
        })
    }

    /// Validate `config` and connect to S3 with its static credentials.
    pub async fn connect(config: AdapterConfig) -> Result<Self> {
        config.validate()?;
        let store = S3ObjectStore::new(&config).await?;
        Self::new(config, Arc::new(store))
    }

    /// Override the date source used for key partitioning.
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Use a preconfigured HTTP client for existence probes.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    pub fn asset_host(&self) -> &str {
        &self.asset_host
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

#[async_trait]
impl StorageAdapter for S3Adapter {
    async fn save(&self, image: &Image, _target_dir: Option<&str>) -> Result<String> {
        let body = ByteStream::from_path(&image.path)
            .await
            .map_err(std::io::Error::other)?;

        let target_key = key::object_key(self.config.folder(), (self.today)(), &image.original_name)?;

        tracing::info!(
            path = %image.path.display(),
            bucket = %self.config.bucket,
            key = %target_key,
            "putObject"
        );

        self.store
            .put_object(PutObjectRequest {
                bucket: self.config.bucket.clone(),
                key: target_key.clone(),
                body,
                acl: ObjectCannedAcl::PublicRead,
                content_type: Some(image.content_type.clone()),
                cache_control: Some(format!("max-age={}", CACHE_MAX_AGE_SECS)),
            })
            .await?;

        Ok(format!("{}/{}", self.asset_host, target_key))
    }

    async fn exists(&self, url: &str) -> Result<bool> {
        let response = self.http.get(url).send().await?;
        Ok(response.status() == reqwest::StatusCode::OK)
    }

    async fn serve(&self, request: Request, next: Next) -> Response {
        let key = key::key_from_request_path(request.uri().path()).to_string();

        match self.store.get_object(&self.config.bucket, &key).await {
            Ok(object) => {
                let body = object.body.inspect_err(move |err| {
                    tracing::warn!(key = %key, error = %err, "serve: object stream failed");
                });
                let mut response = Response::new(Body::from_stream(body));
                *response.headers_mut() = object.headers;
                response
            }
            Err(err) => {
                tracing::warn!(
                    bucket = %self.config.bucket,
                    key = %key,
                    error = %err,
                    "serve: object unavailable"
                );
                let mut response = next.run(request).await;
                *response.status_mut() = StatusCode::NOT_FOUND;
                response
            }
        }
    }

    async fn delete(&self) -> Result<()> {
        Err(Error::NotImplemented("delete"))
    }

    async fn read(&self) -> Result<Bytes> {
        Err(Error::NotImplemented("read"))
    }
}
