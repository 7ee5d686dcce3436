//! s3-image-adapter - persist CMS images in S3 instead of the local disk
//!
//! The adapter implements the host's storage contract:
//! - `save` uploads a temp file under a `<folder>/<year>/<month>/<day>/<name>` key
//! - `exists` probes a public URL
//! - `serve` proxies legacy local image paths to the bucket
//! - `delete` and `read` are not supported

pub mod adapter;
pub mod api;
pub mod config;
pub mod error;
pub mod storage;

pub use adapter::{Image, S3Adapter, StorageAdapter};
pub use error::{Error, Result};
