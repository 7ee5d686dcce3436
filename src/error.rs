//! Error types for s3-image-adapter

use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::put_object::PutObjectError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid s3 adapter config - {0}")]
    InvalidConfig(String),

    #[error("S3 put failed: {0}")]
    PutObject(#[from] SdkError<PutObjectError>),

    #[error("S3 get failed: {0}")]
    GetObject(#[from] SdkError<GetObjectError>),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Existence probe failed: {0}")]
    Probe(#[from] reqwest::Error),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ObjectNotFound(_))
    }
}
