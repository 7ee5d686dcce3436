//! S3 object store

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::operation::get_object::GetObjectOutput;
use aws_sdk_s3::primitives::DateTimeFormat;
use aws_sdk_s3::Client;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use futures::StreamExt;
use tokio_util::io::ReaderStream;

use crate::config::AdapterConfig;
use crate::{Error, Result};

use super::{ObjectStore, PutObjectRequest, StoredObject};

const X_AMZ_VERSION_ID: HeaderName = HeaderName::from_static("x-amz-version-id");
const X_AMZ_SERVER_SIDE_ENCRYPTION: HeaderName =
    HeaderName::from_static("x-amz-server-side-encryption");
const X_AMZ_STORAGE_CLASS: HeaderName = HeaderName::from_static("x-amz-storage-class");

/// S3 object store bound to static credentials
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub async fn new(config: &AdapterConfig) -> Result<Self> {
        config.validate()?;

        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "s3-image-adapter",
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config);

        if let Some(endpoint_url) = config.endpoint() {
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint_url)
                .force_path_style(true);
        }

        let client = Client::from_conf(s3_config_builder.build());

        Ok(Self { client })
    }

    /// Wrap a client that was configured elsewhere
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, request: PutObjectRequest) -> Result<()> {
        self.client
            .put_object()
            .bucket(request.bucket)
            .key(request.key)
            .acl(request.acl)
            .body(request.body)
            .set_content_type(request.content_type)
            .set_cache_control(request.cache_control)
            .send()
            .await?;

        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<StoredObject> {
        let output = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|service| service.is_no_such_key()) =>
            {
                return Err(Error::ObjectNotFound(key.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        let headers = response_headers(&output);
        let body = ReaderStream::new(output.body.into_async_read()).boxed();

        Ok(StoredObject { headers, body })
    }
}

/// Rebuild the HTTP headers S3 sent with the object.
///
/// The SDK only exposes the typed `GetObjectOutput` fields, so this is the
/// object-level subset listed below plus `x-amz-meta-*` user metadata. Other
/// raw response headers (request ids, checksum and replication headers) are
/// not forwarded.
fn response_headers(output: &GetObjectOutput) -> HeaderMap {
    let mut headers = HeaderMap::new();

    insert(&mut headers, header::CONTENT_TYPE, output.content_type());
    insert(
        &mut headers,
        header::CONTENT_LENGTH,
        output.content_length().map(|len| len.to_string()).as_deref(),
    );
    insert(&mut headers, header::CACHE_CONTROL, output.cache_control());
    insert(&mut headers, header::CONTENT_ENCODING, output.content_encoding());
    insert(&mut headers, header::CONTENT_DISPOSITION, output.content_disposition());
    insert(&mut headers, header::CONTENT_LANGUAGE, output.content_language());
    insert(&mut headers, header::ETAG, output.e_tag());
    insert(
        &mut headers,
        header::LAST_MODIFIED,
        output
            .last_modified()
            .and_then(|ts| ts.fmt(DateTimeFormat::HttpDate).ok())
            .as_deref(),
    );
    insert(&mut headers, header::EXPIRES, output.expires_string());
    insert(&mut headers, header::ACCEPT_RANGES, output.accept_ranges());
    insert(&mut headers, header::CONTENT_RANGE, output.content_range());
    insert(&mut headers, X_AMZ_VERSION_ID, output.version_id());
    insert(
        &mut headers,
        X_AMZ_SERVER_SIDE_ENCRYPTION,
        output.server_side_encryption().map(|sse| sse.as_str()),
    );
    insert(
        &mut headers,
        X_AMZ_STORAGE_CLASS,
        output.storage_class().map(|class| class.as_str()),
    );

    if let Some(metadata) = output.metadata() {
        for (name, value) in metadata {
            if let Ok(name) = HeaderName::from_bytes(format!("x-amz-meta-{}", name).as_bytes()) {
                insert(&mut headers, name, Some(value));
            }
        }
    }

    headers
}

// Values S3 hands back are ASCII; anything else is dropped rather than failing the response.
fn insert(headers: &mut HeaderMap, name: HeaderName, value: Option<&str>) {
    if let Some(value) = value.and_then(|v| HeaderValue::from_str(v).ok()) {
        headers.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::primitives::DateTime;
    use aws_sdk_s3::types::{ServerSideEncryption, StorageClass};
    use std::collections::HashMap;

    #[test]
    fn test_response_headers_from_output() {
        let output = GetObjectOutput::builder()
            .content_type("image/png")
            .content_length(42)
            .cache_control("max-age=31536000")
            .e_tag("\"abc\"")
            .last_modified(DateTime::from_secs(0))
            .content_range("bytes 0-41/42")
            .version_id("v1")
            .server_side_encryption(ServerSideEncryption::Aes256)
            .storage_class(StorageClass::StandardIa)
            .set_metadata(Some(HashMap::from([(
                "uploader".to_string(),
                "editor".to_string(),
            )])))
            .build();

        let headers = response_headers(&output);

        assert_eq!(headers[header::CONTENT_TYPE], "image/png");
        assert_eq!(headers[header::CONTENT_LENGTH], "42");
        assert_eq!(headers[header::CACHE_CONTROL], "max-age=31536000");
        assert_eq!(headers[header::ETAG], "\"abc\"");
        assert_eq!(headers[header::LAST_MODIFIED], "Thu, 01 Jan 1970 00:00:00 GMT");
        assert_eq!(headers["x-amz-meta-uploader"], "editor");
        assert_eq!(headers[header::CONTENT_RANGE], "bytes 0-41/42");
        assert_eq!(headers["x-amz-version-id"], "v1");
        assert_eq!(headers["x-amz-server-side-encryption"], "AES256");
        assert_eq!(headers["x-amz-storage-class"], "STANDARD_IA");
        assert!(headers.get(header::CONTENT_ENCODING).is_none());
    }
}
