use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::storage::StoreConfig;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024; // 20 MiB

/// Top-level application configuration loaded from file + environment.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageSection,
    pub adapter: AdapterConfig,
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Load configuration from disk and environment.
    pub fn load() -> Result<Self> {
        let config_path =
            env::var("S3_ADAPTER_CONFIG").unwrap_or_else(|_| "config.toml".to_string());

        let mut builder = config::Config::builder();

        if Path::new(&config_path).exists() {
            builder = builder.add_source(config::File::from(PathBuf::from(&config_path)));
        }

        // Double underscore separates sections so field names keep their own underscores,
        // e.g. S3_ADAPTER_ADAPTER__ACCESS_KEY_ID.
        builder = builder.add_source(
            config::Environment::with_prefix("S3_ADAPTER")
                .prefix_separator("_")
                .separator("__"),
        );

        let settings = builder.build()?;
        let mut config: Self = settings
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        if config.logging.level.trim().is_empty() {
            config.logging.level = "info".to_string();
        }

        config.server.mount_path = normalize_mount_path(&config.server.mount_path);

        Ok(config)
    }

    /// Resolve which object store backs the adapter.
    pub fn store_runtime(&self) -> crate::Result<StoreConfig> {
        match self.storage.backend {
            StoreBackendKind::S3 => {
                self.adapter.validate()?;
                Ok(StoreConfig::S3(self.adapter.clone()))
            }
            StoreBackendKind::Local => {
                let local = self.storage.local.clone().unwrap_or_default();
                if local.root_path.trim().is_empty() {
                    return Err(crate::Error::config("storage.local.root_path must be specified"));
                }
                Ok(StoreConfig::Local {
                    root_path: local.root_path,
                })
            }
        }
    }
}

/// Collapse a configured mount path to `/segment/...` with no trailing slash.
///
/// An empty value means the proxy owns every unmatched route.
pub fn normalize_mount_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Adapter settings handed over by the host.
///
/// Required fields are kept as plain strings so a missing value surfaces as a
/// validation error naming the field rather than a deserialization failure.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AdapterConfig {
    pub bucket: String,
    pub region: String,
    #[serde(alias = "accessKeyId")]
    pub access_key_id: String,
    #[serde(alias = "secretAccessKey")]
    pub secret_access_key: String,
    /// Public base URL for stored objects, e.g. a CDN in front of the bucket.
    #[serde(alias = "assetHost")]
    pub asset_host: Option<String>,
    /// Key prefix placed before the date partition.
    pub folder: Option<String>,
    /// Custom S3-compatible endpoint (MinIO, localstack). Enables path-style addressing.
    pub endpoint: Option<String>,
}

impl AdapterConfig {
    pub fn new(
        bucket: impl Into<String>,
        region: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            ..Self::default()
        }
    }

    pub fn with_asset_host(mut self, asset_host: impl Into<String>) -> Self {
        self.asset_host = Some(asset_host.into());
        self
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Reject configurations missing any required field.
    pub fn validate(&self) -> crate::Result<()> {
        let required = [
            ("bucket", &self.bucket),
            ("region", &self.region),
            ("access_key_id", &self.access_key_id),
            ("secret_access_key", &self.secret_access_key),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(crate::Error::config(format!("{} is required", field)));
            }
        }

        Ok(())
    }

    /// Public base URL: the configured override, or the bucket's virtual S3 URL.
    pub fn asset_host(&self) -> String {
        match non_blank(self.asset_host.as_deref()) {
            Some(host) => host.trim_end_matches('/').to_string(),
            None => format!("https://s3.{}.amazonaws.com/{}", self.region, self.bucket),
        }
    }

    pub fn folder(&self) -> Option<&str> {
        non_blank(self.folder.as_deref())
    }

    pub fn endpoint(&self) -> Option<&str> {
        non_blank(self.endpoint.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Route prefix that used to serve local images.
    pub mount_path: String,
    pub max_upload_bytes: usize,
    /// Scratch directory for uploads; the system temp dir when unset.
    pub upload_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            mount_path: "/content/images".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            upload_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StorageSection {
    pub backend: StoreBackendKind,
    pub local: Option<LocalStorageSection>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackendKind {
    #[default]
    S3,
    Local,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalStorageSection {
    pub root_path: String,
}

impl Default for LocalStorageSection {
    fn default() -> Self {
        Self {
            root_path: "./data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_path_normalization() {
        assert_eq!(normalize_mount_path("content/images/"), "/content/images");
        assert_eq!(normalize_mount_path("/content/images"), "/content/images");
        assert_eq!(normalize_mount_path(""), "/");
        assert_eq!(normalize_mount_path("//"), "/");
    }

    #[test]
    fn test_blank_asset_host_falls_back_to_bucket_url() {
        let config = AdapterConfig::new("media", "eu-west-1", "key", "secret").with_asset_host("  ");
        assert_eq!(config.asset_host(), "https://s3.eu-west-1.amazonaws.com/media");
    }

    #[test]
    fn test_asset_host_trailing_slash_trimmed() {
        let config = AdapterConfig::new("media", "eu-west-1", "key", "secret")
            .with_asset_host("https://cdn.example.com/");
        assert_eq!(config.asset_host(), "https://cdn.example.com");
    }

    #[test]
    fn test_camel_case_aliases() {
        let config: AdapterConfig = serde_json::from_str(
            r#"{
                "bucket": "media",
                "region": "us-east-1",
                "accessKeyId": "AKIA",
                "secretAccessKey": "shh",
                "assetHost": "https://cdn.example.com"
            }"#,
        )
        .unwrap();

        assert_eq!(config.access_key_id, "AKIA");
        assert_eq!(config.secret_access_key, "shh");
        assert_eq!(config.asset_host.as_deref(), Some("https://cdn.example.com"));
        assert!(config.validate().is_ok());
    }
}
