//! Backend configuration.
//!
//! Each backend kind carries its own field set; [`BackendConfig`] is the tagged
//! union the registry dispatches on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::{Result, StorageError};

/// Storage type tag for Alibaba Cloud OSS.
pub const TYPE_ALI_OSS: &str = "ali-oss";
/// Storage type tag for MinIO.
pub const TYPE_MINIO: &str = "minio";
/// Storage type tag for the local filesystem backend.
pub const TYPE_LOCAL: &str = "local";

/// Default multipart part size (5 MiB).
pub const DEFAULT_PART_SIZE: u64 = 5 * 1024 * 1024;

fn require(value: &str, field: &str, backend: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(StorageError::InvalidConfig(format!(
            "{backend}: {field} is required"
        )));
    }
    Ok(())
}

fn default_part_size() -> u64 {
    DEFAULT_PART_SIZE
}

fn default_true() -> bool {
    true
}

/// Alibaba Cloud OSS configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct AliOssConfig {
    /// Access key id.
    pub access_key_id: String,
    /// Access key secret.
    pub access_key_secret: String,
    /// Region, e.g. `oss-cn-hangzhou`.
    pub region: String,
    /// Bucket name.
    pub bucket_name: String,
    /// Endpoint override; derived from the region when absent.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Multipart part size in bytes.
    #[serde(default = "default_part_size")]
    pub part_size: u64,
}

impl AliOssConfig {
    /// Create a configuration with the required fields.
    pub fn new(
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
        region: impl Into<String>,
        bucket_name: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            region: region.into(),
            bucket_name: bucket_name.into(),
            endpoint: None,
            part_size: DEFAULT_PART_SIZE,
        }
    }

    /// Set a custom endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Reject the configuration if a required field is missing.
    pub fn validate(&self) -> Result<()> {
        require(&self.access_key_id, "access_key_id", TYPE_ALI_OSS)?;
        require(&self.access_key_secret, "access_key_secret", TYPE_ALI_OSS)?;
        require(&self.region, "region", TYPE_ALI_OSS)?;
        require(&self.bucket_name, "bucket_name", TYPE_ALI_OSS)?;
        if self.part_size == 0 {
            return Err(StorageError::InvalidConfig(format!(
                "{TYPE_ALI_OSS}: part_size must be positive"
            )));
        }
        Ok(())
    }

    /// S3-compatible endpoint for the configured region.
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://{}.aliyuncs.com", self.oss_region()),
        }
    }

    /// Bucket domain, `<bucket>.<region>.aliyuncs.com`.
    pub fn bucket_domain(&self) -> String {
        format!("{}.{}.aliyuncs.com", self.bucket_name, self.oss_region())
    }

    /// Region with the `oss-` prefix OSS hostnames use.
    fn oss_region(&self) -> String {
        if self.region.starts_with("oss-") {
            self.region.clone()
        } else {
            format!("oss-{}", self.region)
        }
    }
}

impl fmt::Debug for AliOssConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AliOssConfig")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("region", &self.region)
            .field("bucket_name", &self.bucket_name)
            .field("endpoint", &self.endpoint)
            .field("part_size", &self.part_size)
            .finish()
    }
}

/// MinIO configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct MinioConfig {
    /// `host[:port]` of the MinIO server, without scheme.
    pub endpoint: String,
    /// Access key id.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Connect over TLS.
    #[serde(default = "default_true")]
    pub use_ssl: bool,
    /// Bucket name.
    pub bucket_name: String,
    /// Region; MinIO accepts any value.
    #[serde(default)]
    pub region: Option<String>,
    /// Multipart part size in bytes.
    #[serde(default = "default_part_size")]
    pub part_size: u64,
}

impl MinioConfig {
    /// Create a configuration with the required fields.
    pub fn new(
        endpoint: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        bucket_name: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            use_ssl: true,
            bucket_name: bucket_name.into(),
            region: None,
            part_size: DEFAULT_PART_SIZE,
        }
    }

    /// Enable or disable TLS.
    pub fn use_ssl(mut self, use_ssl: bool) -> Self {
        self.use_ssl = use_ssl;
        self
    }

    /// Set the region.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Reject the configuration if a required field is missing.
    pub fn validate(&self) -> Result<()> {
        require(&self.endpoint, "endpoint", TYPE_MINIO)?;
        require(&self.access_key_id, "access_key_id", TYPE_MINIO)?;
        require(&self.secret_access_key, "secret_access_key", TYPE_MINIO)?;
        require(&self.bucket_name, "bucket_name", TYPE_MINIO)?;
        if self.part_size == 0 {
            return Err(StorageError::InvalidConfig(format!(
                "{TYPE_MINIO}: part_size must be positive"
            )));
        }
        Ok(())
    }

    fn scheme(&self) -> &'static str {
        if self.use_ssl { "https" } else { "http" }
    }

    /// Endpoint URL with scheme.
    pub fn endpoint_url(&self) -> String {
        format!("{}://{}", self.scheme(), self.endpoint)
    }

    /// Bucket domain, `<scheme>://<endpoint>/<bucket>`.
    pub fn bucket_domain(&self) -> String {
        format!("{}://{}/{}", self.scheme(), self.endpoint, self.bucket_name)
    }

    /// Region to sign with.
    pub fn signing_region(&self) -> String {
        self.region
            .clone()
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "us-east-1".to_string())
    }
}

impl fmt::Debug for MinioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MinioConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("use_ssl", &self.use_ssl)
            .field("bucket_name", &self.bucket_name)
            .field("region", &self.region)
            .field("part_size", &self.part_size)
            .finish()
    }
}

/// Local filesystem backend configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Directory objects are stored under.
    pub root: PathBuf,
    /// Base URL the directory is served from.
    pub public_base_url: String,
    /// Secret used to sign URLs.
    pub signing_secret: String,
    /// Copy chunk size; one progress call per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    1024 * 1024
}

impl LocalConfig {
    /// Create a configuration with the required fields.
    pub fn new(
        root: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
        signing_secret: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
            signing_secret: signing_secret.into(),
            chunk_size: default_chunk_size(),
        }
    }

    /// Set the copy chunk size.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Reject the configuration if a required field is missing.
    pub fn validate(&self) -> Result<()> {
        if self.root.as_os_str().is_empty() {
            return Err(StorageError::InvalidConfig(format!(
                "{TYPE_LOCAL}: root is required"
            )));
        }
        require(&self.public_base_url, "public_base_url", TYPE_LOCAL)?;
        if !self.public_base_url.starts_with("http://")
            && !self.public_base_url.starts_with("https://")
        {
            return Err(StorageError::InvalidConfig(format!(
                "{TYPE_LOCAL}: public_base_url must be an http(s) URL"
            )));
        }
        require(&self.signing_secret, "signing_secret", TYPE_LOCAL)?;
        if self.chunk_size == 0 {
            return Err(StorageError::InvalidConfig(format!(
                "{TYPE_LOCAL}: chunk_size must be positive"
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for LocalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalConfig")
            .field("root", &self.root)
            .field("public_base_url", &self.public_base_url)
            .field("signing_secret", &"<redacted>")
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

/// Configuration for any known backend kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BackendConfig {
    /// Alibaba Cloud OSS.
    #[serde(rename = "ali-oss")]
    AliOss(AliOssConfig),
    /// MinIO or another S3-compatible server.
    #[serde(rename = "minio")]
    Minio(MinioConfig),
    /// Local filesystem.
    #[serde(rename = "local")]
    Local(LocalConfig),
}

impl BackendConfig {
    /// Storage type tag used for registry lookup.
    pub fn storage_type(&self) -> &'static str {
        match self {
            Self::AliOss(_) => TYPE_ALI_OSS,
            Self::Minio(_) => TYPE_MINIO,
            Self::Local(_) => TYPE_LOCAL,
        }
    }

    /// Validate the variant's required fields.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::AliOss(config) => config.validate(),
            Self::Minio(config) => config.validate(),
            Self::Local(config) => config.validate(),
        }
    }
}

impl From<AliOssConfig> for BackendConfig {
    fn from(config: AliOssConfig) -> Self {
        Self::AliOss(config)
    }
}

impl From<MinioConfig> for BackendConfig {
    fn from(config: MinioConfig) -> Self {
        Self::Minio(config)
    }
}

impl From<LocalConfig> for BackendConfig {
    fn from(config: LocalConfig) -> Self {
        Self::Local(config)
    }
}
