//! Alibaba Cloud OSS backend.

use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    Client,
    config::{Credentials, Region},
};
use std::sync::Arc;
use tracing::info;

use crate::s3compat::{S3CompatBackend, client_config};
use crate::{
    AliOssConfig, BackendConfig, BackendRegistry, Result, StorageBackend, StorageError,
    TYPE_ALI_OSS,
};

/// Register the OSS backend constructor.
pub(crate) fn register(registry: &BackendRegistry) {
    registry.register(TYPE_ALI_OSS, |config| {
        Box::pin(async move {
            match config {
                BackendConfig::AliOss(config) => {
                    let backend = connect(config).await?;
                    Ok(Arc::new(backend) as Arc<dyn StorageBackend>)
                }
                other => Err(StorageError::InvalidConfig(format!(
                    "ali-oss backend cannot be built from a {} configuration",
                    other.storage_type()
                ))),
            }
        })
    });
}

/// Build an OSS client and confirm the bucket is reachable.
///
/// OSS only accepts virtual-hosted addressing, so path style stays off.
pub async fn connect(config: AliOssConfig) -> Result<S3CompatBackend> {
    config.validate()?;

    let credentials = Credentials::new(
        &config.access_key_id,
        &config.access_key_secret,
        None,
        None,
        "ferry-ali-oss",
    );
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(signing_region(&config.region)))
        .credentials_provider(credentials)
        .endpoint_url(config.endpoint_url())
        .load()
        .await;
    let client = Client::from_conf(client_config(&sdk_config, false));

    client
        .head_bucket()
        .bucket(&config.bucket_name)
        .send()
        .await
        .map_err(|e| {
            StorageError::construction(
                TYPE_ALI_OSS,
                format!("bucket {} is not reachable: {}", config.bucket_name, e),
            )
        })?;

    info!(
        bucket = %config.bucket_name,
        region = %config.region,
        "Initialized Alibaba Cloud OSS storage"
    );

    Ok(S3CompatBackend::from_client(
        client,
        TYPE_ALI_OSS,
        config.bucket_name.clone(),
        config.bucket_domain(),
        config.part_size,
    ))
}

/// OSS hostnames carry an `oss-` prefix the signing region does not.
fn signing_region(region: &str) -> String {
    region.trim_start_matches("oss-").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_region_drops_host_prefix() {
        assert_eq!(signing_region("oss-cn-hangzhou"), "cn-hangzhou");
        assert_eq!(signing_region("cn-beijing"), "cn-beijing");
    }

    #[tokio::test]
    async fn test_connect_rejects_incomplete_config() {
        let config = AliOssConfig::new("id", "secret", "cn-hangzhou", "");
        let err = connect(config).await.unwrap_err();
        assert!(err.is_invalid_config());
    }
}
