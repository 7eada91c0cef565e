//! MinIO backend.

use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    Client,
    config::{Credentials, Region},
};
use std::sync::Arc;
use tracing::info;

use crate::s3compat::{S3CompatBackend, client_config};
use crate::{
    BackendConfig, BackendRegistry, MinioConfig, Result, StorageBackend, StorageError, TYPE_MINIO,
};

/// Register the MinIO backend constructor.
pub(crate) fn register(registry: &BackendRegistry) {
    registry.register(TYPE_MINIO, |config| {
        Box::pin(async move {
            match config {
                BackendConfig::Minio(config) => {
                    let backend = connect(config).await?;
                    Ok(Arc::new(backend) as Arc<dyn StorageBackend>)
                }
                other => Err(StorageError::InvalidConfig(format!(
                    "minio backend cannot be built from a {} configuration",
                    other.storage_type()
                ))),
            }
        })
    });
}

/// Build a MinIO client, creating the bucket when it does not exist yet.
pub async fn connect(config: MinioConfig) -> Result<S3CompatBackend> {
    config.validate()?;

    let credentials = Credentials::new(
        &config.access_key_id,
        &config.secret_access_key,
        None,
        None,
        "ferry-minio",
    );
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.signing_region()))
        .credentials_provider(credentials)
        .endpoint_url(config.endpoint_url())
        .load()
        .await;
    let client = Client::from_conf(client_config(&sdk_config, true));

    ensure_bucket(&client, &config.bucket_name).await?;

    info!(
        bucket = %config.bucket_name,
        endpoint = %config.endpoint,
        ssl = config.use_ssl,
        "Initialized MinIO storage"
    );

    Ok(S3CompatBackend::from_client(
        client,
        TYPE_MINIO,
        config.bucket_name.clone(),
        config.bucket_domain(),
        config.part_size,
    ))
}

async fn ensure_bucket(client: &Client, bucket: &str) -> Result<()> {
    match client.head_bucket().bucket(bucket).send().await {
        Ok(_) => Ok(()),
        Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => {
            client
                .create_bucket()
                .bucket(bucket)
                .send()
                .await
                .map_err(|e| {
                    StorageError::construction(
                        TYPE_MINIO,
                        format!("cannot create bucket {}: {}", bucket, e),
                    )
                })?;
            info!(bucket = %bucket, "Created MinIO bucket");
            Ok(())
        }
        Err(err) => Err(StorageError::construction(
            TYPE_MINIO,
            format!("bucket {} is not reachable: {}", bucket, err),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_incomplete_config() {
        let config = MinioConfig::new("localhost:9000", "", "secret", "uploads");
        let err = connect(config).await.unwrap_err();
        assert!(err.is_invalid_config());
    }

    #[test]
    fn test_domain_follows_ssl_flag() {
        let config = MinioConfig::new("localhost:9000", "id", "secret", "uploads").use_ssl(false);
        assert_eq!(config.bucket_domain(), "http://localhost:9000/uploads");
        assert_eq!(config.signing_region(), "us-east-1");
    }
}
