//! Upload and signing over the S3-compatible API.
//!
//! Shared by the Alibaba Cloud OSS and MinIO backends; each of those only
//! differs in how the client is built and how the bucket is probed.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::{
    Client,
    config::{RequestChecksumCalculation, ResponseChecksumValidation},
    presigning::{PresignedRequest, PresigningConfig},
    primitives::ByteStream,
    types::{CompletedMultipartUpload, CompletedPart},
};
use bytes::Bytes;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::backend::{guess_content_type, object_base_name, report};
use crate::{
    ProgressFn, Result, SignedMethod, SignedUrl, StorageBackend, StorageError, UploadReceipt,
};

/// S3 client settings shared by the OSS and MinIO backends.
///
/// Checksums are only sent or verified when an operation requires them;
/// OSS rejects the default CRC32 trailers on `PutObject` and `UploadPart`.
pub fn client_config(sdk_config: &SdkConfig, force_path_style: bool) -> aws_sdk_s3::Config {
    aws_sdk_s3::config::Builder::from(sdk_config)
        .force_path_style(force_path_style)
        .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
        .response_checksum_validation(ResponseChecksumValidation::WhenRequired)
        .build()
}

/// Backend speaking the S3 protocol to a single bucket.
#[derive(Debug, Clone)]
pub struct S3CompatBackend {
    client: Client,
    bucket: String,
    storage_type: &'static str,
    domain: String,
    part_size: u64,
}

impl S3CompatBackend {
    /// Wrap a configured client.
    pub fn from_client(
        client: Client,
        storage_type: &'static str,
        bucket: impl Into<String>,
        domain: impl Into<String>,
        part_size: u64,
    ) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            storage_type,
            domain: domain.into(),
            part_size: part_size.max(1),
        }
    }

    /// Bucket every object lives in.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_single(
        &self,
        key: &str,
        mut file: File,
        total: u64,
        content_type: &str,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> Result<UploadReceipt> {
        let mut data = Vec::with_capacity(total as usize);
        file.read_to_end(&mut data).await?;
        let size = data.len() as u64;

        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(Bytes::from(data)))
            .send()
            .await
            .map_err(|e| StorageError::object_io(key, e))?;

        report(on_progress, size, size, size);

        let mut receipt = UploadReceipt::new(key, size);
        if let Some(etag) = output.e_tag() {
            receipt = receipt.with_etag(etag);
        }
        if let Some(version) = output.version_id() {
            receipt = receipt.with_version_id(version);
        }
        Ok(receipt)
    }

    async fn put_multipart(
        &self,
        key: &str,
        mut file: File,
        total: u64,
        content_type: &str,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> Result<UploadReceipt> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::object_io(key, e))?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| StorageError::object_io(key, "missing multipart upload id"))?
            .to_string();

        match self
            .send_parts(key, &upload_id, &mut file, total, on_progress)
            .await
        {
            Ok(parts) => {
                let completed = self
                    .client
                    .complete_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .multipart_upload(
                        CompletedMultipartUpload::builder()
                            .set_parts(Some(parts))
                            .build(),
                    )
                    .send()
                    .await
                    .map_err(|e| StorageError::object_io(key, e))?;

                let mut receipt = UploadReceipt::new(key, total);
                if let Some(etag) = completed.e_tag() {
                    receipt = receipt.with_etag(etag);
                }
                if let Some(version) = completed.version_id() {
                    receipt = receipt.with_version_id(version);
                }
                Ok(receipt)
            }
            Err(err) => {
                if let Err(abort) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    warn!(key = %key, error = %abort, "Failed to abort multipart upload");
                }
                Err(err)
            }
        }
    }

    async fn send_parts(
        &self,
        key: &str,
        upload_id: &str,
        file: &mut File,
        total: u64,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> Result<Vec<CompletedPart>> {
        let mut parts = Vec::new();
        let mut transferred = 0u64;
        let mut part_number = 1i32;

        loop {
            let mut chunk = Vec::with_capacity(self.part_size as usize);
            (&mut *file).take(self.part_size).read_to_end(&mut chunk).await?;
            if chunk.is_empty() {
                break;
            }
            let len = chunk.len() as u64;

            let output = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(Bytes::from(chunk)))
                .send()
                .await
                .map_err(|e| StorageError::object_io(key, e))?;

            parts.push(
                CompletedPart::builder()
                    .set_e_tag(output.e_tag().map(str::to_string))
                    .part_number(part_number)
                    .build(),
            );

            transferred += len;
            report(on_progress, len, transferred, total.max(transferred));
            debug!(key = %key, part = part_number, transferred, total, "Uploaded part");
            part_number += 1;
        }

        Ok(parts)
    }

    fn signed(presigned: PresignedRequest, method: SignedMethod, ttl: Duration) -> SignedUrl {
        let headers: Vec<(String, String)> = presigned
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        SignedUrl::new(presigned.uri(), method, ttl).with_headers(headers)
    }
}

fn presigning(key: &str, ttl: Duration) -> Result<PresigningConfig> {
    PresigningConfig::expires_in(ttl).map_err(|e| StorageError::object_io(key, e))
}

#[async_trait]
impl StorageBackend for S3CompatBackend {
    fn storage_type(&self) -> &'static str {
        self.storage_type
    }

    async fn upload(
        &self,
        object_name: &str,
        local_path: &Path,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> Result<UploadReceipt> {
        let key = object_name.trim_start_matches('/');
        let file = File::open(local_path)
            .await
            .map_err(|e| StorageError::object_io(key, format!("cannot open source: {e}")))?;
        let total = file.metadata().await?.len();
        let content_type = guess_content_type(local_path);

        let receipt = if total > self.part_size {
            self.put_multipart(key, file, total, &content_type, on_progress)
                .await?
        } else {
            self.put_single(key, file, total, &content_type, on_progress)
                .await?
        };

        debug!(
            key = %key,
            bucket = %self.bucket,
            size = receipt.size,
            backend = self.storage_type,
            "Uploaded object"
        );
        Ok(receipt)
    }

    async fn exists(&self, object_name: &str) -> Result<bool> {
        let key = object_name.trim_start_matches('/');
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => Err(StorageError::ExistenceCheck {
                object: key.to_string(),
                message: err.to_string(),
            }),
        }
    }

    async fn sign_upload_url(&self, object_name: &str, ttl: Duration) -> Result<SignedUrl> {
        let key = object_name.trim_start_matches('/');
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(guess_content_type(Path::new(key)))
            .presigned(presigning(key, ttl)?)
            .await
            .map_err(|e| StorageError::object_io(key, e))?;
        Ok(Self::signed(presigned, SignedMethod::Put, ttl))
    }

    async fn sign_download_url(&self, object_name: &str, ttl: Duration) -> Result<SignedUrl> {
        let key = object_name.trim_start_matches('/');
        let disposition = format!("attachment; filename=\"{}\"", object_base_name(key));
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .response_content_disposition(disposition)
            .presigned(presigning(key, ttl)?)
            .await
            .map_err(|e| StorageError::object_io(key, e))?;
        Ok(Self::signed(presigned, SignedMethod::Get, ttl))
    }

    fn public_domain(&self) -> String {
        self.domain.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_config::BehaviorVersion;
    use aws_sdk_s3::config::Region;

    #[test]
    fn test_checksums_only_when_required() {
        let sdk_config = SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("cn-hangzhou"))
            .build();
        let config = client_config(&sdk_config, false);

        assert!(matches!(
            config.request_checksum_calculation(),
            Some(RequestChecksumCalculation::WhenRequired)
        ));
        assert!(matches!(
            config.response_checksum_validation(),
            Some(ResponseChecksumValidation::WhenRequired)
        ));
    }
}
