use std::time::Duration;

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::{RetryConfig, RetryMode};
use aws_config::BehaviorVersion;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;

use memoria_core::constants::UPLOAD_AUTHORIZATION_SECS;

use crate::{StorageError, StorageResult, UploadBroker, WriteAuthorization};

/// Bound on one direct PUT; the authorization itself expires sooner.
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(30);

/// S3-backed upload broker. Works against AWS or any S3-compatible provider
/// (MinIO, DigitalOcean Spaces) via a custom endpoint with path-style
/// addressing.
#[derive(Clone)]
pub struct S3Broker {
    client: Client,
    http: reqwest::Client,
    bucket: String,
    region: String,
    endpoint_url: Option<String>,
}

impl S3Broker {
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let region_provider =
            RegionProviderChain::first_try(aws_config::Region::new(region.clone()));

        let retry_config = RetryConfig::standard()
            .with_max_attempts(5)
            .with_retry_mode(RetryMode::Adaptive);

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .retry_config(retry_config.clone())
            .load()
            .await;

        let client = if let Some(ref endpoint) = endpoint_url {
            // Path-style addressing is required by most S3-compatible providers.
            let mut s3_config_builder = aws_sdk_s3::Config::builder()
                .endpoint_url(endpoint)
                .region(config.region().cloned())
                .retry_config(retry_config);
            if let Some(provider) = config.credentials_provider().into_iter().next() {
                s3_config_builder = s3_config_builder.credentials_provider(provider);
            }
            s3_config_builder = s3_config_builder.force_path_style(true);
            Client::from_conf(s3_config_builder.build())
        } else {
            Client::new(&config)
        };

        let http = reqwest::Client::builder()
            .timeout(TRANSFER_TIMEOUT)
            .build()
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(S3Broker {
            client,
            http,
            bucket,
            region,
            endpoint_url,
        })
    }
}

#[async_trait]
impl UploadBroker for S3Broker {
    async fn authorize(
        &self,
        storage_key: &str,
        content_type: &str,
    ) -> StorageResult<WriteAuthorization> {
        let presigning_config = PresigningConfig::builder()
            .expires_in(Duration::from_secs(UPLOAD_AUTHORIZATION_SECS))
            .build()
            .map_err(|e| StorageError::Authorization(e.to_string()))?;

        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .content_type(content_type)
            .presigned(presigning_config)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    "Presigning upload URL failed"
                );
                StorageError::Authorization(e.to_string())
            })?;

        Ok(WriteAuthorization {
            url: presigned.uri().to_string(),
            storage_key: storage_key.to_string(),
            content_type: content_type.to_string(),
            valid_secs: UPLOAD_AUTHORIZATION_SECS,
        })
    }

    async fn transfer(
        &self,
        authorization: &WriteAuthorization,
        bytes: Vec<u8>,
    ) -> StorageResult<()> {
        let size = bytes.len() as u64;
        let start = std::time::Instant::now();

        let response = self
            .http
            .put(&authorization.url)
            .header(reqwest::header::CONTENT_TYPE, &authorization.content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    key = %authorization.storage_key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Direct transfer failed"
                );
                StorageError::Transfer(e.to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!(
                status = %response.status(),
                key = %authorization.storage_key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Direct transfer rejected"
            );
            return Err(StorageError::Transfer(format!(
                "object store responded {}",
                response.status()
            )));
        }

        tracing::info!(
            key = %authorization.storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Direct transfer successful"
        );
        Ok(())
    }

    async fn remove(&self, storage_key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();

        // DeleteObject succeeds for keys that no longer exist, which is
        // exactly the idempotency the reconciler relies on.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Object removal failed"
                );
                StorageError::Removal(e.to_string())
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Object removal successful"
        );
        Ok(())
    }

    fn public_url(&self, storage_key: &str) -> String {
        if let Some(ref endpoint) = self.endpoint_url {
            let base_url = endpoint.trim_end_matches('/');
            format!("{}/{}/{}", base_url, self.bucket, storage_key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, storage_key
            )
        }
    }
}
