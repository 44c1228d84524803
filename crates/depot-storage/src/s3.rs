use crate::keys::validate_key;
use crate::traits::{RemoteStore, RemoteStoreError, RemoteStoreResult};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use depot_core::RemoteBackend;
use std::path::Path;
use std::time::Duration;

/// S3 (or S3-compatible) remote store.
#[derive(Clone)]
pub struct S3RemoteStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3RemoteStore {
    /// Create a new S3 store against the given bucket.
    ///
    /// Credentials come from the default AWS provider chain. A custom
    /// `endpoint_url` (MinIO, etc.) switches the client to path-style
    /// addressing.
    pub async fn new(
        bucket: String,
        region: Option<String>,
        endpoint_url: Option<String>,
    ) -> RemoteStoreResult<Self> {
        if bucket.is_empty() {
            return Err(RemoteStoreError::ConfigError(
                "S3 bucket must not be empty".to_string(),
            ));
        }

        let region_provider = RegionProviderChain::first_try(region.map(Region::new))
            .or_default_provider()
            .or_else(Region::new("us-east-1"));

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region_provider);
        if let Some(ref endpoint) = endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let shared_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if endpoint_url.is_some() {
            builder = builder.force_path_style(true);
        }

        Ok(S3RemoteStore {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket,
        })
    }
}

#[async_trait]
impl RemoteStore for S3RemoteStore {
    async fn put(&self, object_key: &str, local_path: &Path) -> RemoteStoreResult<()> {
        validate_key(object_key)?;
        let start = std::time::Instant::now();

        let body = ByteStream::from_path(local_path).await.map_err(|e| {
            RemoteStoreError::PutFailed(format!(
                "Failed to open {}: {}",
                local_path.display(),
                e
            ))
        })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(object_key)
            .body(body)
            .send()
            .await
            .map_err(|e| RemoteStoreError::PutFailed(e.into_service_error().to_string()))?;

        tracing::info!(
            bucket = %self.bucket,
            key = %object_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 put successful"
        );

        Ok(())
    }

    async fn get(&self, object_key: &str, dest_path: &Path) -> RemoteStoreResult<()> {
        validate_key(object_key)?;

        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(object_key)
            .send()
            .await
            .map_err(|e| {
                let service_err = e.into_service_error();
                if service_err.is_no_such_key() {
                    RemoteStoreError::NotFound(object_key.to_string())
                } else {
                    RemoteStoreError::GetFailed(service_err.to_string())
                }
            })?;

        if let Some(parent) = dest_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut body = resp.body.into_async_read();
        let mut file = tokio::fs::File::create(dest_path).await?;
        tokio::io::copy(&mut body, &mut file)
            .await
            .map_err(|e| RemoteStoreError::GetFailed(format!("Failed to write object: {}", e)))?;
        file.sync_all().await?;

        Ok(())
    }

    async fn delete(&self, object_key: &str) -> RemoteStoreResult<()> {
        validate_key(object_key)?;

        // S3 delete succeeds for missing keys, matching the trait contract.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(object_key)
            .send()
            .await
            .map_err(|e| RemoteStoreError::DeleteFailed(e.into_service_error().to_string()))?;

        tracing::info!(bucket = %self.bucket, key = %object_key, "S3 delete successful");

        Ok(())
    }

    async fn presigned_get_url(
        &self,
        object_key: &str,
        expires_in: Duration,
    ) -> RemoteStoreResult<String> {
        validate_key(object_key)?;

        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| RemoteStoreError::ConfigError(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(object_key)
            .presigned(presigning)
            .await
            .map_err(|e| RemoteStoreError::BackendError(e.into_service_error().to_string()))?;

        Ok(request.uri().to_string())
    }

    async fn exists(&self, object_key: &str) -> RemoteStoreResult<bool> {
        validate_key(object_key)?;

        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(object_key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(RemoteStoreError::BackendError(service_err.to_string()))
                }
            }
        }
    }

    fn backend_type(&self) -> RemoteBackend {
        RemoteBackend::S3
    }
}
