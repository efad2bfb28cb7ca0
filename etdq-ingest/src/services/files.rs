//! Content file collection from object storage

use async_trait::async_trait;
use aws_sdk_s3::Client;
use etdq_common::config::StorageSettings;

use crate::error::StoreError;

/// Extensions accepted as deposit content
const CONTENT_EXTENSIONS: &[&str] = &[".pdf", ".txt"];

/// Narrow read interface over object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List object keys under a prefix
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Download one object
    async fn download(&self, key: &str) -> Result<Vec<u8>, StoreError>;
}

/// List a bag's content files: keys under `private/<source>/<bag>/data/`
/// filtered to the content-extension allowlist
pub async fn list_bag_files(
    store: &dyn ObjectStore,
    settings: &StorageSettings,
    bag: &str,
) -> Result<Vec<String>, StoreError> {
    let prefix = settings.data_prefix(bag);
    let keys = store.list(&prefix).await?;
    Ok(keys
        .into_iter()
        .filter(|k| CONTENT_EXTENSIONS.iter().any(|ext| k.ends_with(ext)))
        .collect())
}

/// S3-backed object store
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Build an S3 client from the ambient AWS environment, honoring a
    /// custom endpoint (MinIO-style deployments need path addressing)
    pub async fn connect(settings: &StorageSettings) -> Self {
        let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Self {
            client: Client::from_conf(builder.build()),
            bucket: settings.bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| StoreError::Unavailable(e.to_string()))?;
            for object in page.contents() {
                if let Some(key) = object.key() {
                    keys.push(key.to_string());
                }
            }
        }

        tracing::debug!(prefix = %prefix, count = keys.len(), "Listed object storage keys");
        Ok(keys)
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(bytes.into_bytes().to_vec())
    }
}
