/// Object storage for post images
///
/// Images are addressed by the name the client picked at upload time; the
/// object key is that name plus a fixed suffix.
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::sync::Arc;
use thiserror::Error;

use crate::config::StorageConfig;

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("image {0} not found")]
    NotFound(String),
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),
    #[error("object storage request failed: {0}")]
    Backend(String),
}

/// Extensions accepted on upload.
pub const ALLOWED_IMAGE_SUBTYPES: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// Check an upload's MIME type against the accepted image subtypes.
pub fn ensure_supported_image(content_type: &mime::Mime) -> Result<(), ImageStoreError> {
    let subtype = content_type.subtype().as_str();
    if content_type.type_() == mime::IMAGE && ALLOWED_IMAGE_SUBTYPES.contains(&subtype) {
        Ok(())
    } else {
        Err(ImageStoreError::UnsupportedType(content_type.to_string()))
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn put(&self, name: &str, body: Vec<u8>, content_type: &str)
        -> Result<(), ImageStoreError>;

    async fn get(&self, name: &str) -> Result<Vec<u8>, ImageStoreError>;

    async fn delete(&self, name: &str) -> Result<(), ImageStoreError>;
}

/// Delete images, logging instead of failing on individual errors.
///
/// Post mutations have already committed by the time images are released, so
/// a storage hiccup must not turn a successful request into an error.
pub async fn release_images(store: &dyn ImageStore, names: &[String]) {
    for name in names {
        match store.delete(name).await {
            Ok(()) => {
                crate::metrics::storage::IMAGE_STORE_OPERATIONS
                    .with_label_values(&["delete", "ok"])
                    .inc();
                tracing::debug!(image = %name, "Released image");
            }
            Err(e) => {
                crate::metrics::storage::IMAGE_STORE_OPERATIONS
                    .with_label_values(&["delete", "error"])
                    .inc();
                tracing::warn!(image = %name, error = %e, "Failed to release image");
            }
        }
    }
}

/// S3-backed image store.
#[derive(Clone)]
pub struct S3ImageStore {
    client: Arc<Client>,
    bucket: String,
    key_suffix: String,
}

impl S3ImageStore {
    pub async fn from_config(config: &StorageConfig) -> Self {
        let shared = aws_config::from_env()
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Arc::new(Client::from_conf(builder.build())),
            bucket: config.bucket.clone(),
            key_suffix: config.key_suffix.clone(),
        }
    }

    fn key(&self, name: &str) -> String {
        object_key(name, &self.key_suffix)
    }

    /// Health check for bucket reachability
    pub async fn health_check(&self) -> Result<(), ImageStoreError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| ImageStoreError::Backend(e.to_string()))?;
        Ok(())
    }
}

pub(crate) fn object_key(name: &str, suffix: &str) -> String {
    format!("{}{}", name, suffix)
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn put(
        &self,
        name: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ImageStoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.key(name))
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| ImageStoreError::Backend(e.to_string()))?;

        crate::metrics::storage::IMAGE_STORE_OPERATIONS
            .with_label_values(&["put", "ok"])
            .inc();
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>, ImageStoreError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.key(name))
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    ImageStoreError::NotFound(name.to_string())
                } else {
                    ImageStoreError::Backend(service_error.to_string())
                }
            })?;

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| ImageStoreError::Backend(e.to_string()))?;
        Ok(body.into_bytes().to_vec())
    }

    async fn delete(&self, name: &str) -> Result<(), ImageStoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(self.key(name))
            .send()
            .await
            .map_err(|e| ImageStoreError::Backend(e.to_string()))?;
        Ok(())
    }
}
