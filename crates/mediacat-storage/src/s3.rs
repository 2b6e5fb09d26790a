use crate::keys::{content_type_for_key, generate_storage_key, validate_key};
use crate::traits::{Storage, StorageError, StorageResult};
use crate::{StorageBackend, StorageLocation, StoredObject};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, ObjectMeta, ObjectStore, ObjectStoreExt, PutMode, PutOptions,
    PutPayload, Result as ObjectResult,
};

/// S3 storage implementation
///
/// Objects are written with their `Content-Type` attribute. Public URLs assume the bucket
/// (or a CDN in front of it) serves objects under the media prefix to anonymous readers;
/// granting that access is a bucket-policy concern, not something set per object.
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        // Credentials come from the environment; bucket and region are explicit.
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket,
            region,
            endpoint_url,
        })
    }

    /// Generate public URL for S3 object
    ///
    /// For AWS S3, uses the standard format: https://{bucket}.s3.{region}.amazonaws.com/{key}
    /// For S3-compatible providers, uses path-style: {endpoint}/{bucket}/{key}
    fn generate_url(&self, key: &str) -> String {
        if let Some(ref endpoint) = self.endpoint_url {
            let base_url = endpoint.trim_end_matches('/');
            format!("{}/{}/{}", base_url, self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }

    fn location(&self, key: String) -> StorageLocation {
        StorageLocation {
            backend: StorageBackend::S3,
            bucket: Some(self.bucket.clone()),
            url: self.generate_url(&key),
            key,
        }
    }

    fn stored_object(&self, meta: ObjectMeta) -> StoredObject {
        let key = meta.location.to_string();
        StoredObject {
            content_type: content_type_for_key(&key),
            size_bytes: meta.size as u64,
            last_modified: Some(meta.last_modified),
            location: self.location(key),
        }
    }

    async fn head(&self, location: &StorageLocation) -> StorageResult<ObjectMeta> {
        validate_key(&location.key)?;
        let path = Path::from(location.key.as_str());

        self.store.head(&path).await.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(location.key.clone()),
            other => StorageError::BackendError(other.to_string()),
        })
    }
}

/// Put options that fail instead of replacing an existing object.
fn create_only(content_type: &str) -> PutOptions {
    let mut attributes = Attributes::new();
    attributes.insert(Attribute::ContentType, content_type.to_string().into());

    PutOptions {
        mode: PutMode::Create,
        attributes,
        ..Default::default()
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn put(
        &self,
        data: Bytes,
        content_type: &str,
        extension: &str,
    ) -> StorageResult<StorageLocation> {
        let key = generate_storage_key(extension);
        let size = data.len() as u64;
        let path = Path::from(key.as_str());

        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self
            .store
            .put_opts(&path, PutPayload::from(data), create_only(content_type))
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(self.location(key))
    }

    fn list<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, StorageResult<StoredObject>> {
        let prefix = Path::from(prefix.trim_end_matches('/'));

        self.store
            .list(Some(&prefix))
            .map(move |result| match result {
                Ok(meta) => Ok(self.stored_object(meta)),
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        bucket = %self.bucket,
                        prefix = %prefix,
                        "S3 list failed"
                    );
                    Err(StorageError::BackendError(e.to_string()))
                }
            })
            .boxed()
    }

    async fn size_of(&self, location: &StorageLocation) -> StorageResult<u64> {
        Ok(self.head(location).await?.size as u64)
    }

    async fn remove(&self, location: &StorageLocation) -> StorageResult<()> {
        // S3 deletes succeed for missing keys; check with a head request first so absence is reported.
        self.head(location).await?;

        let start = std::time::Instant::now();
        let path = Path::from(location.key.as_str());

        let result: ObjectResult<_> = self.store.delete(&path).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %location.key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 delete failed"
            );
            StorageError::DeleteFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %location.key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        self.generate_url(key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn urls_follow_endpoint_style() {
        let aws = S3Storage::new("media-bucket".to_string(), "eu-west-1".to_string(), None)
            .await
            .unwrap();
        assert_eq!(
            aws.public_url("media/a.png"),
            "https://media-bucket.s3.eu-west-1.amazonaws.com/media/a.png"
        );

        let minio = S3Storage::new(
            "media-bucket".to_string(),
            "us-east-1".to_string(),
            Some("http://localhost:9000/".to_string()),
        )
        .await
        .unwrap();
        assert_eq!(
            minio.public_url("media/a.png"),
            "http://localhost:9000/media-bucket/media/a.png"
        );
        assert_eq!(minio.backend_type(), StorageBackend::S3);
    }

    #[test]
    fn puts_never_overwrite() {
        let options = create_only("video/webm");

        assert!(matches!(options.mode, PutMode::Create));
        assert_eq!(
            options
                .attributes
                .get(&Attribute::ContentType)
                .map(|value| AsRef::<str>::as_ref(value)),
            Some("video/webm")
        );
    }
}
