//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::{StorageBackend, StorageLocation, StoredObject};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use mediacat_core::AppError;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("Stored object not found: {}", key)),
            other => AppError::StoreUnavailable(other.to_string()),
        }
    }
}

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem, memory) must implement this trait, so
/// the catalog works with any backend without coupling to its details.
///
/// **Key format:** `media/{uuid}.{extension}`. See the crate root documentation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist `data` under a freshly generated key and return its location.
    ///
    /// Never overwrites an existing object. Fails with `UploadFailed` (or an IO error)
    /// when the medium is unreachable or out of space.
    async fn put(
        &self,
        data: Bytes,
        content_type: &str,
        extension: &str,
    ) -> StorageResult<StorageLocation>;

    /// List every object whose key starts with `prefix`.
    ///
    /// The stream is lazy and finite; calling `list` again restarts it. Ordering is
    /// backend-defined and may differ between calls.
    fn list<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, StorageResult<StoredObject>>;

    /// Current size in bytes. Fails with `NotFound` if the object is gone.
    async fn size_of(&self, location: &StorageLocation) -> StorageResult<u64>;

    /// Delete an object. Not idempotent: fails with `NotFound` if already absent.
    async fn remove(&self, location: &StorageLocation) -> StorageResult<()>;

    /// Caller-resolvable URL for a storage key.
    fn public_url(&self, key: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
