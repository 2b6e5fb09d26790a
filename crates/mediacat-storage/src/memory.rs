//! In-process storage backend.
//!
//! Objects live in a map for the lifetime of the process. Used for development and as
//! the test double for the catalog: it counts `put` calls and can be switched into an
//! unavailable mode where every operation fails with a backend error.

use crate::keys::{generate_storage_key, validate_key};
use crate::traits::{Storage, StorageError, StorageResult};
use crate::{StorageBackend, StorageLocation, StoredObject};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

const MEMORY_BASE_URL: &str = "memory://";

#[derive(Debug, Clone)]
struct MemoryObject {
    data: Bytes,
    content_type: String,
    last_modified: DateTime<Utc>,
}

/// Memory storage implementation
#[derive(Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<RwLock<BTreeMap<String, MemoryObject>>>,
    put_calls: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `put` calls received, successful or not.
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent operation fail (or succeed again) with a backend error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn total_bytes(&self) -> u64 {
        self.objects
            .read()
            .map(|objects| objects.values().map(|o| o.data.len() as u64).sum())
            .unwrap_or(0)
    }

    /// Read back an object's bytes.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.objects
            .read()
            .ok()
            .and_then(|objects| objects.get(key).map(|o| o.data.clone()))
    }

    /// Store an object under an explicit key, bypassing key generation.
    ///
    /// Simulates writes made to the bucket by something other than the catalog.
    pub fn insert_raw(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        validate_key(key)?;
        self.write()?.insert(
            key.to_string(),
            MemoryObject {
                data,
                content_type: content_type.to_string(),
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    /// Remove an object without going through `remove`, returning whether it existed.
    ///
    /// Simulates an out-of-band deletion.
    pub fn evict(&self, key: &str) -> bool {
        self.objects
            .write()
            .map(|mut objects| objects.remove(key).is_some())
            .unwrap_or(false)
    }

    fn check_available(&self) -> StorageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::BackendError(
                "memory storage is unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn write(
        &self,
    ) -> StorageResult<std::sync::RwLockWriteGuard<'_, BTreeMap<String, MemoryObject>>> {
        self.objects
            .write()
            .map_err(|_| StorageError::BackendError("memory storage lock poisoned".to_string()))
    }

    fn location(&self, key: String) -> StorageLocation {
        StorageLocation {
            backend: StorageBackend::Memory,
            bucket: None,
            url: self.public_url(&key),
            key,
        }
    }

    fn snapshot(&self, prefix: &str) -> StorageResult<Vec<StoredObject>> {
        self.check_available()?;
        let objects = self
            .objects
            .read()
            .map_err(|_| StorageError::BackendError("memory storage lock poisoned".to_string()))?;

        Ok(objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| StoredObject {
                location: self.location(key.clone()),
                size_bytes: object.data.len() as u64,
                content_type: object.content_type.clone(),
                last_modified: Some(object.last_modified),
            })
            .collect())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(
        &self,
        data: Bytes,
        content_type: &str,
        extension: &str,
    ) -> StorageResult<StorageLocation> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        let key = generate_storage_key(extension);
        let size = data.len();
        {
            let mut objects = self.write()?;
            if objects.contains_key(&key) {
                return Err(StorageError::UploadFailed(format!(
                    "Object already exists: {}",
                    key
                )));
            }
            objects.insert(
                key.clone(),
                MemoryObject {
                    data,
                    content_type: content_type.to_string(),
                    last_modified: Utc::now(),
                },
            );
        }

        tracing::debug!(key = %key, size_bytes = size, "Memory storage upload successful");

        Ok(self.location(key))
    }

    fn list<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, StorageResult<StoredObject>> {
        match self.snapshot(prefix) {
            Ok(objects) => stream::iter(objects.into_iter().map(Ok)).boxed(),
            Err(e) => stream::once(async move { Err(e) }).boxed(),
        }
    }

    async fn size_of(&self, location: &StorageLocation) -> StorageResult<u64> {
        self.check_available()?;
        self.objects
            .read()
            .map_err(|_| StorageError::BackendError("memory storage lock poisoned".to_string()))?
            .get(&location.key)
            .map(|o| o.data.len() as u64)
            .ok_or_else(|| StorageError::NotFound(location.key.clone()))
    }

    async fn remove(&self, location: &StorageLocation) -> StorageResult<()> {
        self.check_available()
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

        match self.write()?.remove(&location.key) {
            Some(_) => {
                tracing::debug!(key = %location.key, "Memory storage delete successful");
                Ok(())
            }
            None => Err(StorageError::NotFound(location.key.clone())),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}{}", MEMORY_BASE_URL, key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn put_list_remove_cycle() {
        let storage = MemoryStorage::new();

        let location = storage
            .put(Bytes::from_static(b"abc"), "image/png", "png")
            .await
            .unwrap();
        assert_eq!(storage.put_calls(), 1);
        assert_eq!(storage.size_of(&location).await.unwrap(), 3);
        assert_eq!(location.url, format!("memory://{}", location.key));

        let listed: Vec<StoredObject> = storage.list("media").try_collect().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].content_type, "image/png");

        storage.remove(&location).await.unwrap();
        assert!(matches!(
            storage.remove(&location).await,
            Err(StorageError::NotFound(_))
        ));
        assert_eq!(storage.object_count(), 0);
    }

    #[tokio::test]
    async fn unavailable_mode_fails_every_operation() {
        let storage = MemoryStorage::new();
        let location = storage
            .put(Bytes::from_static(b"abc"), "image/png", "png")
            .await
            .unwrap();

        storage.set_unavailable(true);
        assert!(storage
            .put(Bytes::from_static(b"x"), "image/png", "png")
            .await
            .is_err());
        assert!(storage.size_of(&location).await.is_err());
        assert!(storage.remove(&location).await.is_err());
        let listed: Result<Vec<StoredObject>, _> = storage.list("media").try_collect().await;
        assert!(listed.is_err());
        assert_eq!(storage.put_calls(), 2);

        storage.set_unavailable(false);
        assert_eq!(storage.object_count(), 1);
    }

    #[tokio::test]
    async fn list_is_restartable_and_prefix_scoped() {
        let storage = MemoryStorage::new();
        storage
            .insert_raw("other/x.png", Bytes::from_static(b"zz"), "image/png")
            .unwrap();
        storage
            .put(Bytes::from_static(b"abc"), "audio/mpeg", "mp3")
            .await
            .unwrap();

        for _ in 0..2 {
            let listed: Vec<StoredObject> = storage.list("media").try_collect().await.unwrap();
            assert_eq!(listed.len(), 1);
        }
        assert!(storage.evict("other/x.png"));
        assert!(!storage.evict("other/x.png"));
    }
}
