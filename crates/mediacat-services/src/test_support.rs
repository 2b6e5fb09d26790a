//! `MemoryStorage` wrapper that can stall a listing or refuse removals.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use mediacat_storage::{
    MemoryStorage, Storage, StorageBackend, StorageError, StorageLocation, StorageResult,
    StoredObject,
};
use tokio::sync::Notify;

#[derive(Default)]
pub(crate) struct ScriptedStorage {
    pub(crate) inner: MemoryStorage,
    pause_next_listing: AtomicBool,
    fail_removes: AtomicBool,
    listing_started: Notify,
    listing_released: Notify,
}

impl ScriptedStorage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The next `list` snapshots the objects, then waits for `release_listing`.
    pub(crate) fn pause_next_listing(&self) {
        self.pause_next_listing.store(true, Ordering::SeqCst);
    }

    pub(crate) async fn listing_started(&self) {
        self.listing_started.notified().await;
    }

    pub(crate) fn release_listing(&self) {
        self.listing_released.notify_one();
    }

    pub(crate) fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Storage for ScriptedStorage {
    async fn put(
        &self,
        data: Bytes,
        content_type: &str,
        extension: &str,
    ) -> StorageResult<StorageLocation> {
        self.inner.put(data, content_type, extension).await
    }

    fn list<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, StorageResult<StoredObject>> {
        if !self.pause_next_listing.swap(false, Ordering::SeqCst) {
            return self.inner.list(prefix);
        }

        let snapshot = async move {
            let objects: Vec<_> = self.inner.list(prefix).collect().await;
            self.listing_started.notify_one();
            self.listing_released.notified().await;
            stream::iter(objects)
        };
        stream::once(snapshot).flatten().boxed()
    }

    async fn size_of(&self, location: &StorageLocation) -> StorageResult<u64> {
        self.inner.size_of(location).await
    }

    async fn remove(&self, location: &StorageLocation) -> StorageResult<()> {
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed(location.key.clone()));
        }
        self.inner.remove(location).await
    }

    fn public_url(&self, key: &str) -> String {
        self.inner.public_url(key)
    }

    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }
}
