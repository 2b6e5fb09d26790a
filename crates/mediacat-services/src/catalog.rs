//! Media catalog facade
//!
//! The single entry point the transport layer talks to. Owns the store handle, the
//! quota guard and the metadata index for one process.
//!
//! The index is a cache of the store. It is rebuilt from the store listing on first
//! access and on `reconcile`; a rebuild assigns fresh ids and resets every record's
//! platform and thumbnail flag, so edits made since the last rebuild are lost. Between
//! rebuilds, blobs added or removed outside the catalog are not reflected in the index.

use std::sync::Arc;

use futures::TryStreamExt;
use mediacat_core::constants::MEDIA_PREFIX;
use mediacat_core::{AppError, Config, MediaPatch, MediaRecord, StorageUsage};
use mediacat_storage::{create_storage, Storage, StorageError};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::index::MetadataIndex;
use crate::quota::{QuotaGuard, QuotaLimits};
use crate::upload::{CreateMediaRequest, UploadOrchestrator};

pub struct MediaCatalog {
    storage: Arc<dyn Storage>,
    quota: Arc<QuotaGuard>,
    index: Arc<MetadataIndex>,
    uploads: UploadOrchestrator,
    rebuild: Mutex<()>,
}

impl MediaCatalog {
    pub fn new(storage: Arc<dyn Storage>, limits: QuotaLimits, cache_usage: bool) -> Self {
        let quota = Arc::new(QuotaGuard::new(storage.clone(), limits, cache_usage));
        let index = Arc::new(MetadataIndex::new());
        let uploads = UploadOrchestrator::new(storage.clone(), quota.clone(), index.clone());

        Self {
            storage,
            quota,
            index,
            uploads,
            rebuild: Mutex::new(()),
        }
    }

    /// Build a catalog over the backend selected by `config`.
    pub async fn from_config(config: &Config) -> Result<Self, AppError> {
        let storage = create_storage(config).await.map_err(|e| {
            tracing::error!(error = %e, backend = %config.storage_backend(), "Failed to create storage backend");
            AppError::from(e)
        })?;

        tracing::info!(
            backend = %storage.backend_type(),
            max_upload_bytes = config.max_upload_bytes(),
            storage_capacity_bytes = config.storage_capacity_bytes(),
            quota_usage_cache = config.quota_usage_cache(),
            "Media catalog initialized"
        );

        Ok(Self::new(
            storage,
            QuotaLimits::from_config(config),
            config.quota_usage_cache(),
        ))
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn quota(&self) -> &QuotaGuard {
        &self.quota
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_media(&self) -> Result<Vec<MediaRecord>, AppError> {
        self.ensure_loaded().await?;
        Ok(self.index.list().await)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_media(&self, id: Uuid) -> Result<MediaRecord, AppError> {
        self.ensure_loaded().await?;
        self.index.find(id).await
    }

    /// Look a record up by its storage key.
    ///
    /// Keys survive a rebuild where ids do not.
    pub async fn find_by_key(&self, key: &str) -> Result<MediaRecord, AppError> {
        self.ensure_loaded().await?;
        self.index
            .find_by_key(key)
            .await
            .ok_or_else(|| AppError::NotFound(format!("No media stored under {}", key)))
    }

    #[tracing::instrument(
        skip(self, request),
        fields(
            content_type = %request.content_type,
            original_filename = %request.original_filename,
            size_bytes = request.data.len()
        )
    )]
    pub async fn create_media(&self, request: CreateMediaRequest) -> Result<MediaRecord, AppError> {
        self.ensure_loaded().await?;
        self.uploads.upload(request).await
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_media(&self, id: Uuid, patch: MediaPatch) -> Result<MediaRecord, AppError> {
        self.ensure_loaded().await?;
        self.index.update(id, &patch).await
    }

    /// Remove the stored object, then the record.
    ///
    /// A store `NotFound` is tolerated as long as this call still finds and removes the
    /// index entry; a store outage leaves the record in place. Runs under the rebuild
    /// lock so a concurrent `reconcile` cannot swap the index mid-delete.
    #[tracing::instrument(skip(self))]
    pub async fn delete_media(&self, id: Uuid) -> Result<(), AppError> {
        self.ensure_loaded().await?;
        let _rebuild = self.rebuild.lock().await;
        let record = self.index.find(id).await?;

        match self.storage.remove(&record.storage_location).await {
            Ok(()) => {}
            Err(StorageError::NotFound(key)) => {
                tracing::warn!(
                    media_id = %id,
                    key = %key,
                    "Stored object already absent, removing stale record"
                );
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    media_id = %id,
                    key = %record.storage_location.key,
                    "Failed to delete stored object"
                );
                return Err(e.into());
            }
        }

        self.quota.invalidate().await;
        self.index.remove(id).await?;

        tracing::info!(
            media_id = %id,
            key = %record.storage_location.key,
            "Media deleted"
        );

        Ok(())
    }

    /// Rebuild the index from the store listing, returning the number of records.
    ///
    /// Uploads are held off for the duration so none lands between the listing and
    /// the swap.
    #[tracing::instrument(skip(self))]
    pub async fn reconcile(&self) -> Result<usize, AppError> {
        let _rebuild = self.rebuild.lock().await;
        let _admissions = self.quota.hold_admissions().await;

        self.quota.invalidate().await;
        self.rebuild_index().await
    }

    pub async fn usage(&self) -> Result<StorageUsage, AppError> {
        self.quota.usage().await
    }

    pub async fn list_platform(&self, platform_id: &str) -> Result<Vec<MediaRecord>, AppError> {
        self.ensure_loaded().await?;
        Ok(self.index.list_platform(platform_id).await)
    }

    pub async fn platform_thumbnail(
        &self,
        platform_id: &str,
    ) -> Result<Option<MediaRecord>, AppError> {
        self.ensure_loaded().await?;
        Ok(self.index.platform_thumbnail(platform_id).await)
    }

    async fn ensure_loaded(&self) -> Result<(), AppError> {
        if self.index.is_loaded().await {
            return Ok(());
        }

        let _rebuild = self.rebuild.lock().await;
        if self.index.is_loaded().await {
            return Ok(());
        }

        self.rebuild_index().await.map(|_| ())
    }

    async fn rebuild_index(&self) -> Result<usize, AppError> {
        let start = std::time::Instant::now();

        let objects: Vec<_> = self.storage.list(MEDIA_PREFIX).try_collect().await?;
        let listed = objects.len();

        let records: Vec<MediaRecord> = objects
            .iter()
            .filter_map(|object| {
                let record = MediaRecord::from_stored_object(object);
                if record.is_none() {
                    tracing::debug!(
                        key = %object.location.key,
                        content_type = %object.content_type,
                        "Skipping stored object with unsupported type"
                    );
                }
                record
            })
            .collect();
        let count = records.len();

        self.index.replace_all(records).await;

        tracing::info!(
            records = count,
            skipped = listed - count,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Rebuilt media index from store"
        );

        Ok(count)
    }
}
