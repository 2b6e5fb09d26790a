//! Upload orchestrator
//!
//! Drives one upload through `Received -> Validated -> Admitted -> Persisted -> Indexed
//! -> Complete`. Validation happens before the store is touched; admission and the
//! store write share the quota guard's critical section. A failure after the write
//! removes the blob again so no index entry points at nothing and nothing is stored
//! that the index does not know about. A crash between the write and the index insert
//! still leaves an orphan, which the next rebuild picks up.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use mediacat_core::constants::{DEFAULT_MEDIA_NAME, MAX_NAME_LENGTH};
use mediacat_core::{AppError, MediaMimeType, MediaRecord, StorageLocation};
use mediacat_storage::Storage;
use uuid::Uuid;

use crate::index::MetadataIndex;
use crate::quota::QuotaGuard;

/// Stage an upload has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Received,
    Validated,
    Admitted,
    Persisted,
    Indexed,
    Complete,
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            UploadStage::Received => "received",
            UploadStage::Validated => "validated",
            UploadStage::Admitted => "admitted",
            UploadStage::Persisted => "persisted",
            UploadStage::Indexed => "indexed",
            UploadStage::Complete => "complete",
        };
        f.write_str(stage)
    }
}

/// A buffered upload and the metadata it should be indexed with.
#[derive(Debug, Clone)]
pub struct CreateMediaRequest {
    pub data: Bytes,
    pub content_type: String,
    pub original_filename: String,
    pub name: Option<String>,
    pub platform_id: Option<String>,
    pub is_thumbnail: bool,
}

impl CreateMediaRequest {
    pub fn new(
        data: impl Into<Bytes>,
        content_type: impl Into<String>,
        original_filename: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            content_type: content_type.into(),
            original_filename: original_filename.into(),
            name: None,
            platform_id: None,
            is_thumbnail: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_platform(mut self, platform_id: impl Into<String>) -> Self {
        self.platform_id = Some(platform_id.into());
        self
    }

    pub fn thumbnail(mut self, is_thumbnail: bool) -> Self {
        self.is_thumbnail = is_thumbnail;
        self
    }
}

/// Request that passed validation; nothing has been written yet.
struct ValidatedUpload {
    data: Bytes,
    mime_type: MediaMimeType,
    extension: &'static str,
    name: String,
    platform_id: Option<String>,
    is_thumbnail: bool,
}

/// Sanitize an uploaded filename for use as a display name.
///
/// Keeps the final path component, replaces anything outside `[A-Za-z0-9._-]` with `_`
/// and drops leading dots. Falls back to `DEFAULT_MEDIA_NAME` when too little is left.
pub fn sanitize_filename(filename: &str) -> String {
    let filename_only = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let sanitized: String = filename_only
        .chars()
        .take(MAX_NAME_LENGTH)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let sanitized = sanitized.trim_start_matches('.');

    if sanitized.trim_matches('_').is_empty() || sanitized.len() < 3 {
        return DEFAULT_MEDIA_NAME.to_string();
    }

    sanitized.to_string()
}

pub struct UploadOrchestrator {
    storage: Arc<dyn Storage>,
    quota: Arc<QuotaGuard>,
    index: Arc<MetadataIndex>,
    new_id: fn() -> Uuid,
}

impl UploadOrchestrator {
    pub fn new(
        storage: Arc<dyn Storage>,
        quota: Arc<QuotaGuard>,
        index: Arc<MetadataIndex>,
    ) -> Self {
        Self {
            storage,
            quota,
            index,
            new_id: Uuid::new_v4,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_id_source(mut self, new_id: fn() -> Uuid) -> Self {
        self.new_id = new_id;
        self
    }

    /// Run the full pipeline and return the indexed record.
    pub async fn upload(&self, request: CreateMediaRequest) -> Result<MediaRecord, AppError> {
        let start = std::time::Instant::now();
        let original_filename = request.original_filename.clone();

        let validated = self.validate(request).inspect_err(|e| {
            tracing::info!(
                error = %e,
                stage = %UploadStage::Received,
                original_filename = %original_filename,
                "Upload rejected"
            );
        })?;

        let size = validated.data.len() as u64;
        let record = self
            .quota
            .with_admission(size, || self.persist_and_index(validated))
            .await?;

        tracing::info!(
            media_id = %record.id,
            key = %record.storage_location.key,
            mime_type = %record.mime_type,
            size_bytes = record.size_bytes,
            stage = %UploadStage::Complete,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Upload complete"
        );

        Ok(record)
    }

    /// `Received -> Validated`: allow-listed type and per-object ceiling.
    fn validate(&self, request: CreateMediaRequest) -> Result<ValidatedUpload, AppError> {
        let mime_type = MediaMimeType::parse(&request.content_type)?;
        self.quota.check_object_size(request.data.len() as u64)?;

        let name = request
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| sanitize_filename(&request.original_filename));

        Ok(ValidatedUpload {
            extension: mime_type.extension_for(&request.original_filename),
            data: request.data,
            mime_type,
            name,
            platform_id: request.platform_id.filter(|p| !p.is_empty()),
            is_thumbnail: request.is_thumbnail,
        })
    }

    /// `Admitted -> Persisted -> Indexed`, run inside the admission section.
    async fn persist_and_index(&self, upload: ValidatedUpload) -> Result<MediaRecord, AppError> {
        let size_bytes = upload.data.len() as u64;

        let location = self
            .storage
            .put(upload.data, upload.mime_type.as_str(), upload.extension)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    stage = %UploadStage::Admitted,
                    size_bytes = size_bytes,
                    "Failed to persist upload"
                );
                AppError::from(e)
            })?;

        let record = MediaRecord {
            id: (self.new_id)(),
            name: upload.name,
            mime_type: upload.mime_type,
            storage_location: location.clone(),
            size_bytes,
            platform_id: upload.platform_id,
            is_thumbnail: upload.is_thumbnail,
            uploaded_at: Utc::now(),
        };

        match self.index.insert(record).await {
            Ok(record) => Ok(record),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    stage = %UploadStage::Persisted,
                    key = %location.key,
                    "Failed to index upload, rolling back stored object"
                );
                self.rollback(&location).await;
                Err(e)
            }
        }
    }

    async fn rollback(&self, location: &StorageLocation) {
        if let Err(e) = self.storage.remove(location).await {
            // Left for the next rebuild to pick up.
            tracing::warn!(
                error = %e,
                key = %location.key,
                "Rollback failed, stored object is orphaned"
            );
        }
    }
}
