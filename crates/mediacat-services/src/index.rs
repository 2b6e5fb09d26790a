//! Metadata index
//!
//! In-memory, insertion-ordered collection of media records. Every mutation runs under
//! one write lock, so readers never see a platform group halfway through a thumbnail
//! change. The index is a cache of the store: `replace_all` swaps in a rebuilt snapshot.

use mediacat_core::{AppError, MediaPatch, MediaRecord};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct IndexState {
    records: Vec<MediaRecord>,
    loaded: bool,
}

impl IndexState {
    fn position(&self, id: Uuid) -> Result<usize, AppError> {
        self.records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Media {} not found", id)))
    }

    /// Clear the thumbnail flag on every other member of the record's platform group.
    ///
    /// No-op unless the record at `index` is a thumbnail with a platform.
    fn enforce_thumbnail_exclusivity(&mut self, index: usize) -> usize {
        let record = &self.records[index];
        let Some(platform_id) = record.platform_id.clone().filter(|_| record.is_thumbnail) else {
            return 0;
        };

        let mut cleared = 0;
        for (i, other) in self.records.iter_mut().enumerate() {
            if i != index && other.is_thumbnail && other.in_platform(&platform_id) {
                other.is_thumbnail = false;
                cleared += 1;
            }
        }
        cleared
    }
}

#[derive(Debug, Default)]
pub struct MetadataIndex {
    state: RwLock<IndexState>,
}

impl MetadataIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a snapshot has been installed with `replace_all`.
    pub async fn is_loaded(&self) -> bool {
        self.state.read().await.loaded
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.records.is_empty()
    }

    pub async fn list(&self) -> Vec<MediaRecord> {
        self.state.read().await.records.clone()
    }

    pub async fn find(&self, id: Uuid) -> Result<MediaRecord, AppError> {
        let state = self.state.read().await;
        let index = state.position(id)?;
        Ok(state.records[index].clone())
    }

    pub async fn find_by_key(&self, key: &str) -> Option<MediaRecord> {
        self.state
            .read()
            .await
            .records
            .iter()
            .find(|r| r.storage_location.key == key)
            .cloned()
    }

    pub async fn list_platform(&self, platform_id: &str) -> Vec<MediaRecord> {
        self.state
            .read()
            .await
            .records
            .iter()
            .filter(|r| r.in_platform(platform_id))
            .cloned()
            .collect()
    }

    pub async fn platform_thumbnail(&self, platform_id: &str) -> Option<MediaRecord> {
        self.state
            .read()
            .await
            .records
            .iter()
            .find(|r| r.is_thumbnail && r.in_platform(platform_id))
            .cloned()
    }

    /// Append a record.
    ///
    /// A thumbnail inserted into a platform group takes the flag from its siblings.
    pub async fn insert(&self, record: MediaRecord) -> Result<MediaRecord, AppError> {
        let mut state = self.state.write().await;

        if state.records.iter().any(|r| r.id == record.id) {
            tracing::error!(media_id = %record.id, "Duplicate media id on insert");
            return Err(AppError::DuplicateId(record.id));
        }

        state.records.push(record);
        let index = state.records.len() - 1;
        let cleared = state.enforce_thumbnail_exclusivity(index);

        let record = state.records[index].clone();
        tracing::debug!(
            media_id = %record.id,
            platform_id = ?record.platform_id,
            is_thumbnail = record.is_thumbnail,
            thumbnails_cleared = cleared,
            "Indexed media record"
        );

        Ok(record)
    }

    /// Apply a partial update.
    ///
    /// - a non-empty `name` replaces the name;
    /// - `platform_id`, when present (including explicit null), replaces the platform;
    /// - `is_thumbnail: true` sets the flag and, when the resulting platform is
    ///   non-null, clears it on every sibling in the same critical section;
    ///   `is_thumbnail: false` clears the flag.
    ///
    /// A thumbnail moved into another platform keeps its flag and takes it from that
    /// group's previous thumbnail.
    pub async fn update(&self, id: Uuid, patch: &MediaPatch) -> Result<MediaRecord, AppError> {
        let mut state = self.state.write().await;
        let index = state.position(id)?;

        {
            let record = &mut state.records[index];

            if let Some(name) = patch.name.as_deref().filter(|name| !name.is_empty()) {
                record.name = name.to_string();
            }

            if let Some(platform_id) = &patch.platform_id {
                record.platform_id = platform_id.clone();
            }

            if let Some(is_thumbnail) = patch.is_thumbnail {
                record.is_thumbnail = is_thumbnail;
            }
        }

        let cleared = state.enforce_thumbnail_exclusivity(index);

        let record = state.records[index].clone();
        tracing::debug!(
            media_id = %record.id,
            platform_id = ?record.platform_id,
            is_thumbnail = record.is_thumbnail,
            thumbnails_cleared = cleared,
            "Updated media record"
        );

        Ok(record)
    }

    pub async fn remove(&self, id: Uuid) -> Result<MediaRecord, AppError> {
        let mut state = self.state.write().await;
        let index = state.position(id)?;
        let record = state.records.remove(index);

        tracing::debug!(media_id = %record.id, "Removed media record");

        Ok(record)
    }

    /// Install a rebuilt snapshot, discarding every current record.
    pub async fn replace_all(&self, records: Vec<MediaRecord>) {
        let mut state = self.state.write().await;
        state.records = records;
        state.loaded = true;
    }
}
