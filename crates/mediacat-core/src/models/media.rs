use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::mime::MediaMimeType;
use super::storage::{StorageLocation, StoredObject};

/// Catalog entry for one stored blob.
///
/// `id`, `mime_type`, `storage_location`, `size_bytes` and `uploaded_at` are fixed at
/// creation; only `name`, `platform_id` and `is_thumbnail` change through updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: Uuid,
    pub name: String,
    pub mime_type: MediaMimeType,
    pub storage_location: StorageLocation,
    pub size_bytes: u64,
    pub platform_id: Option<String>,
    pub is_thumbnail: bool,
    pub uploaded_at: DateTime<Utc>,
}

impl MediaRecord {
    /// Rebuild a record from a store listing entry, with default metadata and a fresh id.
    ///
    /// Returns `None` for objects whose type is outside the allow-list.
    pub fn from_stored_object(object: &StoredObject) -> Option<Self> {
        let mime_type = MediaMimeType::parse(&object.content_type)
            .ok()
            .or_else(|| {
                object
                    .location
                    .extension()
                    .and_then(MediaMimeType::from_extension)
            })?;

        Some(Self {
            id: Uuid::new_v4(),
            name: object.location.file_name().to_string(),
            mime_type,
            storage_location: object.location.clone(),
            size_bytes: object.size_bytes,
            platform_id: None,
            is_thumbnail: false,
            uploaded_at: object.last_modified.unwrap_or_else(Utc::now),
        })
    }

    /// Whether this record belongs to the given platform group.
    pub fn in_platform(&self, platform_id: &str) -> bool {
        self.platform_id.as_deref() == Some(platform_id)
    }
}

/// Partial update of a record's mutable metadata.
///
/// `platform_id` distinguishes "absent" (`None`) from "explicitly null" (`Some(None)`),
/// so JSON `{"platform_id": null}` clears the platform while `{}` leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub platform_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_thumbnail: Option<bool>,
}

impl MediaPatch {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn platform(mut self, platform_id: Option<&str>) -> Self {
        self.platform_id = Some(platform_id.map(String::from));
        self
    }

    pub fn thumbnail(mut self, is_thumbnail: bool) -> Self {
        self.is_thumbnail = Some(is_thumbnail);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.platform_id.is_none() && self.is_thumbnail.is_none()
    }
}

fn deserialize_explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_types::StorageBackend;

    fn stored(key: &str, content_type: &str) -> StoredObject {
        StoredObject {
            location: StorageLocation {
                backend: StorageBackend::Memory,
                bucket: None,
                key: key.to_string(),
                url: format!("memory://{}", key),
            },
            size_bytes: 42,
            content_type: content_type.to_string(),
            last_modified: None,
        }
    }

    #[test]
    fn patch_distinguishes_absent_and_null_platform() {
        let absent: MediaPatch = serde_json::from_str(r#"{"name":"cover"}"#).unwrap();
        assert_eq!(absent.platform_id, None);

        let cleared: MediaPatch = serde_json::from_str(r#"{"platform_id":null}"#).unwrap();
        assert_eq!(cleared.platform_id, Some(None));

        let set: MediaPatch =
            serde_json::from_str(r#"{"platform_id":"P1","is_thumbnail":true}"#).unwrap();
        assert_eq!(set.platform_id, Some(Some("P1".to_string())));
        assert_eq!(set.is_thumbnail, Some(true));
    }

    #[test]
    fn rebuilt_record_has_default_metadata() {
        let record = MediaRecord::from_stored_object(&stored("media/a1.png", "image/png")).unwrap();
        assert_eq!(record.name, "a1.png");
        assert_eq!(record.mime_type, MediaMimeType::ImagePng);
        assert_eq!(record.size_bytes, 42);
        assert_eq!(record.platform_id, None);
        assert!(!record.is_thumbnail);
    }

    #[test]
    fn rebuilt_record_falls_back_to_key_extension() {
        let record =
            MediaRecord::from_stored_object(&stored("media/a1.webm", "application/octet-stream"))
                .unwrap();
        assert_eq!(record.mime_type, MediaMimeType::VideoWebm);

        assert!(MediaRecord::from_stored_object(&stored("media/notes.txt", "text/plain")).is_none());
    }

    #[test]
    fn rebuild_generates_fresh_ids() {
        let object = stored("media/a1.png", "image/png");
        let first = MediaRecord::from_stored_object(&object).unwrap();
        let second = MediaRecord::from_stored_object(&object).unwrap();
        assert_ne!(first.id, second.id);
    }
}
