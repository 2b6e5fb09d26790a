//! Storage location model: backend-agnostic reference to where a blob is stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage_types::StorageBackend;

/// A reference to a blob's physical location, resolvable by the backend that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLocation {
    pub backend: StorageBackend,
    pub bucket: Option<String>,
    pub key: String,
    pub url: String,
}

impl StorageLocation {
    /// File name component of the key (`media/abc.png` -> `abc.png`).
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    pub fn extension(&self) -> Option<&str> {
        self.file_name().rsplit_once('.').map(|(_, ext)| ext)
    }
}

/// One entry of a store listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub location: StorageLocation,
    pub size_bytes: u64,
    pub content_type: String,
    pub last_modified: Option<DateTime<Utc>>,
}
