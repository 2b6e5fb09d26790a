//! Data models for the application
//!
//! Media records, the MIME allow-list, storage locations and usage reports.

mod media;
mod mime;
mod storage;
mod usage;

// Re-export all models for convenient imports
pub use media::{MediaPatch, MediaRecord};
pub use mime::{MediaMimeType, MediaType};
pub use storage::{StorageLocation, StoredObject};
pub use usage::StorageUsage;
