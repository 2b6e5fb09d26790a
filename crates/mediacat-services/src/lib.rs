//! Mediacat Services Layer
//!
//! This crate is the catalog core: quota admission, the in-memory metadata index, the
//! upload pipeline, and the `MediaCatalog` facade that ties them to a storage backend.
//! Transport layers depend on `MediaCatalog` only.

pub mod catalog;
pub mod index;
pub mod quota;
pub mod upload;

#[cfg(all(test, feature = "storage-memory"))]
mod test_support;

pub use catalog::MediaCatalog;
pub use index::MetadataIndex;
pub use quota::{Admission, AdmissionRejection, QuotaGuard, QuotaLimits};
pub use upload::{sanitize_filename, CreateMediaRequest, UploadOrchestrator, UploadStage};

pub use mediacat_core::{AppError, MediaPatch, MediaRecord, StorageUsage};
#[cfg(feature = "storage-local")]
pub use mediacat_storage::LocalStorage;
#[cfg(feature = "storage-memory")]
pub use mediacat_storage::MemoryStorage;
#[cfg(feature = "storage-s3")]
pub use mediacat_storage::S3Storage;
pub use mediacat_storage::{create_storage, Storage, StorageBackend, StorageError, StorageResult};
