//! Test helpers: build catalogs over in-memory and filesystem backends.
//!
//! Sizes are scaled down from the reference deployment (KiB instead of MiB) so the
//! scenarios keep their shape without allocating hundreds of megabytes.

#![allow(dead_code)]

pub mod fixtures;

use std::path::Path;
use std::sync::Arc;

use mediacat_services::{LocalStorage, MediaCatalog, MemoryStorage, QuotaLimits};

pub const KIB: u64 = 1024;

/// Per-object 100 KiB, aggregate 500 KiB.
pub fn reference_limits() -> QuotaLimits {
    QuotaLimits::new(100 * KIB, 500 * KIB)
}

/// Catalog over a fresh `MemoryStorage`; the returned handle shares the same objects.
pub fn memory_catalog(limits: QuotaLimits) -> (MediaCatalog, MemoryStorage) {
    memory_catalog_with_cache(limits, false)
}

pub fn memory_catalog_with_cache(limits: QuotaLimits, cache_usage: bool) -> (MediaCatalog, MemoryStorage) {
    let storage = MemoryStorage::new();
    let catalog = MediaCatalog::new(Arc::new(storage.clone()), limits, cache_usage);
    (catalog, storage)
}

/// Catalog over a `LocalStorage` rooted at `dir`.
pub async fn local_catalog(dir: &Path, limits: QuotaLimits) -> MediaCatalog {
    let storage = LocalStorage::new(dir, "http://localhost:3000/media".to_string())
        .await
        .expect("create local storage");
    MediaCatalog::new(Arc::new(storage), limits, false)
}

/// Number of records per platform flagged as thumbnail.
pub fn thumbnail_count(records: &[mediacat_services::MediaRecord], platform_id: &str) -> usize {
    records
        .iter()
        .filter(|r| r.is_thumbnail && r.in_platform(platform_id))
        .count()
}
