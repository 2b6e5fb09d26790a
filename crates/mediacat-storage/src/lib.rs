//! Mediacat Storage Library
//!
//! This crate provides the blob store abstraction and its implementations: local
//! filesystem, S3 (through `object_store`) and an in-process memory store.
//!
//! # Storage key format
//!
//! Every backend uses the same layout: `media/{uuid}.{extension}`, one blob per media
//! item. Keys are generated from fresh v4 UUIDs, so a put never targets an existing key.
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-memory")]
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use mediacat_core::{StorageBackend, StorageLocation, StoredObject};
#[cfg(feature = "storage-memory")]
pub use memory::MemoryStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
