//! Application-wide constants.

/// Logical prefix every media object is stored under, in every backend.
pub const MEDIA_PREFIX: &str = "media";

const MIB: u64 = 1024 * 1024;

/// Aggregate storage ceiling of the reference deployment (500 MiB).
pub const DEFAULT_STORAGE_CAPACITY_BYTES: u64 = 500 * MIB;

/// Per-upload ceiling of the reference deployment (100 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * MIB;

/// Display name used when neither a name nor a usable original filename is supplied.
pub const DEFAULT_MEDIA_NAME: &str = "file";

/// Longest display name kept after sanitising an original filename.
pub const MAX_NAME_LENGTH: usize = 255;
