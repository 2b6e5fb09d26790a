//! Shared key generation for storage backends.
//!
//! Key format: `media/{uuid}.{extension}`.

use mediacat_core::constants::MEDIA_PREFIX;
use mediacat_core::MediaMimeType;
use uuid::Uuid;

use crate::{StorageError, StorageResult};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Generate a fresh storage key under the media prefix.
///
/// The extension is lowercased and stripped of anything but ASCII alphanumerics.
pub fn generate_storage_key(extension: &str) -> String {
    let extension: String = extension
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if extension.is_empty() {
        format!("{}/{}", MEDIA_PREFIX, Uuid::new_v4())
    } else {
        format!("{}/{}.{}", MEDIA_PREFIX, Uuid::new_v4(), extension)
    }
}

/// Reject keys that could escape the storage root.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.contains("..") || key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid characters: {}",
            key
        )));
    }
    Ok(())
}

/// Content type recorded for a key, derived from its extension.
pub fn content_type_for_key(key: &str) -> String {
    key.rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .and_then(|(_, ext)| MediaMimeType::from_extension(ext))
        .map(|mime| mime.as_str().to_string())
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_unique_and_prefixed() {
        let first = generate_storage_key("png");
        let second = generate_storage_key("png");
        assert_ne!(first, second);
        assert!(first.starts_with("media/"));
        assert!(first.ends_with(".png"));
    }

    #[test]
    fn extension_is_sanitised() {
        let key = generate_storage_key("../P N G");
        assert!(key.ends_with(".png"));
        assert!(!key.contains(".."));

        let key = generate_storage_key("");
        assert!(!key.contains('.'));
    }

    #[test]
    fn validate_key_rejects_traversal() {
        assert!(validate_key("media/a.png").is_ok());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("").is_err());
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(content_type_for_key("media/a.mp3"), "audio/mpeg");
        assert_eq!(content_type_for_key("media/a.JPG"), "image/jpeg");
        assert_eq!(content_type_for_key("media/a"), FALLBACK_CONTENT_TYPE);
        assert_eq!(content_type_for_key("media/a.txt"), FALLBACK_CONTENT_TYPE);
    }
}
