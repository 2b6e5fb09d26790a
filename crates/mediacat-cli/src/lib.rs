//! Helpers shared by the `mediacat` binary.

use std::path::Path;

use mediacat_core::{MediaMimeType, MediaRecord, StorageUsage};
use uuid::Uuid;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// A record reference given on the command line.
///
/// Ids change on every rebuild, so a storage key is accepted as well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Id(Uuid),
    Key(String),
}

impl Target {
    pub fn parse(raw: &str) -> Self {
        match Uuid::parse_str(raw.trim()) {
            Ok(id) => Target::Id(id),
            Err(_) => Target::Key(raw.trim().trim_start_matches('/').to_string()),
        }
    }
}

/// Content type guessed from a file's extension.
///
/// Unknown extensions map to `application/octet-stream`, which the catalog rejects.
pub fn content_type_for_path(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(MediaMimeType::from_extension)
        .map(|mime| mime.as_str().to_string())
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string())
}

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}

pub fn print_media_table(records: &[MediaRecord]) {
    println!(
        "{:<36}  {:<24}  {:<10}  {:>10}  {:<12}  {:<5}  {}",
        "ID", "NAME", "TYPE", "SIZE", "PLATFORM", "THUMB", "KEY"
    );
    for record in records {
        println!(
            "{:<36}  {:<24}  {:<10}  {:>10}  {:<12}  {:<5}  {}",
            record.id,
            truncate_string(&record.name, 24),
            truncate_string(record.mime_type.as_str(), 10),
            record.size_bytes,
            truncate_string(record.platform_id.as_deref().unwrap_or("-"), 12),
            if record.is_thumbnail { "yes" } else { "no" },
            record.storage_location.key
        );
    }
    println!("\n{} item(s)", records.len());
}

pub fn print_usage(usage: &StorageUsage) {
    println!("\n=== Storage Usage ===\n");
    println!("Objects:   {}", usage.object_count);
    println!(
        "Used:      {:>10.2} MB ({} bytes)",
        bytes_to_mb(usage.used_bytes),
        usage.used_bytes
    );
    println!(
        "Available: {:>10.2} MB ({} bytes)",
        bytes_to_mb(usage.available_bytes),
        usage.available_bytes
    );
    println!(
        "Capacity:  {:>10.2} MB ({} bytes)",
        bytes_to_mb(usage.capacity_bytes),
        usage.capacity_bytes
    );
    println!("In use:    {:.1}%", usage.percent_used());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn target_accepts_ids_and_keys() {
        let id = Uuid::new_v4();
        assert_eq!(Target::parse(&id.to_string()), Target::Id(id));
        assert_eq!(
            Target::parse("media/abc.png"),
            Target::Key("media/abc.png".to_string())
        );
        assert_eq!(
            Target::parse(" /media/abc.png "),
            Target::Key("media/abc.png".to_string())
        );
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(content_type_for_path(&PathBuf::from("a/b/c.PNG")), "image/png");
        assert_eq!(content_type_for_path(&PathBuf::from("song.mp3")), "audio/mpeg");
        assert_eq!(
            content_type_for_path(&PathBuf::from("notes.txt")),
            FALLBACK_CONTENT_TYPE
        );
        assert_eq!(
            content_type_for_path(&PathBuf::from("no_extension")),
            FALLBACK_CONTENT_TYPE
        );
    }

    #[test]
    fn truncate_string_short() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("", 5), "");
        assert_eq!(truncate_string("hello", 5), "hello");
    }

    #[test]
    fn truncate_string_long() {
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("abc", 2), "...");
        assert_eq!(truncate_string("héllo wörld", 8), "héllo...");
    }

    #[test]
    fn bytes_to_mb_uses_binary_units() {
        assert_eq!(bytes_to_mb(500 * 1024 * 1024), 500.0);
        assert_eq!(bytes_to_mb(0), 0.0);
    }

    #[test]
    fn records_render_without_panicking() {
        use mediacat_core::{StorageBackend, StorageLocation};

        let record = MediaRecord {
            id: Uuid::new_v4(),
            name: "a very long display name that needs truncating.png".to_string(),
            mime_type: MediaMimeType::ImagePng,
            storage_location: StorageLocation {
                backend: StorageBackend::Local,
                bucket: None,
                key: "media/a.png".to_string(),
                url: "http://localhost:3000/media/media/a.png".to_string(),
            },
            size_bytes: 1,
            platform_id: Some("P1".to_string()),
            is_thumbnail: true,
            uploaded_at: chrono::Utc::now(),
        };
        print_media_table(&[record]);
        print_usage(&StorageUsage::new(1, 10, 1));
    }
}
