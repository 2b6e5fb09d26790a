use crate::keys::{content_type_for_key, generate_storage_key, validate_key};
use crate::traits::{Storage, StorageError, StorageResult};
use crate::{StorageBackend, StorageLocation, StoredObject};
use async_trait::async_trait;
use bytes::Bytes;
use mediacat_core::MediaMimeType;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
///
/// Objects are plain files under `base_path`; `base_url` is the static mount the files
/// are served from.
///
/// No metadata is written next to a file: its content type is derived from the key's
/// extension on `list`. `put` therefore only accepts a content type that the given
/// extension maps back to.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

/// Depth-first walk state for `list`.
struct ListState {
    pending_dirs: Vec<PathBuf>,
    current: Option<fs::ReadDir>,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/mediacat")
    /// * `base_url` - Base URL for serving files (e.g., "http://localhost:3000/media")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects keys containing traversal sequences, and keys whose existing target
    /// resolves (through symlinks) outside the base directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;

        let path = self.base_path.join(storage_key);

        if let Ok(canonical) = path.canonicalize() {
            let base_canonical = self.base_path.canonicalize().map_err(|e| {
                StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
            })?;
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Storage key for a path below the base directory, with `/` separators.
    fn path_to_key(&self, path: &Path) -> StorageResult<String> {
        let relative = path.strip_prefix(&self.base_path).map_err(|_| {
            StorageError::InvalidKey(format!(
                "Path {} is outside storage directory",
                path.display()
            ))
        })?;

        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Ok(parts.join("/"))
    }

    /// Generate public URL for file
    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    fn location(&self, key: String) -> StorageLocation {
        StorageLocation {
            backend: StorageBackend::Local,
            bucket: None,
            url: self.generate_url(&key),
            key,
        }
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Advance the directory walk to the next regular file.
    async fn next_listed(&self, state: &mut ListState) -> StorageResult<Option<StoredObject>> {
        loop {
            if let Some(dir) = state.current.as_mut() {
                match dir.next_entry().await? {
                    Some(entry) => {
                        let file_type = entry.file_type().await?;
                        let path = entry.path();
                        if file_type.is_dir() {
                            state.pending_dirs.push(path);
                            continue;
                        }
                        if !file_type.is_file() {
                            continue;
                        }

                        let metadata = match entry.metadata().await {
                            Ok(metadata) => metadata,
                            // Removed between read_dir and stat.
                            Err(e) if e.kind() == ErrorKind::NotFound => continue,
                            Err(e) => return Err(e.into()),
                        };
                        let key = self.path_to_key(&path)?;

                        return Ok(Some(StoredObject {
                            content_type: content_type_for_key(&key),
                            size_bytes: metadata.len(),
                            last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
                            location: self.location(key),
                        }));
                    }
                    None => state.current = None,
                }
                continue;
            }

            let Some(dir) = state.pending_dirs.pop() else {
                return Ok(None);
            };
            match fs::read_dir(&dir).await {
                Ok(read_dir) => state.current = Some(read_dir),
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(
        &self,
        data: Bytes,
        content_type: &str,
        extension: &str,
    ) -> StorageResult<StorageLocation> {
        let key = generate_storage_key(extension);

        let recoverable = MediaMimeType::parse(content_type)
            .map(|mime| mime.as_str() == content_type_for_key(&key))
            .unwrap_or(false);
        if !recoverable {
            return Err(StorageError::UploadFailed(format!(
                "Content type {} cannot be stored under extension .{}",
                content_type, extension
            )));
        }

        let path = self.key_to_path(&key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to create file {}: {}",
                    path.display(),
                    e
                ))
            })?;

        let written = async {
            file.write_all(&data).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            // Do not leave a truncated blob behind for the next listing to pick up.
            let _ = fs::remove_file(&path).await;
            tracing::error!(
                error = %e,
                path = %path.display(),
                key = %key,
                size_bytes = size,
                "Local storage upload failed"
            );
            return Err(StorageError::UploadFailed(format!(
                "Failed to write file {}: {}",
                path.display(),
                e
            )));
        }

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(self.location(key))
    }

    fn list<'a>(&'a self, prefix: &'a str) -> BoxStream<'a, StorageResult<StoredObject>> {
        let root = match self.key_to_path(prefix.trim_end_matches('/')) {
            Ok(root) => root,
            Err(e) => return stream::once(async move { Err(e) }).boxed(),
        };

        let state = ListState {
            pending_dirs: vec![root],
            current: None,
        };

        stream::try_unfold(state, move |mut state| async move {
            let next = self.next_listed(&mut state).await;
            next.map(|object| object.map(|object| (object, state)))
        })
        .boxed()
    }

    async fn size_of(&self, location: &StorageLocation) -> StorageResult<u64> {
        let path = self.key_to_path(&location.key)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(meta.len()),
            Ok(_) => Err(StorageError::NotFound(location.key.clone())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(location.key.clone()))
            }
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn remove(&self, location: &StorageLocation) -> StorageResult<()> {
        let path = self.key_to_path(&location.key)?;
        let start = std::time::Instant::now();

        fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::NotFound(location.key.clone())
            } else {
                StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                ))
            }
        })?;

        tracing::info!(
            path = %path.display(),
            key = %location.key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        self.generate_url(key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
