//! Quota guard
//!
//! Aggregate usage is recomputed from the store listing on every admission, so blobs
//! added or removed behind the catalog's back are always accounted for. With the usage
//! cache enabled the last measurement is reused until the next put or remove made
//! through the guard; out-of-band changes stay invisible until then.
//!
//! Admission and the persist step that follows it run inside one critical section
//! (`with_admission`), so concurrent uploads cannot jointly overshoot the ceiling.

use std::future::Future;
use std::sync::Arc;

use futures::TryStreamExt;
use mediacat_core::constants::MEDIA_PREFIX;
use mediacat_core::{AppError, Config, StorageUsage};
use mediacat_storage::Storage;
use tokio::sync::{Mutex, MutexGuard, RwLock};

/// Per-object and aggregate byte ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaLimits {
    pub max_object_bytes: u64,
    pub capacity_bytes: u64,
}

impl QuotaLimits {
    pub fn new(max_object_bytes: u64, capacity_bytes: u64) -> Self {
        Self {
            max_object_bytes,
            capacity_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_upload_bytes(), config.storage_capacity_bytes())
    }
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Why an upload was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionRejection {
    ObjectTooLarge { size: u64, limit: u64 },
    CapacityExceeded { used: u64, requested: u64, limit: u64 },
}

impl From<AdmissionRejection> for AppError {
    fn from(rejection: AdmissionRejection) -> Self {
        match rejection {
            AdmissionRejection::ObjectTooLarge { size, limit } => {
                AppError::ObjectTooLarge { size, limit }
            }
            AdmissionRejection::CapacityExceeded {
                used,
                requested,
                limit,
            } => AppError::CapacityExceeded {
                used,
                requested,
                limit,
            },
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admit { used_bytes: u64 },
    Reject(AdmissionRejection),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admit { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct Tally {
    used_bytes: u64,
    object_count: u64,
}

/// Cached tally plus a generation bumped on every invalidation.
///
/// A measurement only fills the cache if no invalidation happened while it ran.
#[derive(Debug, Default)]
struct UsageCache {
    tally: Option<Tally>,
    generation: u64,
}

pub struct QuotaGuard {
    storage: Arc<dyn Storage>,
    limits: QuotaLimits,
    admission: Mutex<()>,
    usage_cache: Option<RwLock<UsageCache>>,
}

impl QuotaGuard {
    pub fn new(storage: Arc<dyn Storage>, limits: QuotaLimits, cache_usage: bool) -> Self {
        Self {
            storage,
            limits,
            admission: Mutex::new(()),
            usage_cache: cache_usage.then(|| RwLock::new(UsageCache::default())),
        }
    }

    pub fn limits(&self) -> QuotaLimits {
        self.limits
    }

    /// Reject a candidate larger than the per-object ceiling.
    ///
    /// Cheap enough to call with a declared size before the body is buffered.
    pub fn check_object_size(&self, size_bytes: u64) -> Result<(), AppError> {
        if size_bytes > self.limits.max_object_bytes {
            return Err(AdmissionRejection::ObjectTooLarge {
                size: size_bytes,
                limit: self.limits.max_object_bytes,
            }
            .into());
        }
        Ok(())
    }

    /// Decide whether a candidate of `size_bytes` fits.
    ///
    /// Not atomic with any later write; use `with_admission` to persist under the
    /// same critical section.
    pub async fn admit(&self, size_bytes: u64) -> Result<Admission, AppError> {
        if size_bytes > self.limits.max_object_bytes {
            return Ok(Admission::Reject(AdmissionRejection::ObjectTooLarge {
                size: size_bytes,
                limit: self.limits.max_object_bytes,
            }));
        }

        let used = self.used_bytes().await?;
        let limit = self.limits.capacity_bytes;

        if used.saturating_add(size_bytes) > limit {
            return Ok(Admission::Reject(AdmissionRejection::CapacityExceeded {
                used,
                requested: size_bytes,
                limit,
            }));
        }

        Ok(Admission::Admit { used_bytes: used })
    }

    /// Admit `size_bytes` and run `persist` while holding the admission lock.
    ///
    /// A rejection is returned as the matching `AppError` and `persist` never runs.
    /// The usage cache is invalidated once `persist` has run, whatever its outcome.
    pub async fn with_admission<F, Fut, T>(&self, size_bytes: u64, persist: F) -> Result<T, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let _section = self.admission.lock().await;

        match self.admit(size_bytes).await? {
            Admission::Admit { used_bytes } => {
                tracing::debug!(
                    size_bytes = size_bytes,
                    used_bytes = used_bytes,
                    capacity_bytes = self.limits.capacity_bytes,
                    "Upload admitted"
                );
            }
            Admission::Reject(rejection) => {
                tracing::warn!(
                    size_bytes = size_bytes,
                    rejection = ?rejection,
                    "Upload rejected by quota"
                );
                return Err(rejection.into());
            }
        }

        let result = persist().await;
        self.invalidate().await;
        result
    }

    /// Block new admissions until the returned guard is dropped.
    pub async fn hold_admissions(&self) -> MutexGuard<'_, ()> {
        self.admission.lock().await
    }

    /// Aggregate bytes currently stored under the media prefix.
    pub async fn used_bytes(&self) -> Result<u64, AppError> {
        Ok(self.tally().await?.used_bytes)
    }

    pub async fn usage(&self) -> Result<StorageUsage, AppError> {
        let tally = self.tally().await?;
        Ok(StorageUsage::new(
            tally.used_bytes,
            self.limits.capacity_bytes,
            tally.object_count,
        ))
    }

    /// Drop the cached measurement, if caching is enabled.
    pub async fn invalidate(&self) {
        if let Some(cache) = &self.usage_cache {
            let mut cache = cache.write().await;
            cache.tally = None;
            cache.generation = cache.generation.wrapping_add(1);
        }
    }

    async fn tally(&self) -> Result<Tally, AppError> {
        let Some(cache) = &self.usage_cache else {
            return self.measure().await;
        };

        let generation = {
            let cache = cache.read().await;
            if let Some(tally) = cache.tally {
                return Ok(tally);
            }
            cache.generation
        };

        let tally = self.measure().await?;

        let mut cache = cache.write().await;
        if cache.generation == generation {
            cache.tally = Some(tally);
        } else {
            tracing::debug!("Usage changed during measurement, not caching");
        }
        Ok(tally)
    }

    async fn measure(&self) -> Result<Tally, AppError> {
        let start = std::time::Instant::now();

        let tally = self
            .storage
            .list(MEDIA_PREFIX)
            .try_fold(
                Tally {
                    used_bytes: 0,
                    object_count: 0,
                },
                |mut tally, object| async move {
                    tally.used_bytes = tally.used_bytes.saturating_add(object.size_bytes);
                    tally.object_count += 1;
                    Ok(tally)
                },
            )
            .await?;

        tracing::debug!(
            used_bytes = tally.used_bytes,
            object_count = tally.object_count,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Measured storage usage"
        );

        Ok(tally)
    }
}
