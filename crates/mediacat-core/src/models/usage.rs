use serde::{Deserialize, Serialize};

/// Aggregate storage usage against the configured ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageUsage {
    pub used_bytes: u64,
    pub capacity_bytes: u64,
    pub available_bytes: u64,
    pub object_count: u64,
}

impl StorageUsage {
    pub fn new(used_bytes: u64, capacity_bytes: u64, object_count: u64) -> Self {
        Self {
            used_bytes,
            capacity_bytes,
            available_bytes: capacity_bytes.saturating_sub(used_bytes),
            object_count,
        }
    }

    /// Percentage of the ceiling in use, capped at 100.
    pub fn percent_used(&self) -> f64 {
        if self.capacity_bytes == 0 {
            return 100.0;
        }
        ((self.used_bytes as f64 / self.capacity_bytes as f64) * 100.0).min(100.0)
    }
}
