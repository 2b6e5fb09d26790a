//! Configuration module
//!
//! Storage backend selection, quota ceilings and logging settings, read from the
//! environment (and an optional `.env` file).

use std::env;
use std::path::PathBuf;

use crate::constants::{DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_STORAGE_CAPACITY_BYTES};
use crate::storage_types::StorageBackend;

const MIB: u64 = 1024 * 1024;
const DEFAULT_LOCAL_STORAGE_PATH: &str = "./data/media";
const DEFAULT_LOCAL_STORAGE_BASE_URL: &str = "http://localhost:3000/media";

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    environment: String,
    storage_backend: StorageBackend,
    local_storage_path: Option<PathBuf>,
    local_storage_base_url: String,
    s3_bucket: Option<String>,
    s3_region: Option<String>,
    s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    aws_region: Option<String>,
    max_upload_bytes: u64,
    storage_capacity_bytes: u64,
    quota_usage_cache: bool,
    log_format: String,
}

impl Default for Config {
    /// Reference deployment: local storage, 100 MiB per upload, 500 MiB in total.
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            storage_backend: StorageBackend::Local,
            local_storage_path: Some(PathBuf::from(DEFAULT_LOCAL_STORAGE_PATH)),
            local_storage_base_url: DEFAULT_LOCAL_STORAGE_BASE_URL.to_string(),
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            aws_region: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            storage_capacity_bytes: DEFAULT_STORAGE_CAPACITY_BYTES,
            quota_usage_cache: false,
            log_format: "pretty".to_string(),
        }
    }
}

/// Parse a whole number of MiB from `var` into bytes.
fn megabytes_to_bytes(var: &str, raw: &str) -> Result<u64, anyhow::Error> {
    let mb = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| anyhow::anyhow!("{} must be a valid number", var))?;
    mb.checked_mul(MIB)
        .ok_or_else(|| anyhow::anyhow!("{} is too large: {} MB", var, mb))
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or(defaults.environment);

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.storage_backend,
        };

        let max_upload_bytes = env::var("MAX_UPLOAD_SIZE_MB")
            .ok()
            .map(|s| megabytes_to_bytes("MAX_UPLOAD_SIZE_MB", &s))
            .transpose()?;

        let capacity_bytes = env::var("STORAGE_CAPACITY_MB")
            .ok()
            .map(|s| megabytes_to_bytes("STORAGE_CAPACITY_MB", &s))
            .transpose()?;

        let config = Config {
            environment,
            storage_backend,
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .ok()
                .map(PathBuf::from)
                .or(defaults.local_storage_path),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL")
                .unwrap_or(defaults.local_storage_base_url),
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            aws_region: env::var("AWS_REGION").ok(),
            max_upload_bytes: max_upload_bytes.unwrap_or(defaults.max_upload_bytes),
            storage_capacity_bytes: capacity_bytes.unwrap_or(defaults.storage_capacity_bytes),
            quota_usage_cache: env::var("QUOTA_USAGE_CACHE")
                .unwrap_or_else(|_| "false".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(false),
            log_format: env::var("LOG_FORMAT")
                .unwrap_or(defaults.log_format)
                .to_lowercase(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than zero"));
        }
        if self.storage_capacity_bytes < self.max_upload_bytes {
            return Err(anyhow::anyhow!(
                "STORAGE_CAPACITY_MB ({} bytes) must be at least MAX_UPLOAD_SIZE_MB ({} bytes)",
                self.storage_capacity_bytes,
                self.max_upload_bytes
            ));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when STORAGE_BACKEND=s3"
                    ));
                }
                if self.s3_region().is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when STORAGE_BACKEND=s3"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when STORAGE_BACKEND=local"
                    ));
                }
            }
            StorageBackend::Memory => {
                if self.is_production() {
                    return Err(anyhow::anyhow!(
                        "STORAGE_BACKEND=memory is not allowed in production"
                    ));
                }
            }
        }

        if !["pretty", "json"].contains(&self.log_format.as_str()) {
            return Err(anyhow::anyhow!(
                "LOG_FORMAT must be 'pretty' or 'json', got '{}'",
                self.log_format
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.storage_backend
    }

    pub fn local_storage_path(&self) -> Option<&PathBuf> {
        self.local_storage_path.as_ref()
    }

    pub fn local_storage_base_url(&self) -> &str {
        &self.local_storage_base_url
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.s3_bucket.as_deref()
    }

    /// S3 region, falling back to `AWS_REGION`.
    pub fn s3_region(&self) -> Option<&str> {
        self.s3_region.as_deref().or(self.aws_region.as_deref())
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.s3_endpoint.as_deref()
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    pub fn storage_capacity_bytes(&self) -> u64 {
        self.storage_capacity_bytes
    }

    pub fn quota_usage_cache(&self) -> bool {
        self.quota_usage_cache
    }

    pub fn log_format(&self) -> &str {
        &self.log_format
    }

    pub fn with_storage_backend(mut self, backend: StorageBackend) -> Self {
        self.storage_backend = backend;
        self
    }

    pub fn with_local_storage(mut self, path: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        self.storage_backend = StorageBackend::Local;
        self.local_storage_path = Some(path.into());
        self.local_storage_base_url = base_url.into();
        self
    }

    pub fn with_s3(mut self, bucket: impl Into<String>, region: impl Into<String>, endpoint: Option<String>) -> Self {
        self.storage_backend = StorageBackend::S3;
        self.s3_bucket = Some(bucket.into());
        self.s3_region = Some(region.into());
        self.s3_endpoint = endpoint;
        self
    }

    pub fn with_limits(mut self, max_upload_bytes: u64, storage_capacity_bytes: u64) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self.storage_capacity_bytes = storage_capacity_bytes;
        self
    }

    pub fn with_quota_usage_cache(mut self, enabled: bool) -> Self {
        self.quota_usage_cache = enabled;
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }
}
