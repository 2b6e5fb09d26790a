use std::str::FromStr;

use mediacat_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "mediacat=debug";

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Unknown log format: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub environment: String,
    pub log_format: LogFormat,
    /// Used when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl TelemetryConfig {
    pub fn from_config(service_name: impl Into<String>, config: &Config) -> Self {
        Self {
            service_name: service_name.into(),
            environment: config.environment().to_string(),
            log_format: config.log_format().parse().unwrap_or_default(),
            default_filter: DEFAULT_FILTER.to_string(),
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| self.default_filter.as_str().into())
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "mediacat".to_string(),
            environment: "development".to_string(),
            log_format: LogFormat::Pretty,
            default_filter: DEFAULT_FILTER.to_string(),
        }
    }
}

/// Initialize tracing
///
/// Fails if a global subscriber is already installed.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), Box<dyn std::error::Error>> {
    let registry = tracing_subscriber::registry().with(config.env_filter());

    match config.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init()?,
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
    }

    tracing::info!(
        service_name = %config.service_name,
        environment = %config.environment,
        log_format = ?config.log_format,
        "Telemetry initialized"
    );
    Ok(())
}

pub async fn shutdown_telemetry() {
    tracing::debug!("Telemetry shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn telemetry_config_follows_app_config() {
        let config = Config::default().with_environment("staging");
        let telemetry = TelemetryConfig::from_config("mediacat-cli", &config);
        assert_eq!(telemetry.service_name, "mediacat-cli");
        assert_eq!(telemetry.environment, "staging");
        assert_eq!(telemetry.log_format, LogFormat::Pretty);
        assert_eq!(telemetry.default_filter, DEFAULT_FILTER);
    }

    #[test]
    fn second_init_is_an_error() {
        let config = TelemetryConfig::default();
        let _ = init_telemetry(&config);
        assert!(init_telemetry(&config).is_err());
    }
}
