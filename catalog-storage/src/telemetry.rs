//! Tracing subscriber initialization.
//!
//! The coordinator and the backends only emit `tracing` events. Binaries and
//! test harnesses call [`init_tracing`] once to decide where those go.

use std::str::FromStr;

use catalog_core::{CatalogResult, ConfigError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "catalog_storage=info,warn";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidValue {
                field: "CATALOG_LOG_FORMAT".to_string(),
                value: s.to_string(),
                reason: "expected 'text' or 'json'".to_string(),
            }),
        }
    }
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// `EnvFilter` directives, e.g. `catalog_storage=debug,info`
    pub filter: String,
    /// Log line format
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::Text,
        }
    }
}

impl TelemetryConfig {
    /// Load from the environment.
    ///
    /// - `CATALOG_LOG`: filter directives (default: `catalog_storage=info,warn`)
    /// - `CATALOG_LOG_FORMAT`: `text` or `json` (default: text)
    pub fn from_env() -> CatalogResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> CatalogResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let filter = lookup("CATALOG_LOG").unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let format = match lookup("CATALOG_LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => LogFormat::default(),
        };
        Ok(Self { filter, format })
    }

    fn env_filter(&self) -> CatalogResult<EnvFilter> {
        EnvFilter::try_new(&self.filter).map_err(|e| {
            ConfigError::InvalidValue {
                field: "CATALOG_LOG".to_string(),
                value: self.filter.clone(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

/// Install the global tracing subscriber.
///
/// Fails if the filter does not parse or a global subscriber is already set.
pub fn init_tracing(config: &TelemetryConfig) -> CatalogResult<()> {
    let env_filter = config.env_filter()?;
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match config.format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    };
    installed.map_err(|e| ConfigError::InvalidValue {
        field: "subscriber".to_string(),
        value: "global".to_string(),
        reason: format!("Failed to init subscriber: {}", e),
    })?;

    tracing::info!(filter = %config.filter, format = ?config.format, "Telemetry initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = TelemetryConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, TelemetryConfig::default());
    }

    #[test]
    fn test_json_format() {
        let config = TelemetryConfig::from_lookup(lookup(&[
            ("CATALOG_LOG", "debug"),
            ("CATALOG_LOG_FORMAT", "JSON"),
        ]))
        .unwrap();
        assert_eq!(config.filter, "debug");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let err = TelemetryConfig::from_lookup(lookup(&[("CATALOG_LOG_FORMAT", "xml")])).unwrap_err();
        assert!(matches!(
            err,
            catalog_core::CatalogError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_bad_filter_is_rejected() {
        let config = TelemetryConfig {
            filter: "catalog_storage=notalevel".to_string(),
            format: LogFormat::Text,
        };
        assert!(config.env_filter().is_err());
    }
}
