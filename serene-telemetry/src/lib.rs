//! Structured logging for Serene.
//!
//! Call [`init_telemetry`] once at process start. Library crates only emit
//! `tracing` events; this crate decides where they go.
//!
//! ```rust,ignore
//! let config = serene_telemetry::TelemetryConfig::from_env();
//! serene_telemetry::init_telemetry(&config)?;
//! ```

pub mod capture;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "SERENE_LOG";
/// Environment variable selecting the output format.
pub const LOG_FORMAT_ENV: &str = "SERENE_LOG_FORMAT";

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter '{filter}': {message}")]
    Filter { filter: String, message: String },

    #[error("unknown log format '{0}' (expected pretty, compact, or json)")]
    Format(String),

    #[error("failed to install global subscriber: {0}")]
    Init(String),
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(TelemetryError::Format(other.to_string())),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive, e.g. `info,serene_rag=debug`.
    pub filter: String,
    pub format: LogFormat,
    /// Emit span close events with timings.
    pub span_events: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { filter: DEFAULT_FILTER.to_string(), format: LogFormat::default(), span_events: false }
    }
}

impl TelemetryConfig {
    /// Defaults overridden by `SERENE_LOG` and `SERENE_LOG_FORMAT`.
    ///
    /// Falls back to the defaults when the variables are invalid; use
    /// [`Self::with_env`] to surface the error.
    pub fn from_env() -> Self {
        Self::default().with_env().unwrap_or_default()
    }

    /// Apply `SERENE_LOG` / `SERENE_LOG_FORMAT` on top of `self`.
    pub fn with_env(mut self) -> Result<Self, TelemetryError> {
        if let Ok(filter) = std::env::var(LOG_ENV) {
            if !filter.trim().is_empty() {
                self.filter = filter;
            }
        }
        if let Ok(format) = std::env::var(LOG_FORMAT_ENV) {
            self.format = format.parse()?;
        }
        Ok(self)
    }

    fn env_filter(&self) -> Result<EnvFilter, TelemetryError> {
        EnvFilter::try_new(&self.filter).map_err(|e| TelemetryError::Filter {
            filter: self.filter.clone(),
            message: e.to_string(),
        })
    }
}

/// Install the global `tracing` subscriber described by `config`.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
///
/// # Errors
///
/// Fails on an invalid filter directive or if a global subscriber is
/// already installed.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = config.env_filter()?;
    let span_events = if config.span_events { FmtSpan::CLOSE } else { FmtSpan::NONE };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(span_events)
        .with_writer(std::io::stderr);

    let result = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| TelemetryError::Init(e.to_string()))?;

    tracing::debug!(filter = %config.filter, format = ?config.format, "telemetry initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" compact ".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!(matches!("xml".parse::<LogFormat>(), Err(TelemetryError::Format(_))));
    }

    #[test]
    fn rejects_invalid_filter() {
        let config = TelemetryConfig { filter: "serene_rag=notalevel".into(), ..Default::default() };
        assert!(matches!(config.env_filter(), Err(TelemetryError::Filter { .. })));
    }

    #[test]
    fn second_init_reports_error() {
        let config = TelemetryConfig { filter: "warn".into(), ..Default::default() };
        init_telemetry(&config).unwrap();
        assert!(matches!(init_telemetry(&config), Err(TelemetryError::Init(_))));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: TelemetryConfig = serde_json::from_str(r#"{"format": "json"}"#).unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.filter, DEFAULT_FILTER);
    }
}
