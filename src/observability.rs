//! Tracing subscriber setup
//!
//! The library only emits `tracing` events; installing a subscriber is the
//! application's call. [`init_subscriber`] is a convenience for binaries and
//! test harnesses.
//!
//! ```rust,ignore
//! use unillm::observability::{init_subscriber, OutputFormat, SubscriberConfig};
//!
//! init_subscriber(&SubscriberConfig::default().output_format(OutputFormat::Json))?;
//! ```

use std::str::FromStr;
use tracing_subscriber::EnvFilter;

use crate::error::LlmError;

/// Environment variable holding the log level
pub const LOG_LEVEL_ENV: &str = "UNILLM_LOG_LEVEL";
/// Environment variable holding the output format (`text`, `json`, `json-compact`)
pub const LOG_FORMAT_ENV: &str = "UNILLM_LOG_FORMAT";

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// One JSON object per line, fields nested under `fields`
    Json,
    /// One JSON object per line, fields flattened into the event
    JsonCompact,
}

impl FromStr for OutputFormat {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "json-compact" | "json_compact" | "compact" => Ok(Self::JsonCompact),
            other => Err(LlmError::ConfigurationError(format!(
                "invalid log format `{other}`, expected text, json or json-compact"
            ))),
        }
    }
}

/// Subscriber configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberConfig {
    pub log_level: tracing::Level,
    pub output_format: OutputFormat,
    pub with_target: bool,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            log_level: tracing::Level::INFO,
            output_format: OutputFormat::Text,
            with_target: true,
        }
    }
}

impl SubscriberConfig {
    pub fn log_level(mut self, level: tracing::Level) -> Self {
        self.log_level = level;
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }

    /// Defaults overridden by `UNILLM_LOG_LEVEL` and `UNILLM_LOG_FORMAT`
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LlmError> {
        let mut config = Self::default();
        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            config.log_level = level.trim().parse().map_err(|_| {
                LlmError::ConfigurationError(format!(
                    "invalid log level `{level}`, expected trace, debug, info, warn or error"
                ))
            })?;
        }
        if let Some(format) = lookup(LOG_FORMAT_ENV) {
            config.output_format = format.parse()?;
        }
        Ok(config)
    }

    /// Filter for this crate at the configured level; `RUST_LOG` wins when set
    pub fn env_filter(&self) -> EnvFilter {
        let level = self.log_level.as_str().to_ascii_lowercase();
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("unillm={level}")))
    }
}

/// Install a global `fmt` subscriber.
///
/// Fails with `ConfigurationError` if a global subscriber is already set.
pub fn init_subscriber(config: &SubscriberConfig) -> Result<(), LlmError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_target(config.with_target);

    let result = match config.output_format {
        OutputFormat::Text => builder.try_init(),
        OutputFormat::Json => builder.json().try_init(),
        OutputFormat::JsonCompact => builder.json().flatten_event(true).try_init(),
    };
    result.map_err(|e| LlmError::ConfigurationError(format!("failed to install tracing subscriber: {e}")))
}
