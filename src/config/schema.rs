//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the engine
//! worker. All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Topic the engine worker answers on unless configured otherwise.
pub const ENGINE_TOPIC: &str = "engine";

/// Root configuration for the engine worker.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Host identity used to address this worker (defaults to the hostname).
    pub host: String,

    /// Engine service settings (topic, periodic tasks).
    pub engine: EngineServiceConfig,

    /// Log sinks and severities.
    pub logging: LoggingConfig,

    /// Database engine settings.
    pub database: DatabaseConfig,

    /// Metrics exporter settings.
    pub metrics: MetricsConfig,

    /// Configuration files that contributed to this configuration, in load order.
    #[serde(skip)]
    pub sources: Vec<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            engine: EngineServiceConfig::default(),
            logging: LoggingConfig::default(),
            database: DatabaseConfig::default(),
            metrics: MetricsConfig::default(),
            sources: Vec::new(),
        }
    }
}

/// Resolves the machine hostname; an unreadable hostname leaves the field
/// empty so validation reports it.
fn default_host() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_default()
}

/// Engine service configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineServiceConfig {
    /// RPC topic this worker listens on.
    pub topic: String,

    /// Interval between periodic heartbeat tasks in seconds.
    pub periodic_interval_secs: u64,

    /// Consecutive heartbeat failures tolerated before the service fails.
    pub max_heartbeat_failures: u32,
}

impl Default for EngineServiceConfig {
    fn default() -> Self {
        Self {
            topic: ENGINE_TOPIC.to_string(),
            periodic_interval_secs: 60,
            max_heartbeat_failures: 3,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default severity for every subsystem without an override.
    pub level: Severity,

    /// Force the default severity to debug.
    pub debug: bool,

    /// Output format.
    pub format: LogFormat,

    /// Where log records are written.
    pub sink: LogSink,

    /// Log file path (file sink).
    pub file: Option<PathBuf>,

    /// Log directory; `{project}.log` is used when `file` is unset.
    pub dir: Option<PathBuf>,

    /// Rotation policy for file sinks.
    pub rotation: LogRotation,

    /// Per-subsystem severity overrides, keyed by tracing target.
    pub levels: BTreeMap<String, Severity>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let mut levels = BTreeMap::new();
        levels.insert("sqlx".to_string(), Severity::Warn);

        Self {
            level: Severity::Info,
            debug: false,
            format: LogFormat::Text,
            sink: LogSink::Stderr,
            file: None,
            dir: None,
            rotation: LogRotation::Never,
            levels,
        }
    }
}

impl LoggingConfig {
    /// Severity applied to subsystems without an override.
    pub fn default_severity(&self) -> Severity {
        if self.debug {
            Severity::Debug
        } else {
            self.level
        }
    }
}

/// Log record format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single-line records.
    #[default]
    Text,
    /// One JSON object per record.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogSink {
    /// Standard output.
    Stdout,
    /// Standard error.
    #[default]
    Stderr,
    /// A log file (see `file` and `dir`).
    File,
}

/// File rotation policy.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// Single file, never rotated.
    #[default]
    Never,
    /// Rotate hourly.
    Hourly,
    /// Rotate daily.
    Daily,
}

/// Log severity.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Raised for severity names outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log severity '{0}' (expected trace, debug, info, warn, error)")]
pub struct UnknownSeverity(pub String);

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Trace => "trace",
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Severity::Trace),
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warn),
            "error" | "critical" | "fatal" => Ok(Severity::Error),
            _ => Err(UnknownSeverity(value.to_string())),
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = UnknownSeverity;

    fn try_from(value: String) -> Result<Self, UnknownSeverity> {
        value.parse()
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        severity.as_str().to_string()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Database engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL (`sqlite:` or `postgres://`).
    pub url: String,

    /// Maximum pooled connections.
    pub max_connections: u32,

    /// Timeout for acquiring a connection in seconds.
    pub connect_timeout_secs: u64,

    /// Idle connection lifetime in seconds.
    pub idle_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 5,
            connect_timeout_secs: 10,
            idle_timeout_secs: 600,
        }
    }
}

/// Metrics exporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Expose a Prometheus scrape endpoint.
    pub enabled: bool,

    /// Scrape endpoint bind address.
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "127.0.0.1:9464".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_aliases() {
        assert_eq!("WARNING".parse::<Severity>().unwrap(), Severity::Warn);
        assert_eq!("critical".parse::<Severity>().unwrap(), Severity::Error);
        assert_eq!(" Info ".parse::<Severity>().unwrap(), Severity::Info);
        assert!("verbose".parse::<Severity>().is_err());
    }

    #[test]
    fn test_debug_overrides_level() {
        let mut logging = LoggingConfig::default();
        assert_eq!(logging.default_severity(), Severity::Info);

        logging.debug = true;
        assert_eq!(logging.default_severity(), Severity::Debug);
    }

    #[test]
    fn test_unknown_severity_rejected_in_toml() {
        let result: Result<LoggingConfig, _> = toml::from_str("level = \"loud\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_severity_string_conversions() {
        assert_eq!(Severity::try_from("Fatal".to_string()), Ok(Severity::Error));
        assert_eq!(
            Severity::try_from("loud".to_string()),
            Err(UnknownSeverity("loud".to_string()))
        );
        assert_eq!(String::from(Severity::Warn), "warn");

        let logging: LoggingConfig = toml::from_str("level = \"WARNING\"").unwrap();
        assert_eq!(logging.level, Severity::Warn);
    }
}
