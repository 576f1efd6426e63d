//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic checks and severity names)
//! - Validate identity fields (host, topic) are present
//! - Validate value ranges (intervals > 0, pool sizes > 0)
//! - Check sink settings are complete (file sink needs a path)
//! - Check per-subsystem overrides form valid filter directives
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EngineConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use tracing_subscriber::filter::Directive;

use crate::config::schema::{EngineConfig, LogSink};

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("host must not be empty")]
    EmptyHost,

    #[error("engine.topic must not be empty")]
    EmptyTopic,

    #[error("engine.periodic_interval_secs must be greater than zero")]
    ZeroPeriodicInterval,

    #[error("engine.max_heartbeat_failures must be greater than zero")]
    ZeroHeartbeatFailures,

    #[error("logging.sink = \"file\" requires logging.file or logging.dir")]
    MissingLogFile,

    #[error("logging.levels contains an empty subsystem name")]
    EmptySubsystem,

    #[error("logging.levels key '{0}' is not a valid log target")]
    InvalidSubsystem(String),

    #[error("database.url must not be empty")]
    EmptyDatabaseUrl,

    #[error("database.max_connections must be greater than zero")]
    ZeroMaxConnections,

    #[error("metrics.address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check a fully merged configuration.
pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if config.engine.topic.trim().is_empty() {
        errors.push(ValidationError::EmptyTopic);
    }
    if config.engine.periodic_interval_secs == 0 {
        errors.push(ValidationError::ZeroPeriodicInterval);
    }
    if config.engine.max_heartbeat_failures == 0 {
        errors.push(ValidationError::ZeroHeartbeatFailures);
    }

    let logging = &config.logging;
    if logging.sink == LogSink::File && logging.file.is_none() && logging.dir.is_none() {
        errors.push(ValidationError::MissingLogFile);
    }
    for (subsystem, severity) in &logging.levels {
        if subsystem.trim().is_empty() {
            errors.push(ValidationError::EmptySubsystem);
        } else if format!("{subsystem}={severity}").parse::<Directive>().is_err() {
            errors.push(ValidationError::InvalidSubsystem(subsystem.clone()));
        }
    }

    if config.database.url.trim().is_empty() {
        errors.push(ValidationError::EmptyDatabaseUrl);
    }
    if config.database.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }

    if config.metrics.enabled && config.metrics.address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.metrics.address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Severity;

    fn valid_config() -> EngineConfig {
        EngineConfig {
            host: "node-a".to_string(),
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_default_config_with_host_is_valid() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let mut config = valid_config();
        config.host = "  ".to_string();
        config.engine.topic.clear();
        config.database.max_connections = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyHost,
                ValidationError::EmptyTopic,
                ValidationError::ZeroMaxConnections,
            ]
        );
    }

    #[test]
    fn test_file_sink_needs_destination() {
        let mut config = valid_config();
        config.logging.sink = LogSink::File;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::MissingLogFile]
        );

        config.logging.dir = Some("/var/log/heat".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = valid_config();
        config.metrics.address = "not-an-address".to_string();
        assert!(validate_config(&config).is_ok());

        config.metrics.enabled = true;
        assert!(matches!(
            validate_config(&config).unwrap_err().as_slice(),
            [ValidationError::InvalidMetricsAddress(_)]
        ));
    }

    #[test]
    fn test_level_overrides_must_be_filter_targets() {
        let mut config = valid_config();
        config
            .logging
            .levels
            .insert("heat_engine::lifecycle".to_string(), Severity::Debug);
        assert!(validate_config(&config).is_ok());

        config.logging.levels.insert("a=b".to_string(), Severity::Info);
        config.logging.levels.insert("x[y".to_string(), Severity::Info);
        config.logging.levels.insert(" ".to_string(), Severity::Info);

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::InvalidSubsystem("a=b".to_string())));
        assert!(errors.contains(&ValidationError::InvalidSubsystem("x[y".to_string())));
        assert!(errors.contains(&ValidationError::EmptySubsystem));
    }
}
