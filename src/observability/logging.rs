//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem from [`LoggingConfig`]
//! - Route records to stdout, stderr or a (rotating) file
//! - Apply a default severity plus per-subsystem overrides
//! - Reconfigure in place when `setup` runs again
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - The filter and the sink are both `reload` layers, so a second `setup`
//!   swaps them instead of failing on the already-set global subscriber
//! - File output goes through a non-blocking writer; its guard is dropped on
//!   reconfiguration and at exit, which flushes and closes the file
//! - Records emitted before the first `setup` are dropped (no subscriber is
//!   installed yet); callers report pre-logging failures on stderr

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::filter::{EnvFilter, ParseError};
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, reload, Layer, Registry};

use crate::config::{LogFormat, LogRotation, LogSink, LoggingConfig};

type FilterLayer = reload::Layer<EnvFilter, Registry>;
type Filtered = Layered<FilterLayer, Registry>;
type SinkLayer = Box<dyn Layer<Filtered> + Send + Sync>;

struct LoggingState {
    filter: reload::Handle<EnvFilter, Registry>,
    sink: reload::Handle<SinkLayer, Filtered>,
    guard: Option<WorkerGuard>,
}

static STATE: Mutex<Option<LoggingState>> = Mutex::new(None);

/// Errors raised while configuring logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter '{directives}': {source}")]
    Filter {
        directives: String,
        #[source]
        source: ParseError,
    },

    #[error("failed to create log directory {}: {source}", dir.display())]
    Directory {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open log file {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: InitError,
    },

    #[error("another global tracing subscriber is already installed: {0}")]
    AlreadyInstalled(#[source] TryInitError),

    #[error("failed to reconfigure logging: {0}")]
    Reload(#[source] reload::Error),
}

/// Install or reconfigure the process-wide log sinks.
pub fn setup(config: &LoggingConfig, project_name: &str) -> Result<(), LoggingError> {
    let directives = filter_directives(config);
    let filter = build_filter(&directives)?;
    let (sink, guard) = build_sink(config, project_name)?;

    let mut state = STATE.lock().unwrap_or_else(PoisonError::into_inner);
    match state.as_mut() {
        Some(current) => {
            current.filter.reload(filter).map_err(LoggingError::Reload)?;
            current.sink.reload(sink).map_err(LoggingError::Reload)?;
            // Replacing the guard flushes and closes the previous writer.
            current.guard = guard;
        }
        None => {
            let (filter_layer, filter) = reload::Layer::new(filter);
            let (sink_layer, sink) = reload::Layer::new(sink);
            tracing_subscriber::registry()
                .with(filter_layer)
                .with(sink_layer)
                .try_init()
                .map_err(LoggingError::AlreadyInstalled)?;

            *state = Some(LoggingState {
                filter,
                sink,
                guard,
            });
        }
    }
    drop(state);

    tracing::debug!(
        project = project_name,
        directives = %directives,
        sink = ?config.sink,
        format = ?config.format,
        "Logging configured"
    );
    Ok(())
}

/// Whether `setup` has installed the global subscriber.
pub fn is_initialized() -> bool {
    STATE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}

/// Flush and close any file writer. Later records to that writer are dropped
/// until `setup` runs again.
pub fn flush() {
    let guard = STATE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .as_mut()
        .and_then(|state| state.guard.take());
    drop(guard);
}

/// `EnvFilter` directives: default severity first, then one per subsystem.
pub fn filter_directives(config: &LoggingConfig) -> String {
    let mut directives = vec![config.default_severity().to_string()];
    directives.extend(
        config
            .levels
            .iter()
            .map(|(subsystem, severity)| format!("{subsystem}={severity}")),
    );
    directives.join(",")
}

fn build_filter(directives: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::builder()
        .parse(directives)
        .map_err(|source| LoggingError::Filter {
            directives: directives.to_string(),
            source,
        })
}

fn build_sink(
    config: &LoggingConfig,
    project_name: &str,
) -> Result<(SinkLayer, Option<WorkerGuard>), LoggingError> {
    match config.sink {
        LogSink::Stdout => Ok((format_layer(config.format, io::stdout, true), None)),
        LogSink::Stderr => Ok((format_layer(config.format, io::stderr, true), None)),
        LogSink::File => {
            let appender = file_appender(config, project_name)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            Ok((format_layer(config.format, writer, false), Some(guard)))
        }
    }
}

fn format_layer<W>(format: LogFormat, writer: W, ansi: bool) -> SinkLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer::<Filtered>()
        .with_writer(writer)
        .with_target(true)
        .with_ansi(ansi);

    match format {
        LogFormat::Text => Box::new(layer),
        LogFormat::Json => Box::new(layer.json()),
    }
}

/// Resolve `(directory, file name)` for the file sink.
fn log_file_location(config: &LoggingConfig, project_name: &str) -> (PathBuf, String) {
    let default_name = format!("{project_name}.log");
    match (&config.file, &config.dir) {
        (Some(file), _) => {
            let dir = file
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            let name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or(default_name);
            (dir, name)
        }
        (None, Some(dir)) => (dir.clone(), default_name),
        (None, None) => (PathBuf::from("."), default_name),
    }
}

fn file_appender(
    config: &LoggingConfig,
    project_name: &str,
) -> Result<RollingFileAppender, LoggingError> {
    let (dir, name) = log_file_location(config, project_name);
    std::fs::create_dir_all(&dir).map_err(|source| LoggingError::Directory {
        dir: dir.clone(),
        source,
    })?;

    let rotation = match config.rotation {
        LogRotation::Never => Rotation::NEVER,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
    };

    RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(name.as_str())
        .build(&dir)
        .map_err(|source| LoggingError::File {
            path: dir.join(&name),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Severity;

    #[test]
    fn test_filter_directives_include_overrides() {
        let mut config = LoggingConfig::default();
        config
            .levels
            .insert("heat_engine::lifecycle".to_string(), Severity::Trace);

        assert_eq!(
            filter_directives(&config),
            "info,heat_engine::lifecycle=trace,sqlx=warn"
        );

        config.debug = true;
        assert!(filter_directives(&config).starts_with("debug,"));
        assert!(build_filter(&filter_directives(&config)).is_ok());
    }

    #[test]
    fn test_log_file_location() {
        let mut config = LoggingConfig {
            file: Some(PathBuf::from("/var/log/heat/engine.log")),
            ..LoggingConfig::default()
        };
        assert_eq!(
            log_file_location(&config, "heat"),
            (PathBuf::from("/var/log/heat"), "engine.log".to_string())
        );

        config.file = None;
        config.dir = Some(PathBuf::from("/srv/logs"));
        assert_eq!(
            log_file_location(&config, "heat"),
            (PathBuf::from("/srv/logs"), "heat.log".to_string())
        );

        config.file = Some(PathBuf::from("engine.log"));
        assert_eq!(log_file_location(&config, "heat").0, PathBuf::from("."));
    }

    #[test]
    fn test_file_sink_creates_missing_directory() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = LoggingConfig {
            sink: LogSink::File,
            dir: Some(tmp.path().join("nested").join("logs")),
            ..LoggingConfig::default()
        };

        let (_layer, guard) = build_sink(&config, "heat").unwrap();
        assert!(guard.is_some());
        assert!(tmp.path().join("nested/logs/heat.log").exists());
    }
}
