//! Command-line and environment layer.
//!
//! Flags are turned into a TOML table shaped like the configuration files so
//! they merge with the same rules and are validated in one place.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{CommandFactory, FromArgMatches, Parser};
use toml::{Table, Value};

use crate::config::loader::ConfigError;

/// Flags accepted by the engine worker.
#[derive(Debug, Clone, Default, Parser)]
#[command(version)]
pub struct CliArgs {
    /// Configuration file to load (repeatable); replaces the default search path.
    #[arg(long = "config-file", value_name = "PATH", env = "HEAT_CONFIG_FILE")]
    pub config_files: Vec<PathBuf>,

    /// Directory of additional `*.toml` files, applied in lexical order.
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Host identity this worker answers on.
    #[arg(long, env = "HEAT_HOST")]
    pub host: Option<String>,

    /// Log at debug severity.
    #[arg(short, long)]
    pub debug: bool,

    /// Write logs to this file instead of stderr.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log record format.
    #[arg(long, value_parser = ["text", "json"])]
    pub log_format: Option<String>,

    /// Severity override, either `LEVEL` or `SUBSYSTEM=LEVEL` (repeatable).
    #[arg(long = "log-level", value_name = "[SUBSYSTEM=]LEVEL", value_parser = parse_level_override)]
    pub log_levels: Vec<LevelOverride>,

    /// Database connection URL.
    #[arg(long, env = "HEAT_DATABASE_URL")]
    pub database_url: Option<String>,
}

/// A `--log-level` flag value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelOverride {
    /// Target subsystem; `None` sets the default severity.
    pub subsystem: Option<String>,
    pub severity: String,
}

fn parse_level_override(value: &str) -> Result<LevelOverride, String> {
    match value.split_once('=') {
        Some((subsystem, severity)) if severity.trim().is_empty() => {
            Err(format!("missing severity for subsystem '{subsystem}'"))
        }
        Some((subsystem, severity)) => Ok(LevelOverride {
            subsystem: Some(subsystem.trim().to_string()),
            severity: severity.trim().to_string(),
        }),
        None => Ok(LevelOverride {
            subsystem: None,
            severity: value.trim().to_string(),
        }),
    }
}

impl CliArgs {
    /// Parse `argv` using the process name for usage text.
    pub fn parse_argv<I, T>(argv: I, process_name: &str, project_name: &str) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let command = Self::command()
            .name(process_name.to_string())
            .bin_name(process_name.to_string())
            .about(format!("{project_name} orchestration engine worker"));

        let matches = command
            .try_get_matches_from(argv)
            .map_err(ConfigError::Usage)?;
        Self::from_arg_matches(&matches).map_err(ConfigError::Usage)
    }

    /// Flag values as a configuration table (highest precedence layer).
    pub fn overrides(&self) -> Table {
        let mut root = Table::new();
        let mut logging = Table::new();
        let mut database = Table::new();

        if let Some(host) = &self.host {
            root.insert("host".into(), Value::String(host.clone()));
        }

        if self.debug {
            logging.insert("debug".into(), Value::Boolean(true));
        }
        if let Some(path) = &self.log_file {
            logging.insert("sink".into(), Value::String("file".into()));
            logging.insert(
                "file".into(),
                Value::String(path.to_string_lossy().into_owned()),
            );
        }
        if let Some(format) = &self.log_format {
            logging.insert("format".into(), Value::String(format.clone()));
        }

        let mut levels = Table::new();
        for level in &self.log_levels {
            match &level.subsystem {
                Some(subsystem) => {
                    levels.insert(subsystem.clone(), Value::String(level.severity.clone()));
                }
                None => {
                    logging.insert("level".into(), Value::String(level.severity.clone()));
                }
            }
        }
        if !levels.is_empty() {
            logging.insert("levels".into(), Value::Table(levels));
        }

        if let Some(url) = &self.database_url {
            database.insert("url".into(), Value::String(url.clone()));
        }

        if !logging.is_empty() {
            root.insert("logging".into(), Value::Table(logging));
        }
        if !database.is_empty() {
            root.insert("database".into(), Value::Table(database));
        }
        root
    }
}
