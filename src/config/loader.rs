//! Configuration loading from disk, environment and command line.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml::{Table, Value};

use crate::config::cli::CliArgs;
use crate::config::schema::EngineConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Bad flags, or `--help`/`--version` was requested.
    #[error("{0}")]
    Usage(#[source] clap::Error),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The merged layers do not fit the schema (wrong types, unknown severities).
    #[error("invalid configuration: {source}")]
    Invalid {
        #[source]
        source: toml::de::Error,
    },

    /// Compiled-in defaults could not be rendered as a base table.
    #[error("failed to render default configuration: {source}")]
    Defaults {
        #[source]
        source: toml::ser::Error,
    },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Loads layered configuration for one process of a project.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    search_dirs: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Loader using the conventional search path:
    /// `~/.{project}/`, `~/`, `/etc/{project}/`, `/etc/`.
    pub fn new(project_name: &str) -> Self {
        let mut search_dirs = Vec::new();
        if let Some(home) = dirs::home_dir() {
            search_dirs.push(home.join(format!(".{project_name}")));
            search_dirs.push(home);
        }
        search_dirs.push(PathBuf::from("/etc").join(project_name));
        search_dirs.push(PathBuf::from("/etc"));

        Self { search_dirs }
    }

    /// Loader with an explicit search path.
    pub fn with_search_dirs(search_dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs }
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Parse `argv` and merge every configuration layer.
    ///
    /// Precedence, lowest first: defaults, `{project}.toml`, `{process}.toml`,
    /// `--config-dir` files, environment and flags. `--config-file` replaces
    /// the two searched files.
    pub fn load<I, T>(
        &self,
        argv: I,
        process_name: &str,
        project_name: &str,
    ) -> Result<EngineConfig, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args = CliArgs::parse_argv(argv, process_name, project_name)?;

        let mut files = if args.config_files.is_empty() {
            self.discover(process_name, project_name)
        } else {
            args.config_files.clone()
        };
        if let Some(dir) = &args.config_dir {
            files.extend(list_config_dir(dir)?);
        }

        let mut merged = default_table()?;
        for path in &files {
            merge_tables(&mut merged, read_table(path)?);
        }
        merge_tables(&mut merged, args.overrides());

        let mut config: EngineConfig = Value::Table(merged)
            .try_into()
            .map_err(|source| ConfigError::Invalid { source })?;
        config.sources = files;

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }

    /// Project file, then process file; the first match in the search path wins.
    pub fn discover(&self, process_name: &str, project_name: &str) -> Vec<PathBuf> {
        let mut names = vec![format!("{project_name}.toml")];
        if process_name != project_name {
            names.push(format!("{process_name}.toml"));
        }

        names
            .iter()
            .filter_map(|name| {
                self.search_dirs
                    .iter()
                    .map(|dir| dir.join(name))
                    .find(|candidate| candidate.is_file())
            })
            .collect()
    }
}

/// Compiled-in defaults as the lowest merge layer, so partial tables in
/// later layers (such as `[logging.levels]`) extend them instead of
/// replacing them. `host` stays out; serde fills it from the hostname.
fn default_table() -> Result<Table, ConfigError> {
    let mut table =
        Table::try_from(EngineConfig::default()).map_err(|source| ConfigError::Defaults { source })?;
    table.remove("host");
    Ok(table)
}

fn list_config_dir(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let entries = fs::read_dir(dir).map_err(|source| ConfigError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "toml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_table(path: &Path) -> Result<Table, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Recursively merge `overlay` into `base`; overlay wins on conflicts.
fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(existing)), Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{LogSink, Severity};
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_conventional_search_path_order() {
        let loader = ConfigLoader::new("heat");
        let dirs = loader.search_dirs();

        assert!(dirs.len() >= 2);
        assert_eq!(dirs[dirs.len() - 2], PathBuf::from("/etc/heat"));
        assert_eq!(dirs[dirs.len() - 1], PathBuf::from("/etc"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(dirs[0], home.join(".heat"));
            assert_eq!(dirs[1], home);
        }
    }

    #[test]
    fn test_layer_precedence() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "heat.toml",
            "host = \"from-project\"\n[database]\nmax_connections = 7\n[engine]\nperiodic_interval_secs = 30\n",
        );
        write(tmp.path(), "heat-engine.toml", "host = \"from-process\"\n");

        let conf_d = tmp.path().join("conf.d");
        fs::create_dir(&conf_d).unwrap();
        write(&conf_d, "10-db.toml", "[database]\nmax_connections = 9\n");
        write(&conf_d, "20-db.toml", "[database]\nmax_connections = 11\n");
        write(&conf_d, "ignored.txt", "host = \"nope\"\n");

        let loader = ConfigLoader::with_search_dirs(vec![tmp.path().to_path_buf()]);
        let config = loader
            .load(
                ["heat-engine", "--config-dir", conf_d.to_str().unwrap()],
                "heat-engine",
                "heat",
            )
            .unwrap();

        assert_eq!(config.host, "from-process");
        assert_eq!(config.database.max_connections, 11);
        assert_eq!(config.engine.periodic_interval_secs, 30);
        assert_eq!(config.sources.len(), 4);

        let config = loader
            .load(
                ["heat-engine", "--host", "from-cli"],
                "heat-engine",
                "heat",
            )
            .unwrap();
        assert_eq!(config.host, "from-cli");
    }

    #[test]
    fn test_explicit_config_file_replaces_search() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "heat.toml", "host = \"searched\"\n");
        let explicit = write(
            tmp.path(),
            "other.toml",
            "host = \"explicit\"\n[logging.levels]\nheat_engine = \"DEBUG\"\n",
        );

        let loader = ConfigLoader::with_search_dirs(vec![tmp.path().to_path_buf()]);
        let config = loader
            .load(
                ["heat-engine", "--config-file", explicit.to_str().unwrap()],
                "heat-engine",
                "heat",
            )
            .unwrap();

        assert_eq!(config.host, "explicit");
        assert_eq!(config.sources, vec![explicit]);
        assert_eq!(config.logging.levels["heat_engine"], Severity::Debug);
        // Defaults survive a partial levels table.
        assert_eq!(config.logging.levels["sqlx"], Severity::Warn);
    }

    #[test]
    fn test_cli_level_override_keeps_default_levels() {
        let loader = ConfigLoader::with_search_dirs(Vec::new());
        let config = loader
            .load(
                ["heat-engine", "--host", "node-a", "--log-level", "heat_engine=debug"],
                "heat-engine",
                "heat",
            )
            .unwrap();

        assert_eq!(config.logging.levels["heat_engine"], Severity::Debug);
        assert_eq!(config.logging.levels["sqlx"], Severity::Warn);
        assert_eq!(config.database.url, "sqlite::memory:");
    }

    #[test]
    fn test_default_table_omits_host() {
        let table = default_table().unwrap();
        assert!(!table.contains_key("host"));
        assert!(!table.contains_key("sources"));
        assert_eq!(table["logging"]["levels"]["sqlx"].as_str(), Some("warn"));
        assert_eq!(table["engine"]["topic"].as_str(), Some("engine"));
    }

    #[test]
    fn test_missing_host_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = write(tmp.path(), "heat.toml", "host = \"\"\n");

        let loader = ConfigLoader::with_search_dirs(Vec::new());
        let result = loader.load(
            ["heat-engine", "--config-file", path.to_str().unwrap()],
            "heat-engine",
            "heat",
        );

        match result {
            Err(ConfigError::Validation(errors)) => {
                assert!(errors.contains(&ValidationError::EmptyHost));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_severity_is_rejected() {
        let loader = ConfigLoader::with_search_dirs(Vec::new());
        let result = loader.load(
            ["heat-engine", "--host", "node-a", "--log-level", "sqlx=chatty"],
            "heat-engine",
            "heat",
        );
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_missing_explicit_file_is_io_error() {
        let loader = ConfigLoader::with_search_dirs(Vec::new());
        let result = loader.load(
            ["heat-engine", "--config-file", "/nonexistent/heat.toml"],
            "heat-engine",
            "heat",
        );
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = write(tmp.path(), "heat.toml", "host = \n");

        let loader = ConfigLoader::with_search_dirs(Vec::new());
        let result = loader.load(
            ["heat-engine", "--config-file", path.to_str().unwrap()],
            "heat-engine",
            "heat",
        );
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_log_file_flag_selects_file_sink() {
        let loader = ConfigLoader::with_search_dirs(Vec::new());
        let config = loader
            .load(
                ["heat-engine", "--host", "node-a", "--log-file", "/tmp/engine.log"],
                "heat-engine",
                "heat",
            )
            .unwrap();
        assert_eq!(config.logging.sink, LogSink::File);
        assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/engine.log")));
    }

    #[test]
    fn test_merge_tables_is_recursive() {
        let mut base: Table = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: Table = toml::from_str("[a]\ny = 3\n").unwrap();
        merge_tables(&mut base, overlay);
        assert_eq!(base["a"]["x"].as_integer(), Some(1));
        assert_eq!(base["a"]["y"].as_integer(), Some(3));
    }
}
