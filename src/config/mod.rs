//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! compiled-in defaults (schema.rs)
//!     → {project}.toml, {process}.toml (first hit in the search path)
//!     → --config-dir/*.toml (lexical order)
//!     → environment + flags (cli.rs)
//!     → loader.rs (recursive table merge, deserialize)
//!     → validation.rs (semantic checks)
//!     → EngineConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a process restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Any failure stops startup before logging or persistence exist

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigError, ConfigLoader};
pub use schema::{
    DatabaseConfig, EngineConfig, EngineServiceConfig, LogFormat, LogRotation, LogSink,
    LoggingConfig, MetricsConfig, Severity, ENGINE_TOPIC,
};
pub use validation::ValidationError;
