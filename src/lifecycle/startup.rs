//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging, metrics and persistence in dependency order
//! - Build the worker from its identity and hand it to the launcher
//! - Release the database engine once the launcher returns
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and nothing is left running
//! - Subsystems initialize in order, not concurrently
//! - The worker is built last, from already-initialized parts, through a
//!   factory closure so tests can substitute their own service
//! - Runtime installation and signal handling stay in `main`

use std::ffi::OsString;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{ConfigError, ConfigLoader, EngineConfig};
use crate::engine::ServiceIdentity;
use crate::lifecycle::launcher::{LaunchError, Launcher};
use crate::lifecycle::service::{Service, ServiceError};
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::logging::{self, LoggingError};
use crate::observability::metrics;
use crate::persistence::{DatabaseEngine, Persistence, PersistenceInitError};

/// Configuration project name; selects `{project}.toml` and log file names.
pub const PROJECT_NAME: &str = "heat";

/// Executable name; selects `{process}.toml` and appears in `--help`.
pub const PROCESS_NAME: &str = "heat-engine";

/// Anything that ends the process with a non-zero exit.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error("failed to initialize logging: {0}")]
    Logging(#[from] LoggingError),

    #[error("failed to initialize persistence: {0}")]
    Persistence(#[from] PersistenceInitError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// The ordered startup sequence for one worker process.
pub struct Bootstrap {
    process_name: String,
    project_name: String,
    loader: ConfigLoader,
    persistence: Persistence,
}

impl Bootstrap {
    pub fn new(process_name: &str, project_name: &str) -> Self {
        Self {
            process_name: process_name.to_string(),
            project_name: project_name.to_string(),
            loader: ConfigLoader::new(project_name),
            persistence: Persistence::new(),
        }
    }

    /// Replace the configuration file search path.
    pub fn with_loader(mut self, loader: ConfigLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Share a persistence handle with the caller.
    pub fn with_persistence(mut self, persistence: Persistence) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    /// Run the worker until `shutdown` fires or the service exits.
    ///
    /// ```text
    /// load config → logging → metrics (optional) → persistence
    ///     → build(config, identity, engine) → launch → wait → close engine
    /// ```
    pub async fn run<I, T, F>(
        &self,
        argv: I,
        shutdown: Shutdown,
        build: F,
    ) -> Result<(), StartupError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
        F: FnOnce(&EngineConfig, ServiceIdentity, Arc<DatabaseEngine>) -> Arc<dyn Service>,
    {
        let config = Arc::new(self.loader.load(argv, &self.process_name, &self.project_name)?);

        logging::setup(&config.logging, &self.project_name)?;
        tracing::info!(
            process = %self.process_name,
            host = %config.host,
            sources = ?config.sources,
            "Configuration loaded"
        );

        if config.metrics.enabled {
            match config.metrics.address.parse::<SocketAddr>() {
                Ok(addr) => metrics::init_metrics(addr),
                Err(e) => tracing::error!(
                    metrics_address = %config.metrics.address,
                    error = %e,
                    "Failed to parse metrics address"
                ),
            }
        }

        let database = self.persistence.configure(&config.database).await?;

        let outcome = self.supervise(&config, database, &shutdown, build).await;
        self.persistence.shutdown().await;

        match &outcome {
            Ok(()) => tracing::info!("Shutdown complete"),
            Err(e) => tracing::debug!(error = %e, "Worker ended with error"),
        }
        outcome
    }

    async fn supervise<F>(
        &self,
        config: &EngineConfig,
        database: Arc<DatabaseEngine>,
        shutdown: &Shutdown,
        build: F,
    ) -> Result<(), StartupError>
    where
        F: FnOnce(&EngineConfig, ServiceIdentity, Arc<DatabaseEngine>) -> Arc<dyn Service>,
    {
        let identity = ServiceIdentity::from_config(config);
        tracing::info!(
            host = %identity.host(),
            topic = %identity.topic(),
            routing_key = %identity.routing_key(),
            "Binding engine worker"
        );

        let service = build(config, identity, database);

        let mut launcher = Launcher::new();
        launcher.launch(service)?;
        launcher.wait(shutdown).await?;
        Ok(())
    }
}
