//! The engine worker service.
//!
//! # Responsibilities
//! - Verify the database engine before declaring itself started
//! - Run the periodic heartbeat task until stopped
//! - Report readiness and the final outcome to the launcher
//!
//! # Data Flow
//! ```text
//! start ─▶ ping database ─▶ spawn heartbeat ─▶ ready
//!                               │
//!              tick ─▶ ping ─▶ ok: reset failure count
//!                         └──▶ err: count; threshold reached ─▶ task ends (Runtime error)
//!                               │
//! stop ─▶ shutdown token ───────┘ task ends (Ok), abandoning any in-flight ping
//!
//! wait ─▶ heartbeat task result
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::config::EngineServiceConfig;
use crate::engine::identity::ServiceIdentity;
use crate::lifecycle::service::{Service, ServiceError};
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics;
use crate::persistence::DatabaseEngine;

/// Worker bound to one `(host, topic)` identity.
pub struct EngineService {
    identity: ServiceIdentity,
    database: Arc<DatabaseEngine>,
    config: EngineServiceConfig,
    shutdown: Shutdown,
    ready: watch::Sender<bool>,
    heartbeat: Mutex<Option<JoinHandle<Result<(), ServiceError>>>>,
}

impl EngineService {
    pub fn new(
        identity: ServiceIdentity,
        database: Arc<DatabaseEngine>,
        config: EngineServiceConfig,
    ) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            identity,
            database,
            config,
            shutdown: Shutdown::new(),
            ready,
            heartbeat: Mutex::new(None),
        }
    }

    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Resolve once `start` has completed.
    pub async fn ready(&self) {
        let mut rx = self.ready.subscribe();
        let _ = rx.wait_for(|ready| *ready).await;
    }

    fn start_error(&self, message: impl Into<String>) -> ServiceError {
        ServiceError::Start {
            service: self.name(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Service for EngineService {
    fn name(&self) -> String {
        self.identity.routing_key()
    }

    async fn start(&self) -> Result<(), ServiceError> {
        let mut heartbeat = self.heartbeat.lock().await;
        if heartbeat.is_some() {
            return Ok(());
        }
        if self.shutdown.is_triggered() {
            return Err(self.start_error("service was stopped before it started"));
        }
        if self.database.is_closed() {
            return Err(self.start_error(format!(
                "database engine {} is closed",
                self.database.display_url()
            )));
        }
        self.database
            .ping()
            .await
            .map_err(|e| self.start_error(format!("database unreachable: {e}")))?;

        let task = Heartbeat {
            service: self.name(),
            topic: self.identity.topic().to_string(),
            database: Arc::clone(&self.database),
            period: Duration::from_secs(self.config.periodic_interval_secs),
            max_failures: self.config.max_heartbeat_failures,
        };
        *heartbeat = Some(tokio::spawn(task.run(self.shutdown.clone())));
        drop(heartbeat);

        tracing::info!(
            host = %self.identity.host(),
            topic = %self.identity.topic(),
            database = %self.database.display_url(),
            "Engine service started"
        );
        self.ready.send_replace(true);
        Ok(())
    }

    async fn wait(&self) -> Result<(), ServiceError> {
        let task = self.heartbeat.lock().await.take();
        match task {
            Some(task) => task.await.map_err(|e| ServiceError::Runtime {
                service: self.name(),
                message: format!("heartbeat task aborted: {e}"),
            })?,
            None => {
                self.shutdown.triggered().await;
                Ok(())
            }
        }
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        if self.shutdown.trigger() {
            tracing::info!(
                host = %self.identity.host(),
                topic = %self.identity.topic(),
                "Engine service stopped"
            );
        }
        Ok(())
    }
}

/// Periodic database liveness check.
struct Heartbeat {
    service: String,
    topic: String,
    database: Arc<DatabaseEngine>,
    period: Duration,
    max_failures: u32,
}

impl Heartbeat {
    async fn run(self, shutdown: Shutdown) -> Result<(), ServiceError> {
        tracing::debug!(
            service = %self.service,
            interval_secs = self.period.as_secs(),
            "Heartbeat task starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.period, self.period);
        let mut failures = 0_u32;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.triggered() => break,
                _ = ticker.tick() => {}
            }

            let outcome = tokio::select! {
                biased;

                _ = shutdown.triggered() => break,
                outcome = self.database.ping() => outcome,
            };

            match outcome {
                Ok(()) => {
                    if failures > 0 {
                        tracing::info!(service = %self.service, "Heartbeat recovered");
                    }
                    failures = 0;
                }
                Err(e) => {
                    failures += 1;
                    metrics::record_heartbeat_failure(&self.topic);
                    tracing::warn!(
                        service = %self.service,
                        error = %e,
                        failures,
                        "Heartbeat failed"
                    );
                    if failures >= self.max_failures {
                        return Err(ServiceError::Runtime {
                            service: self.service.clone(),
                            message: format!("{failures} consecutive heartbeat failures, last: {e}"),
                        });
                    }
                }
            }
        }

        tracing::debug!(service = %self.service, "Heartbeat task exiting");
        Ok(())
    }
}
