//! Service contract and per-service handles.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

/// Errors a supervised service can end with.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("service {service} failed to start: {message}")]
    Start { service: String, message: String },

    #[error("service {service} failed while running: {message}")]
    Runtime { service: String, message: String },

    #[error("service {service} failed to stop: {message}")]
    Stop { service: String, message: String },

    #[error("service {service} panicked: {message}")]
    Panicked { service: String, message: String },
}

impl ServiceError {
    /// Name of the service that raised the error.
    pub fn service(&self) -> &str {
        match self {
            ServiceError::Start { service, .. }
            | ServiceError::Runtime { service, .. }
            | ServiceError::Stop { service, .. }
            | ServiceError::Panicked { service, .. } => service,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Start { .. } => "start",
            ServiceError::Runtime { .. } => "runtime",
            ServiceError::Stop { .. } => "stop",
            ServiceError::Panicked { .. } => "panic",
        }
    }
}

/// A long-running unit of work the launcher can supervise.
///
/// The launcher calls `start` once, then `wait`; if it decides to shut the
/// service down it calls `stop` once and keeps awaiting the same `wait`.
/// `wait` resolving means the service has finished.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Name used in logs and errors.
    fn name(&self) -> String;

    /// Bring the service up. An error here is a start failure.
    async fn start(&self) -> Result<(), ServiceError>;

    /// Resolve once the service has finished, either on its own or after `stop`.
    async fn wait(&self) -> Result<(), ServiceError>;

    /// Ask the service to finish. Must be idempotent: stopping a stopped
    /// service is a no-op.
    async fn stop(&self) -> Result<(), ServiceError>;
}

/// Lifecycle status of one supervised service.
#[derive(Debug, Clone)]
pub enum ServiceStatus {
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed(ServiceError),
}

impl ServiceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServiceStatus::Stopped | ServiceStatus::Failed(_))
    }
}

/// Read-only view of one service registered with a launcher.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    name: String,
    status: watch::Receiver<ServiceStatus>,
}

impl ServiceHandle {
    pub(crate) fn new(name: String, status: watch::Receiver<ServiceStatus>) -> Self {
        Self { name, status }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current status snapshot.
    pub fn status(&self) -> ServiceStatus {
        self.status.borrow().clone()
    }

    /// Resolve once the service has finished `start`. Returns `false` if it
    /// terminated without ever running.
    pub async fn ready(&mut self) -> bool {
        match self
            .status
            .wait_for(|status| !matches!(status, ServiceStatus::Starting))
            .await
        {
            Ok(status) => !matches!(*status, ServiceStatus::Failed(_)),
            Err(_) => false,
        }
    }

    /// Resolve once the service has terminated, with its outcome.
    pub async fn wait(&mut self) -> Result<(), ServiceError> {
        let outcome = self
            .status
            .wait_for(ServiceStatus::is_terminal)
            .await
            .map(|status| status.clone());
        let status = match outcome {
            Ok(status) => status,
            // Supervisor task is gone; whatever it published last is final.
            Err(_) => self.status.borrow().clone(),
        };
        match status {
            ServiceStatus::Failed(error) => Err(error),
            _ => Ok(()),
        }
    }
}
