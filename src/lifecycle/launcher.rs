//! Service supervision.
//!
//! # State Machine
//! ```text
//! Idle ──launch──▶ Running ──shutdown token / any service exit──▶ Stopping
//!                                                                    │
//!                        every service stopped and reaped            ▼
//!                                                                 Stopped
//! ```
//!
//! # Design Decisions
//! - Each service runs on its own task: `start`, then `wait`
//! - Stop is requested through a per-service [`Shutdown`]; the service task
//!   calls `stop` exactly once and keeps awaiting the same `wait`
//! - Fail fast: the first exit of any service stops all siblings
//! - First error wins; it is returned only after every service is reaped
//! - Panics inside a service are caught and reported as errors

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::lifecycle::service::{Service, ServiceError, ServiceHandle, ServiceStatus};
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics;

/// Supervisor lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LauncherState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for LauncherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LauncherState::Idle => "idle",
            LauncherState::Running => "running",
            LauncherState::Stopping => "stopping",
            LauncherState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("launcher is {state}; cannot supervise service {service}")]
    Stopped {
        service: String,
        state: LauncherState,
    },
}

/// One registered service, as seen by the launcher.
struct Supervised {
    name: String,
    stop: Shutdown,
    task: Option<JoinHandle<()>>,
    exited: bool,
}

/// Final report from a service task.
struct Exit {
    index: usize,
    outcome: Result<(), ServiceError>,
}

/// Starts services and coordinates their shutdown.
pub struct Launcher {
    state: LauncherState,
    services: Vec<Supervised>,
    exits_tx: mpsc::UnboundedSender<Exit>,
    exits_rx: mpsc::UnboundedReceiver<Exit>,
}

impl Launcher {
    pub fn new() -> Self {
        let (exits_tx, exits_rx) = mpsc::unbounded_channel();
        Self {
            state: LauncherState::Idle,
            services: Vec::new(),
            exits_tx,
            exits_rx,
        }
    }

    pub fn state(&self) -> LauncherState {
        self.state
    }

    /// Number of registered services, including ones that already exited.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Register `service` and start it on its own task.
    ///
    /// Must be called from within a tokio runtime. The service is owned by
    /// the launcher from here on; the returned handle only observes it.
    pub fn launch(&mut self, service: Arc<dyn Service>) -> Result<ServiceHandle, LaunchError> {
        let name = service.name();
        if matches!(self.state, LauncherState::Stopping | LauncherState::Stopped) {
            return Err(LaunchError::Stopped {
                service: name,
                state: self.state,
            });
        }

        let index = self.services.len();
        let stop = Shutdown::new();
        let (status_tx, status_rx) = watch::channel(ServiceStatus::Starting);

        let task = tokio::spawn(supervise(
            index,
            service,
            stop.clone(),
            status_tx,
            self.exits_tx.clone(),
        ));

        self.services.push(Supervised {
            name: name.clone(),
            stop,
            task: Some(task),
            exited: false,
        });
        tracing::debug!(service = %name, "Service launched");

        if self.state == LauncherState::Idle {
            self.set_state(LauncherState::Running);
        }
        metrics::record_running_services(self.running());

        Ok(ServiceHandle::new(name, status_rx))
    }

    /// Block until `shutdown` fires or any service exits, then stop every
    /// service still running and wait for all of them.
    ///
    /// Returns the first service error, if any, after all services are reaped.
    pub async fn wait(&mut self, shutdown: &Shutdown) -> Result<(), ServiceError> {
        match self.state {
            LauncherState::Idle => {
                tracing::info!("No services registered; nothing to supervise");
                self.set_state(LauncherState::Stopped);
                return Ok(());
            }
            LauncherState::Stopped => return Ok(()),
            LauncherState::Running | LauncherState::Stopping => {}
        }

        let mut first_error = None;

        let exit = tokio::select! {
            _ = shutdown.triggered() => {
                tracing::info!("Termination requested, stopping services");
                None
            }
            exit = self.exits_rx.recv() => exit,
        };
        if let Some(exit) = exit {
            tracing::info!(
                service = %self.services[exit.index].name,
                "Service exited, stopping remaining services"
            );
            self.reap(exit, &mut first_error);
        }

        self.set_state(LauncherState::Stopping);
        for service in self.services.iter().filter(|service| !service.exited) {
            tracing::debug!(service = %service.name, "Requesting service stop");
            service.stop.trigger();
        }

        while self.running() > 0 {
            match self.exits_rx.recv().await {
                Some(exit) => self.reap(exit, &mut first_error),
                None => break,
            }
        }

        for service in &mut self.services {
            if let Some(task) = service.task.take() {
                if let Err(e) = task.await {
                    tracing::error!(service = %service.name, error = %e, "Service task aborted");
                }
            }
        }

        self.set_state(LauncherState::Stopped);
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn running(&self) -> usize {
        self.services.iter().filter(|service| !service.exited).count()
    }

    fn reap(&mut self, exit: Exit, first_error: &mut Option<ServiceError>) {
        if let Some(service) = self.services.get_mut(exit.index) {
            service.exited = true;
        }
        if let Err(error) = exit.outcome {
            // The first error is reported by the caller; later ones only here.
            match first_error {
                None => *first_error = Some(error),
                Some(_) => tracing::warn!(
                    service = %error.service(),
                    error = %error,
                    "Additional service failure"
                ),
            }
        }
        metrics::record_running_services(self.running());
    }

    fn set_state(&mut self, next: LauncherState) {
        tracing::debug!(from = %self.state, to = %next, "Launcher state changed");
        self.state = next;
    }
}

impl Default for Launcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Body of one service task.
async fn supervise(
    index: usize,
    service: Arc<dyn Service>,
    stop: Shutdown,
    status: watch::Sender<ServiceStatus>,
    exits: mpsc::UnboundedSender<Exit>,
) {
    let name = service.name();
    let outcome = AssertUnwindSafe(run_service(service.as_ref(), &name, &stop, &status))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            Err(ServiceError::Panicked {
                service: name.clone(),
                message: panic_message(panic.as_ref()),
            })
        });

    match &outcome {
        Ok(()) => {
            tracing::debug!(service = %name, "Service stopped");
            metrics::record_service_stopped(&name);
            status.send_replace(ServiceStatus::Stopped);
        }
        Err(error) => {
            tracing::debug!(service = %name, error = %error, "Service terminated with error");
            metrics::record_service_failed(&name, error.kind());
            status.send_replace(ServiceStatus::Failed(error.clone()));
        }
    }

    // The launcher holds the receiver for its whole life.
    let _ = exits.send(Exit { index, outcome });
}

async fn run_service(
    service: &dyn Service,
    name: &str,
    stop: &Shutdown,
    status: &watch::Sender<ServiceStatus>,
) -> Result<(), ServiceError> {
    service.start().await?;
    status.send_replace(ServiceStatus::Running);
    metrics::record_service_started(name);
    tracing::debug!(service = %name, "Service running");

    let wait = service.wait();
    tokio::pin!(wait);

    tokio::select! {
        result = &mut wait => result,
        _ = stop.triggered() => {
            status.send_replace(ServiceStatus::Stopping);
            let stopped = service.stop().await;
            let finished = wait.await;
            stopped.and(finished)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
