//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use heat_engine::lifecycle::{Service, ServiceError, Shutdown};

/// How a [`RecordingService`] behaves once launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Runs until stopped.
    RunUntilStopped,
    /// `start` returns an error.
    FailStart,
    /// Starts, then `wait` returns an error without being stopped.
    FailWhileRunning,
    /// Starts, then `wait` returns `Ok` on its own.
    ExitCleanly,
    /// `start` panics.
    PanicOnStart,
    /// Runs until stopped, but `stop` reports an error.
    FailStop,
}

/// Test double that counts lifecycle calls.
pub struct RecordingService {
    name: String,
    behavior: Behavior,
    done: Shutdown,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl RecordingService {
    pub fn new(name: &str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            behavior,
            done: Shutdown::new(),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        })
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Service for RecordingService {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn start(&self) -> Result<(), ServiceError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::FailStart => Err(ServiceError::Start {
                service: self.name.clone(),
                message: "refused to start".to_string(),
            }),
            Behavior::PanicOnStart => panic!("{} exploded", self.name),
            _ => Ok(()),
        }
    }

    async fn wait(&self) -> Result<(), ServiceError> {
        match self.behavior {
            Behavior::FailWhileRunning => {
                tokio::task::yield_now().await;
                Err(ServiceError::Runtime {
                    service: self.name.clone(),
                    message: "lost its footing".to_string(),
                })
            }
            Behavior::ExitCleanly => {
                tokio::task::yield_now().await;
                Ok(())
            }
            _ => {
                self.done.triggered().await;
                Ok(())
            }
        }
    }

    async fn stop(&self) -> Result<(), ServiceError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.done.trigger();
        match self.behavior {
            Behavior::FailStop => Err(ServiceError::Stop {
                service: self.name.clone(),
                message: "left resources behind".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// Write `contents` to `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}
