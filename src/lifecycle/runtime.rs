//! Cooperative runtime installation.
//!
//! # Responsibilities
//! - Build the single-threaded tokio runtime every component runs on
//! - Hand out the same runtime to repeated callers
//!
//! # Design Decisions
//! - Explicit call from `main`, made before anything opens a socket, file or
//!   database handle; nothing installs it as a side effect
//! - `current_thread` flavour: tasks interleave only at `.await` points
//! - Escape hatches that do use extra OS threads: `spawn_blocking`, the
//!   non-blocking log file writer and the sqlite driver's connection workers
//! - Library code and tests never call this; `#[tokio::test]` provides its
//!   own current-thread runtime

use std::io;
use std::sync::OnceLock;

use thiserror::Error;
use tokio::runtime::{Builder, Runtime};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to build the async runtime: {0}")]
    Build(#[source] io::Error),
}

/// Install the process runtime, or return the one already installed.
pub fn install() -> Result<&'static Runtime, RuntimeError> {
    if let Some(runtime) = RUNTIME.get() {
        return Ok(runtime);
    }

    let runtime = Builder::new_current_thread()
        .enable_all()
        .thread_name("heat-engine")
        .build()
        .map_err(RuntimeError::Build)?;

    // A concurrent first call may have won the race; its runtime is kept and
    // ours is dropped.
    Ok(RUNTIME.get_or_init(|| runtime))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_is_idempotent() {
        let first = install().unwrap();
        let second = install().unwrap();
        assert!(std::ptr::eq(first, second));

        let answer = first.block_on(async { 40 + 2 });
        assert_eq!(answer, 42);
    }
}
