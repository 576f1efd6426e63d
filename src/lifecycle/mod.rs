//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Runtime (runtime.rs):
//!     main → install single-threaded cooperative runtime (once)
//!
//! Startup (startup.rs):
//!     Load config → Logging → Metrics → Persistence → Build worker → Launch
//!
//! Supervision (launcher.rs, service.rs):
//!     launch → start → wait ─┬─ shutdown token fires ─┐
//!                            └─ any service exits ────┴→ stop all → reap → Stopped
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger shutdown token (shutdown.rs)
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then logging, then persistence, then services
//! - Ordered shutdown: stop services, reap them, close the database, flush logs
//! - The launcher only knows the shutdown token, never OS signals

pub mod launcher;
pub mod runtime;
pub mod service;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use launcher::{LaunchError, Launcher, LauncherState};
pub use service::{Service, ServiceError, ServiceHandle, ServiceStatus};
pub use shutdown::Shutdown;
pub use startup::{Bootstrap, StartupError, PROCESS_NAME, PROJECT_NAME};
