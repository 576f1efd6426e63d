//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (lifecycle counters and gauges)
//!
//! Consumers:
//!     → Log sinks (stdout, stderr, file)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields (host, topic, service) on every lifecycle event
//! - Logging is configured once the configuration is loaded, before any
//!   other component runs
//! - Metrics are cheap (atomic increments) and optional to expose

pub mod logging;
pub mod metrics;
