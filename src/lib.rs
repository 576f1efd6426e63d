//! Orchestration engine worker bootstrap.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌────────────────────────────────────────────────────┐
//!                     │                    heat-engine                      │
//!                     │                                                     │
//!   argv / env /      │  ┌──────────┐   ┌───────────────┐   ┌────────────┐  │
//!   *.toml files ─────┼─▶│  config  │──▶│ observability │──▶│persistence │  │
//!                     │  │  loader  │   │ logging/metric│   │  engine    │  │
//!                     │  └──────────┘   └───────────────┘   └─────┬──────┘  │
//!                     │                                           │         │
//!                     │                                           ▼         │
//!   SIGINT/SIGTERM    │  ┌──────────┐   ┌───────────────┐   ┌────────────┐  │
//!   ──────────────────┼─▶│ shutdown │──▶│   launcher    │──▶│   engine   │  │
//!                     │  │  token   │   │ (supervisor)  │   │  service   │  │
//!                     │  └──────────┘   └───────────────┘   └────────────┘  │
//!                     │                                                     │
//!                     │            single-threaded tokio runtime            │
//!                     └────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod engine;
pub mod lifecycle;
pub mod observability;
pub mod persistence;

pub use config::schema::EngineConfig;
pub use engine::{EngineService, ServiceIdentity};
pub use lifecycle::{Bootstrap, Launcher, Service, Shutdown, StartupError};
pub use persistence::Persistence;
