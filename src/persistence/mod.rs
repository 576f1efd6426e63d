//! Persistence subsystem.
//!
//! # Responsibilities
//! - Establish the shared database engine (connection pool) from config
//! - Keep exactly one live engine reachable, closing replaced ones
//! - Close the engine on shutdown and on failed startups
//!
//! # Design Decisions
//! - The engine is an explicitly owned handle ([`Persistence`]) injected into
//!   the worker, never a hidden global, so tests can supply their own
//! - sqlx `Any` driver: the URL scheme selects sqlite or postgres
//! - Settings equality makes repeated `configure` calls idempotent

pub mod engine;

pub use engine::{DatabaseEngine, Persistence, PersistenceInitError};
