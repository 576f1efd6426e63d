//! Engine worker subsystem.
//!
//! # Responsibilities
//! - Bind the worker to its RPC identity `(host, topic)`
//! - Provide the supervised [`EngineService`]
//!
//! # Design Decisions
//! - The identity is fixed at construction; a different host or topic
//!   means a different worker
//! - The RPC transport lives elsewhere; this module only declares the
//!   identity and its routing key
//! - The database engine is injected, never looked up

pub mod identity;
pub mod service;

pub use identity::ServiceIdentity;
pub use service::EngineService;
