//! RPC identity of an engine worker.

use std::fmt;

use crate::config::EngineConfig;

/// The `(host, topic)` pair a worker is addressed by.
///
/// Built once from the configuration and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceIdentity {
    host: String,
    topic: String,
}

impl ServiceIdentity {
    pub fn new(host: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            topic: topic.into(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.host.clone(), config.engine.topic.clone())
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Destination for calls directed at this host only.
    pub fn routing_key(&self) -> String {
        format!("{}.{}", self.topic, self.host)
    }
}

impl fmt::Display for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.topic, self.host)
    }
}
