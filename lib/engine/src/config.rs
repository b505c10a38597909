//! Graph configuration.
//!
//! Embedders usually compose `GraphConfig` into their own configuration
//! struct and load it with the `config` crate; every field has a default.

use serde::Deserialize;
use std::time::Duration;

/// What a node does when its activation hook returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Log the fault, end that node's worker, and mark it `Failed`.
    #[default]
    Isolate,
    /// Log the fault and keep the node running.
    Ignore,
}

/// Engine settings for one graph.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    /// How long `stop()` waits for all workers to exit, in milliseconds.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    /// Fault handling for activation hooks.
    #[serde(default)]
    pub fault_policy: FaultPolicy,
}

fn default_shutdown_grace_ms() -> u64 {
    5_000
}

impl GraphConfig {
    /// The shutdown grace period as a `Duration`.
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_ms: default_shutdown_grace_ms(),
            fault_policy: FaultPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = GraphConfig::default();
        assert_eq!(config.shutdown_grace(), Duration::from_secs(5));
        assert_eq!(config.fault_policy, FaultPolicy::Isolate);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: GraphConfig =
            serde_json::from_str(r#"{ "fault_policy": "ignore" }"#).expect("deserialize");
        assert_eq!(config.fault_policy, FaultPolicy::Ignore);
        assert_eq!(config.shutdown_grace_ms, 5_000);
    }
}
