//! Demo configuration.
//!
//! Loaded from `WEFT_*` environment variables via the `config` crate. Nested
//! graph settings use `__`, e.g. `WEFT_GRAPH__SHUTDOWN_GRACE_MS=1000`.

use config::ConfigError;
use serde::Deserialize;
use std::time::Duration;
use weft_engine::GraphConfig;

/// Most generators the demo wires into the multiplier.
pub const MAX_INPUTS: usize = 16;

/// Configuration for the multiplier demo.
#[derive(Debug, Clone, Deserialize)]
pub struct MultiplierConfig {
    /// Milliseconds between generator ticks.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Number of generators feeding the multiplier.
    #[serde(default = "default_inputs")]
    pub inputs: usize,

    /// Smallest generated value, inclusive.
    #[serde(default)]
    pub min_value: i64,

    /// Largest generated value, inclusive.
    #[serde(default = "default_max_value")]
    pub max_value: i64,

    /// Engine settings.
    #[serde(default)]
    pub graph: GraphConfig,
}

fn default_interval_ms() -> u64 {
    3_000
}

fn default_inputs() -> usize {
    3
}

fn default_max_value() -> i64 {
    10
}

impl Default for MultiplierConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            inputs: default_inputs(),
            min_value: 0,
            max_value: default_max_value(),
            graph: GraphConfig::default(),
        }
    }
}

impl MultiplierConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable fails to parse or the result is
    /// out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(environment())
    }

    fn load(source: config::Environment) -> Result<Self, ConfigError> {
        let config: Self = config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::Message("interval_ms must be positive".to_string()));
        }
        if !(2..=MAX_INPUTS).contains(&self.inputs) {
            return Err(ConfigError::Message(format!(
                "inputs must be between 2 and {MAX_INPUTS}, got {}",
                self.inputs
            )));
        }
        if self.min_value > self.max_value {
            return Err(ConfigError::Message(format!(
                "min_value {} exceeds max_value {}",
                self.min_value, self.max_value
            )));
        }
        Ok(())
    }

    /// Tick interval as a `Duration`.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("WEFT")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_engine::FaultPolicy;

    fn load(vars: &[(&str, &str)]) -> Result<MultiplierConfig, ConfigError> {
        let vars: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        MultiplierConfig::load(environment().source(Some(vars)))
    }

    #[test]
    fn defaults_match_the_demo() {
        let config = load(&[]).expect("defaults load");
        assert_eq!(config.interval(), Duration::from_secs(3));
        assert_eq!(config.inputs, 3);
        assert_eq!((config.min_value, config.max_value), (0, 10));
        assert_eq!(config.graph.shutdown_grace_ms, 5_000);
    }

    #[test]
    fn reads_prefixed_and_nested_variables() {
        let config = load(&[
            ("WEFT_INTERVAL_MS", "250"),
            ("WEFT_INPUTS", "2"),
            ("WEFT_GRAPH__SHUTDOWN_GRACE_MS", "100"),
            ("WEFT_GRAPH__FAULT_POLICY", "ignore"),
        ])
        .expect("load");
        assert_eq!(config.interval_ms, 250);
        assert_eq!(config.inputs, 2);
        assert_eq!(config.graph.shutdown_grace_ms, 100);
        assert_eq!(config.graph.fault_policy, FaultPolicy::Ignore);
    }

    #[test]
    fn accepts_wide_value_ranges() {
        let config = load(&[("WEFT_MIN_VALUE", "-1000"), ("WEFT_MAX_VALUE", "1000")]).expect("load");
        assert_eq!((config.min_value, config.max_value), (-1000, 1000));
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(load(&[("WEFT_INPUTS", "1")]).is_err());
        assert!(load(&[("WEFT_INPUTS", "17")]).is_err());
        assert!(load(&[("WEFT_INTERVAL_MS", "0")]).is_err());
        assert!(load(&[("WEFT_MIN_VALUE", "5"), ("WEFT_MAX_VALUE", "4")]).is_err());
    }
}
