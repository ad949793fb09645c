//! Service configuration
//!
//! ```toml
//! run_timeout_ms = 5000
//!
//! [engine]
//! max_steps = 500
//! default_loop_iterations = 10
//! ```
//!
//! Environment overrides use the same prefix as the engine
//! (`FLOWGRAPH_RUN_TIMEOUT_MS`, `FLOWGRAPH_MAX_STEPS`, ...).

use crate::error::{Result, ServiceError};
use flowgraph_core::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Guards for graphs built for this service. `max_steps` is also the
    /// ceiling enforced when a graph is registered.
    pub engine: EngineConfig,

    /// Wall-clock budget for a single run; unbounded when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_timeout_ms: Option<u64>,
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        if self.run_timeout_ms == Some(0) {
            return Err(ServiceError::Configuration(
                "run_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input).map_err(|e| {
            ServiceError::Configuration(format!("invalid service config: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ServiceError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Apply `{prefix}RUN_TIMEOUT_MS` and the engine overrides.
    pub fn apply_env(mut self, prefix: &str) -> Result<Self> {
        self.engine = self.engine.apply_env(prefix)?;

        let key = format!("{}RUN_TIMEOUT_MS", prefix);
        if let Ok(raw) = std::env::var(&key) {
            let timeout = raw.trim().parse::<u64>().map_err(|e| {
                ServiceError::Configuration(format!(
                    "Failed to parse environment variable {}: {}",
                    key, e
                ))
            })?;
            self.run_timeout_ms = Some(timeout);
        }

        self.validate()?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_unbounded() {
        let config = ServiceConfig::default();
        assert_eq!(config.run_timeout(), None);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_from_toml() {
        let config = ServiceConfig::from_toml_str(
            "run_timeout_ms = 1500\n[engine]\nmax_steps = 40\n",
        )
        .unwrap();
        assert_eq!(config.run_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.engine.max_steps, 40);
        assert_eq!(config.engine.default_loop_iterations, 100);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(matches!(
            ServiceConfig::from_toml_str("run_timeout_ms = 0"),
            Err(ServiceError::Configuration(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let prefix = "FLOWGRAPH_TEST_SERVICE_ENV_";
        std::env::set_var(format!("{}RUN_TIMEOUT_MS", prefix), "750");
        std::env::set_var(format!("{}MAX_STEPS", prefix), "9");

        let config = ServiceConfig::default().apply_env(prefix).unwrap();
        assert_eq!(config.run_timeout_ms, Some(750));
        assert_eq!(config.engine.max_steps, 9);

        std::env::remove_var(format!("{}RUN_TIMEOUT_MS", prefix));
        std::env::remove_var(format!("{}MAX_STEPS", prefix));
    }
}
