//! Engine configuration
//!
//! [`EngineConfig`] carries the two guards that bound graph-level
//! non-termination:
//!
//! - `max_steps` - global cap on node executions per run (default 1000)
//! - `default_loop_iterations` - cap applied to loop edges registered without
//!   an explicit `max_iterations` (default 100)
//!
//! Configuration can be built in code, parsed from TOML, or overridden from
//! environment variables:
//!
//! ```rust
//! use flowgraph_core::EngineConfig;
//!
//! let config = EngineConfig::from_toml_str("max_steps = 50").unwrap();
//! assert_eq!(config.max_steps, 50);
//! assert_eq!(config.default_loop_iterations, 100);
//! ```
//!
//! | variable                              | field                     |
//! |---------------------------------------|---------------------------|
//! | `{PREFIX}MAX_STEPS`                   | `max_steps`               |
//! | `{PREFIX}DEFAULT_LOOP_ITERATIONS`     | `default_loop_iterations` |

use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_MAX_STEPS: usize = 1000;
pub const DEFAULT_LOOP_ITERATIONS: usize = 100;

/// Prefix used by the bundled binaries when reading overrides.
pub const ENV_PREFIX: &str = "FLOWGRAPH_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of node executions in one run
    pub max_steps: usize,

    /// Iteration cap for loop edges registered without one
    pub default_loop_iterations: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            default_loop_iterations: DEFAULT_LOOP_ITERATIONS,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_default_loop_iterations(mut self, iterations: usize) -> Self {
        self.default_loop_iterations = iterations;
        self
    }

    /// Both guards must be finite and positive.
    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            return Err(GraphError::configuration("max_steps must be greater than zero"));
        }
        if self.default_loop_iterations == 0 {
            return Err(GraphError::configuration(
                "default_loop_iterations must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Parse a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)
            .map_err(|e| GraphError::configuration(format!("invalid engine config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env(prefix: &str) -> Result<Self> {
        Self::default().apply_env(prefix)
    }

    /// Override fields from `{prefix}MAX_STEPS` and
    /// `{prefix}DEFAULT_LOOP_ITERATIONS` when they are set.
    pub fn apply_env(mut self, prefix: &str) -> Result<Self> {
        if let Some(max_steps) = env_parse(&format!("{}MAX_STEPS", prefix))? {
            self.max_steps = max_steps;
        }
        if let Some(iterations) = env_parse(&format!("{}DEFAULT_LOOP_ITERATIONS", prefix))? {
            self.default_loop_iterations = iterations;
        }
        self.validate()?;
        Ok(self)
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            GraphError::configuration(format!(
                "Failed to parse environment variable {}: {}",
                key, e
            ))
        }),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(GraphError::configuration(format!(
            "Environment variable {} contains invalid UTF-8",
            key
        ))),
    }
}
