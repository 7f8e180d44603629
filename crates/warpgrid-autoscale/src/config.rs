//! Autoscaler configuration.
//!
//! Loaded from a TOML file:
//!
//! ```toml
//! scaling_interval = "60s"
//! scaling_threads = 3
//! worker_expiry = "60s"
//! drain_poll_interval = "1s"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use warpgrid_policy::duration::serde_str;

use crate::error::ConfigError;

/// Tuning for the autoscaling loop and its worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutoscaleConfig {
    /// Time between evaluation passes.
    #[serde(with = "serde_str")]
    pub scaling_interval: Duration,
    /// Number of concurrent scale evaluations.
    pub scaling_threads: usize,
    /// How long an idle worker lingers before it is recycled.
    #[serde(with = "serde_str")]
    pub worker_expiry: Duration,
    /// How often `stop()` re-checks whether the loop has drained.
    #[serde(with = "serde_str")]
    pub drain_poll_interval: Duration,
}

impl Default for AutoscaleConfig {
    fn default() -> Self {
        Self {
            scaling_interval: Duration::from_secs(60),
            scaling_threads: 3,
            worker_expiry: Duration::from_secs(60),
            drain_poll_interval: Duration::from_secs(1),
        }
    }
}

impl AutoscaleConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: AutoscaleConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Reject values the loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scaling_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "scaling_interval must be greater than zero".to_string(),
            ));
        }
        if self.scaling_threads == 0 {
            return Err(ConfigError::Invalid(
                "scaling_threads must be at least 1".to_string(),
            ));
        }
        if self.worker_expiry.is_zero() {
            return Err(ConfigError::Invalid(
                "worker_expiry must be greater than zero".to_string(),
            ));
        }
        if self.drain_poll_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "drain_poll_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
