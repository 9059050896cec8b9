//! Configuration for the coordinator reconciliation engine

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Default cap on concurrently in-flight replica operations per tier,
    /// applied to both creations and destructions unless overridden
    #[serde(default = "default_throttle_limit")]
    pub replication_throttle_limit: usize,

    /// Per-tier overrides for the creation-side cap
    #[serde(default)]
    pub tier_creation_limits: HashMap<String, usize>,

    /// Per-tier overrides for the destruction-side cap
    #[serde(default)]
    pub tier_destruction_limits: HashMap<String, usize>,

    /// Upper bound on holders tracked per tier registry. Only matters at
    /// extreme scale; overflow evicts the most-loaded holder.
    #[serde(default = "default_registry_capacity")]
    pub tier_registry_capacity: usize,

    /// How long a segment must be marked for removal before the drop phase
    /// is allowed to act on it
    #[serde(default = "default_deletion_wait_ms")]
    pub millis_to_wait_before_deleting: u64,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_throttle_limit() -> usize {
    10
}
fn default_registry_capacity() -> usize {
    10_000
}
fn default_deletion_wait_ms() -> u64 {
    15 * 60 * 1000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            replication_throttle_limit: default_throttle_limit(),
            tier_creation_limits: HashMap::new(),
            tier_destruction_limits: HashMap::new(),
            tier_registry_capacity: default_registry_capacity(),
            millis_to_wait_before_deleting: default_deletion_wait_ms(),
            log_level: default_log_level(),
        }
    }
}

impl CoordinatorConfig {
    /// Load from a TOML file, with `MINICOORD_`-prefixed environment
    /// variables taking precedence over file values.
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix("MINICOORD"))
            .build()?;

        let cfg: CoordinatorConfig = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.replication_throttle_limit == 0 {
            return Err(crate::Error::InvalidConfig(
                "replication_throttle_limit must be at least 1".into(),
            ));
        }
        if self.tier_registry_capacity == 0 {
            return Err(crate::Error::InvalidConfig(
                "tier_registry_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Creation-side cap for `tier`
    pub fn creation_limit(&self, tier: &str) -> usize {
        *self
            .tier_creation_limits
            .get(tier)
            .unwrap_or(&self.replication_throttle_limit)
    }

    /// Destruction-side cap for `tier`
    pub fn destruction_limit(&self, tier: &str) -> usize {
        *self
            .tier_destruction_limits
            .get(tier)
            .unwrap_or(&self.replication_throttle_limit)
    }

    /// Deletion debounce as a [`Duration`]
    pub fn deletion_wait(&self) -> Duration {
        Duration::from_millis(self.millis_to_wait_before_deleting)
    }
}
