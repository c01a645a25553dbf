//! Object store configuration

use safeharbor_core::config::{parse_value, require_positive, unknown_key};
use safeharbor_core::{HarborConfig, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Object store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// How long a mutation waits for a contended object lock
    pub lock_timeout_ms: u64,
    /// First id the generator mints
    pub id_seed: u64,
}

impl StoreConfig {
    /// Lock timeout as a duration
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5_000,
            id_seed: 1,
        }
    }
}

impl HarborConfig for StoreConfig {
    const SECTION: &'static str = "store";

    fn validate(&self) -> Result<()> {
        require_positive("store.lock_timeout_ms", self.lock_timeout_ms)
    }

    fn set_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "lock_timeout_ms" => self.lock_timeout_ms = parse_value(key, value)?,
            "id_seed" => self.id_seed = parse_value(key, value)?,
            _ => return Err(unknown_key(Self::SECTION, key)),
        }
        Ok(())
    }
}
