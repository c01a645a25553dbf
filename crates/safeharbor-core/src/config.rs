//! Core configuration trait for SafeHarbor services
//!
//! Each crate owns a configuration struct for its own concern (store locking,
//! session hashing, registry file roots). They share one loading discipline:
//! defaults, then a TOML file, then `SAFEHARBOR_*` environment overrides, then
//! validation.

use crate::{HarborError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::str::FromStr;

/// Prefix shared by every environment override
pub const ENV_PREFIX: &str = "SAFEHARBOR_";

/// Core trait for SafeHarbor configuration types
pub trait HarborConfig: Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Section name, used as the second component of environment keys
    /// (`SAFEHARBOR_<SECTION>_<KEY>`)
    const SECTION: &'static str;

    /// Get default configuration values
    fn defaults() -> Self {
        Self::default()
    }

    /// Parse a TOML document and validate it
    fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HarborError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply `SAFEHARBOR_<SECTION>_<KEY>` overrides from the process environment
    fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply overrides from an explicit list of `(name, value)` pairs
    ///
    /// Names outside this section are ignored.
    fn merge_with_vars<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix = format!("{ENV_PREFIX}{}_", Self::SECTION.to_uppercase());
        for (name, value) in vars {
            if let Some(key) = name.strip_prefix(&prefix) {
                self.set_from_string(&key.to_lowercase(), &value)?;
            }
        }
        self.validate()
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()>;

    /// Set a configuration value from a string
    fn set_from_string(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Parse an override value, naming the key in the error
pub fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| HarborError::config(format!("invalid value {value:?} for {key}: {e}")))
}

/// Error for an override naming a key the section does not have
pub fn unknown_key(section: &str, key: &str) -> HarborError {
    HarborError::config(format!("unknown {section} configuration key {key:?}"))
}

/// Reject zero for a field that must be positive
pub fn require_positive(field: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(HarborError::config(format!("{field} must be greater than zero")));
    }
    Ok(())
}
