//! Registry and aggregate service configuration

use safeharbor_authentication::SessionConfig;
use safeharbor_core::config::unknown_key;
use safeharbor_core::{HarborConfig, HarborError, ObjectId, Result};
use safeharbor_store::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Registry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Directory under which realm and repo artifact directories are named
    pub file_root: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            file_root: PathBuf::from("/var/lib/safeharbor"),
        }
    }
}

impl RegistryConfig {
    /// Artifact directory assigned to a new realm
    pub fn realm_directory(&self, realm_id: &ObjectId) -> PathBuf {
        self.file_root.join("realms").join(realm_id.as_str())
    }

    /// Artifact directory assigned to a new repo under `realm_directory`
    pub fn repo_directory(realm_directory: &Path, repo_id: &ObjectId) -> PathBuf {
        realm_directory.join("repos").join(repo_id.as_str())
    }
}

impl HarborConfig for RegistryConfig {
    const SECTION: &'static str = "registry";

    fn validate(&self) -> Result<()> {
        if self.file_root.as_os_str().is_empty() {
            return Err(HarborError::config("registry.file_root must be set"));
        }
        Ok(())
    }

    fn set_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "file_root" => self.file_root = PathBuf::from(value),
            _ => return Err(unknown_key(Self::SECTION, key)),
        }
        Ok(())
    }
}

/// Every section a running service needs, loaded from one TOML document
///
/// ```toml
/// [store]
/// lock_timeout_ms = 2000
///
/// [session]
/// secret_salt = "..."
///
/// [registry]
/// file_root = "/srv/safeharbor"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Object store section
    pub store: StoreConfig,
    /// Session manager section
    pub session: SessionConfig,
    /// Registry section
    pub registry: RegistryConfig,
}

impl HarborConfig for ServiceConfig {
    const SECTION: &'static str = "service";

    /// Overrides keep their per-section names, e.g. `SAFEHARBOR_STORE_LOCK_TIMEOUT_MS`
    fn merge_with_vars<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: Vec<(String, String)> = vars.into_iter().collect();
        self.store.merge_with_vars(vars.iter().cloned())?;
        self.session.merge_with_vars(vars.iter().cloned())?;
        self.registry.merge_with_vars(vars)?;
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        self.store.validate()?;
        self.session.validate()?;
        self.registry.validate()
    }

    /// Keys are qualified by section: `store.lock_timeout_ms`
    fn set_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        match key.split_once('.') {
            Some((StoreConfig::SECTION, rest)) => self.store.set_from_string(rest, value),
            Some((SessionConfig::SECTION, rest)) => self.session.set_from_string(rest, value),
            Some((RegistryConfig::SECTION, rest)) => self.registry.set_from_string(rest, value),
            _ => Err(unknown_key(Self::SECTION, key)),
        }
    }
}
