//! Inputs to the lifecycle operations

use safeharbor_core::{HarborError, ObjectId, Result};
use std::fmt;
use zeroize::Zeroizing;

fn require_name(what: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(HarborError::invalid(format!("{what} name must not be empty")));
    }
    Ok(())
}

/// A user to create
#[derive(Clone)]
pub struct NewUser {
    /// Globally unique login name
    pub login_name: String,
    /// Display name
    pub name: String,
    /// Contact address
    pub email_address: String,
    password: Zeroizing<String>,
}

impl NewUser {
    /// User with a display name equal to the login name
    pub fn new(login_name: impl Into<String>, password: impl Into<String>) -> Self {
        let login_name = login_name.into();
        Self {
            name: login_name.clone(),
            login_name,
            email_address: String::new(),
            password: Zeroizing::new(password.into()),
        }
    }

    /// Set the display name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the contact address
    pub fn email(mut self, email_address: impl Into<String>) -> Self {
        self.email_address = email_address.into();
        self
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    pub(crate) fn validate(&self) -> Result<()> {
        require_name("login", &self.login_name)?;
        if self.password.is_empty() {
            return Err(HarborError::invalid("password must not be empty"));
        }
        Ok(())
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("login_name", &self.login_name)
            .field("name", &self.name)
            .field("email_address", &self.email_address)
            .finish_non_exhaustive()
    }
}

/// A realm to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRealm {
    /// Globally unique realm name
    pub name: String,
    /// Free text
    pub description: String,
    /// Legal name of the organization
    pub org_full_name: String,
}

impl NewRealm {
    /// Realm whose organization name defaults to its name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            org_full_name: name.clone(),
            name,
            description: String::new(),
        }
    }

    /// Set the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the organization name
    pub fn org_full_name(mut self, org_full_name: impl Into<String>) -> Self {
        self.org_full_name = org_full_name.into();
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        require_name("realm", &self.name)
    }
}

/// Common fields of a repo or leaf resource to create
///
/// When an owner is named, the owner is granted the full mask on the new
/// resource in the same transaction that creates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResource {
    /// Resource name
    pub name: String,
    /// Free text
    pub description: String,
    /// Party granted full access on creation
    pub owner: Option<ObjectId>,
}

impl NewResource {
    /// Unowned resource with an empty description
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            owner: None,
        }
    }

    /// Set the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Grant `party_id` the full mask on the new resource
    pub fn owned_by(mut self, party_id: &ObjectId) -> Self {
        self.owner = Some(party_id.clone());
        self
    }

    pub(crate) fn validate(&self, what: &str) -> Result<()> {
        require_name(what, &self.name)
    }
}

/// A scan config to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScanConfig {
    /// Name, description and owner
    pub resource: NewResource,
    /// Scanner the config runs
    pub provider_name: String,
    /// Expression evaluated over scan results
    pub success_expression: String,
    /// Flag shown when the expression holds
    pub flag_id: Option<ObjectId>,
    /// Provider parameters as `(name, value)` pairs
    pub parameters: Vec<(String, String)>,
}

impl NewScanConfig {
    /// Config running `provider_name` with no parameters and no flag
    pub fn new(resource: NewResource, provider_name: impl Into<String>) -> Self {
        Self {
            resource,
            provider_name: provider_name.into(),
            success_expression: String::new(),
            flag_id: None,
            parameters: Vec::new(),
        }
    }

    /// Set the success expression
    pub fn success_expression(mut self, expression: impl Into<String>) -> Self {
        self.success_expression = expression.into();
        self
    }

    /// Attach a flag
    pub fn flag(mut self, flag_id: &ObjectId) -> Self {
        self.flag_id = Some(flag_id.clone());
        self
    }

    /// Add a provider parameter
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }
}

/// Changes to apply to a scan config; unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanConfigPatch {
    pub(crate) name: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) provider_name: Option<String>,
    pub(crate) success_expression: Option<String>,
    pub(crate) parameters: Option<Vec<(String, String)>>,
    pub(crate) flag_id: Option<Option<ObjectId>>,
}

impl ScanConfigPatch {
    /// Empty patch
    pub fn new() -> Self {
        Self::default()
    }

    /// Rename
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replace the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Switch scanner
    pub fn provider_name(mut self, provider_name: impl Into<String>) -> Self {
        self.provider_name = Some(provider_name.into());
        self
    }

    /// Replace the success expression
    pub fn success_expression(mut self, expression: impl Into<String>) -> Self {
        self.success_expression = Some(expression.into());
        self
    }

    /// Replace every parameter
    pub fn parameters(mut self, parameters: Vec<(String, String)>) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Attach a different flag, or detach with `None`
    pub fn flag(mut self, flag_id: Option<&ObjectId>) -> Self {
        self.flag_id = Some(flag_id.cloned());
        self
    }

    /// Whether applying the patch would change nothing
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_debug_hides_password() {
        let user = NewUser::new("alice", "hunter2").email("alice@acme.test");
        let rendered = format!("{user:?}");
        assert!(rendered.contains("alice@acme.test"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn blank_names_are_invalid() {
        assert!(NewUser::new(" ", "pw").validate().is_err());
        assert!(NewUser::new("bob", "").validate().is_err());
        assert!(NewRealm::new("").validate().is_err());
        assert!(NewResource::named("webapp").validate("repo").is_ok());
    }

    #[test]
    fn patch_tracks_set_fields() {
        assert!(ScanConfigPatch::new().is_empty());
        let patch = ScanConfigPatch::new().flag(None);
        assert!(!patch.is_empty());
        assert_eq!(patch.flag_id, Some(None));
    }
}
