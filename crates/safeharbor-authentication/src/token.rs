//! Values exchanged with callers during login

use safeharbor_core::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

/// Login name and password, consumed during authentication and never stored
pub struct Credentials {
    /// External login name
    pub login_id: String,
    password: Zeroizing<String>,
}

impl Credentials {
    /// Wrap a login attempt
    pub fn new(login_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login_id: login_id.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    /// The cleartext password
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login_id", &self.login_id)
            .finish_non_exhaustive()
    }
}

/// Result of a successful login, presented on later requests by its id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionToken {
    /// `<nonce>:<hex(salted_hash(nonce))>`
    pub session_id: String,
    /// The logged-in user
    pub authenticated_user_id: ObjectId,
    /// The user's realm
    pub realm_id: ObjectId,
    /// Whether the user administers that realm
    pub is_admin_user: bool,
}
