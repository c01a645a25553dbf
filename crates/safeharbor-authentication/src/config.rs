//! Session and credential configuration

use safeharbor_core::config::{parse_value, require_positive, unknown_key};
use safeharbor_core::{DigestScheme, HarborConfig, HarborError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Settings for the session manager, password hashing and email tokens
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Server-wide secret keying every salted hash; must be set
    pub secret_salt: String,
    /// Digest scheme for session ids, password hashes and email tokens
    pub digest: DigestScheme,
    /// Login attempts retained per user for throttling
    pub max_login_attempts: usize,
    /// Window in which `max_login_attempts` attempts trigger the throttle
    pub login_window_secs: u64,
    /// Lifetime of a session, matching the cookie's Max-Age
    pub session_max_age_secs: u64,
    /// Lifetime of an email verification token
    pub email_token_ttl_secs: u64,
}

impl SessionConfig {
    /// Defaults with the given secret salt
    pub fn with_salt(secret_salt: impl Into<String>) -> Self {
        Self {
            secret_salt: secret_salt.into(),
            ..Self::default()
        }
    }

    /// Throttle window as a duration
    pub fn login_window(&self) -> Duration {
        Duration::from_secs(self.login_window_secs)
    }

    /// Session lifetime as a duration
    pub fn session_max_age(&self) -> Duration {
        Duration::from_secs(self.session_max_age_secs)
    }

    /// Email token lifetime as a duration
    pub fn email_token_ttl(&self) -> Duration {
        Duration::from_secs(self.email_token_ttl_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret_salt: String::new(),
            digest: DigestScheme::SaltedSha256,
            max_login_attempts: 5,
            login_window_secs: 600,
            session_max_age_secs: 86_400,
            email_token_ttl_secs: 72 * 3_600,
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret_salt", &"<redacted>")
            .field("digest", &self.digest)
            .field("max_login_attempts", &self.max_login_attempts)
            .field("login_window_secs", &self.login_window_secs)
            .field("session_max_age_secs", &self.session_max_age_secs)
            .field("email_token_ttl_secs", &self.email_token_ttl_secs)
            .finish()
    }
}

impl HarborConfig for SessionConfig {
    const SECTION: &'static str = "session";

    fn validate(&self) -> Result<()> {
        if self.secret_salt.is_empty() {
            return Err(HarborError::config("session.secret_salt must be set"));
        }
        if self.max_login_attempts == 0 {
            return Err(HarborError::config(
                "session.max_login_attempts must be positive",
            ));
        }
        require_positive("session.login_window_secs", self.login_window_secs)?;
        require_positive("session.session_max_age_secs", self.session_max_age_secs)?;
        require_positive("session.email_token_ttl_secs", self.email_token_ttl_secs)
    }

    fn set_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "secret_salt" => self.secret_salt = value.to_string(),
            "digest" => {
                self.digest = match value {
                    "salted_sha256" => DigestScheme::SaltedSha256,
                    "hmac_sha256" => DigestScheme::HmacSha256,
                    other => {
                        return Err(HarborError::config(format!(
                            "unknown digest scheme {other:?}"
                        )))
                    }
                }
            }
            "max_login_attempts" => self.max_login_attempts = parse_value(key, value)?,
            "login_window_secs" => self.login_window_secs = parse_value(key, value)?,
            "session_max_age_secs" => self.session_max_age_secs = parse_value(key, value)?,
            "email_token_ttl_secs" => self.email_token_ttl_secs = parse_value(key, value)?,
            _ => return Err(unknown_key(Self::SECTION, key)),
        }
        Ok(())
    }
}
