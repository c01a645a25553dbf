//! Unified error system for SafeHarbor
//!
//! Every crate in the workspace returns [`HarborError`]. The variants map onto
//! the error kinds callers need to tell apart when rendering a response:
//! caller mistakes (`Invalid`, `NotFound`, `AlreadyExists`), access failures
//! (`Unauthorized`, `Forbidden`), integrity refusals (`Conflict`), contention
//! (`LockTimeout`) and system faults (`Internal`).

use serde::{Deserialize, Serialize};

/// Unified error type for all SafeHarbor operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum HarborError {
    /// Malformed input, e.g. a permission mask naming several actions
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Referenced id does not resolve to an entity of the expected kind
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// A create operation violates a uniqueness rule
    #[error("Already exists: {message}")]
    AlreadyExists {
        /// Error message naming the duplicate
        message: String,
    },

    /// Session token failed the integrity or liveness gate, or login failed
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Error message describing the authentication failure
        message: String,
    },

    /// The authorization engine denied the requested capability
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Error message describing the denied capability
        message: String,
    },

    /// Operation would break referential integrity
    #[error("Conflict: {message}")]
    Conflict {
        /// Error message describing the conflicting reference
        message: String,
    },

    /// A per-object lock could not be acquired in time
    #[error("Lock timeout: {message}")]
    LockTimeout {
        /// Error message naming the contended object
        message: String,
    },

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },

    /// Invariant violated by the system itself
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the broken invariant
        message: String,
    },
}

impl HarborError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an already-exists error
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::AlreadyExists {
            message: message.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a forbidden error
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Create a referential-integrity conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a lock timeout error
    pub fn lock_timeout(message: impl Into<String>) -> Self {
        Self::LockTimeout {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error
    ///
    /// Internal errors are logged where they are raised so operators can alert
    /// on them independently of how the caller renders the failure.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(%message, "internal invariant violated");
        Self::Internal { message }
    }

    /// True for system invariant violations, false for caller errors
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// True for errors caused by the caller's input
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::Invalid { .. } | Self::NotFound { .. } | Self::AlreadyExists { .. }
        )
    }
}

/// Standard Result type for SafeHarbor operations
pub type Result<T> = std::result::Result<T, HarborError>;

impl From<std::io::Error> for HarborError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::forbidden(err.to_string()),
            _ => Self::internal(err.to_string()),
        }
    }
}

impl From<toml::de::Error> for HarborError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}
