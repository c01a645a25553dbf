//! SafeHarbor Core
//!
//! Foundation layer shared by every SafeHarbor crate. It contains no storage,
//! authorization or session logic, only the vocabulary those layers speak:
//!
//! - [`HarborError`]: the unified error type and its kinds
//! - [`ObjectId`] / [`IdGenerator`]: entity identifiers
//! - [`PermissionMask`] / [`Action`]: capability bits
//! - [`SaltedDigest`]: keyed digests for tokens and password hashes
//! - [`Clock`] / [`Timestamp`]: injectable time
//! - [`HarborConfig`]: the configuration loading discipline

#![forbid(unsafe_code)]

/// Unified error handling
pub mod errors;

/// Entity identifiers and the id generator
pub mod identifiers;

/// Permission masks and actions
pub mod permission;

/// Salted digests and constant-time comparison
pub mod crypto;

/// Injectable clock
pub mod time;

/// Configuration trait and helpers
pub mod config;

pub use config::HarborConfig;
pub use crypto::{constant_time_eq, DigestScheme, SaltedDigest};
pub use errors::{HarborError, Result};
pub use identifiers::{IdGenerator, ObjectId};
pub use permission::{Action, PermissionMask};
pub use time::{Clock, SystemClock, Timestamp};
