//! SafeHarbor Testing Infrastructure
//!
//! Common setup shared by the integration suites of every SafeHarbor crate:
//! a manually driven clock, a store fixture that builds linked realms, repos
//! and parties, invariant assertions over the whole store, and proptest
//! strategies for permission masks and ACL operation sequences.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! safeharbor-testkit = { workspace = true }
//! ```
//!
//! ```rust,no_run
//! use safeharbor_testkit::*;
//!
//! let fx = Fixture::new();
//! let acme = fx.realm("acme");
//! let alice = fx.user(&acme, "alice");
//! fx.grant(&acme, &alice, safeharbor_core::PermissionMask::FULL);
//! assert_acl_index_consistent(fx.store());
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod assertions;
pub mod clock;
pub mod fixtures;
pub mod strategies;

pub use assertions::*;
pub use clock::ManualClock;
pub use fixtures::Fixture;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Install a test-friendly tracing subscriber once per process
///
/// Honors `RUST_LOG`; defaults to `warn`.
pub fn init_test_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
