//! # SafeHarbor Authorization
//!
//! The ACL subsystem and the authorization engine.
//!
//! - [`acl`]: grant, revoke and look up ACL entries inside a store transaction
//! - [`engine`]: the two-level allow/deny decision
//! - [`accessible`]: "my realms / my repos" aggregation
//! - [`AccessControl`] / [`Authorizer`]: the store-backed services handlers call

#![forbid(unsafe_code)]

pub mod accessible;
pub mod acl;
pub mod descriptor;
pub mod engine;
pub mod service;

pub use accessible::AccessibleResources;
pub use descriptor::AclEntryDescriptor;
pub use engine::{authorize, authorize_mask, AccessDecision};
pub use service::{AccessControl, Authorizer};
