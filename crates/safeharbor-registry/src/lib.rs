//! SafeHarbor Registry
//!
//! Lifecycle of parties and resources on top of the object store: creating
//! users, groups, realms, repos and leaf resources with their parent links,
//! deleting them with their ACL entries, deactivating realms, and recording
//! builds and scans performed by external tools.
//!
//! Operations here do not authorize their caller unless they act on a user's
//! behalf (builds and scans). Request handlers check access first through
//! [`HarborService::authorize_session`].

#![forbid(unsafe_code)]

pub mod activity;
pub mod collaborators;
pub mod config;
pub mod parties;
pub mod realms;
pub mod registry;
pub mod requests;
pub mod resources;
pub mod service;

pub use collaborators::{scan_score, BuildTool, SavedImage, ScanProvider, Vulnerability};
pub use config::{RegistryConfig, ServiceConfig};
pub use realms::Deactivation;
pub use registry::Registry;
pub use requests::{NewRealm, NewResource, NewScanConfig, NewUser, ScanConfigPatch};
pub use service::HarborService;
