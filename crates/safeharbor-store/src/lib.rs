//! # SafeHarbor Store
//!
//! Entity model and the in-memory object store.
//!
//! Parties (users, groups) and resources (realms, repos, dockerfiles, docker
//! images, scan configs, flags) are kept together with the ACL entries that
//! link them and the events recorded against them. All mutations are staged
//! in a [`Transaction`] and applied atomically; multi-step operations
//! serialize on per-object locks from the [`LockManager`].

#![forbid(unsafe_code)]

pub mod acl_entry;
pub mod config;
pub mod entity;
pub mod event;
pub mod lock;
pub mod party;
pub mod resource;
pub mod source;
pub mod store;

pub use acl_entry::AclEntry;
pub use config::StoreConfig;
pub use entity::{Entity, EntityKind};
pub use event::{DockerfileExecEvent, ParameterValue, ScanEvent};
pub use lock::{LockManager, ObjectLock, ObjectLocks};
pub use party::{Group, PartyBase, User};
pub use resource::{DockerImage, Dockerfile, Flag, Realm, Repo, ResourceBase, ScanConfig};
pub use source::EntitySource;
pub use store::{ObjectStore, StoreView, Transaction};
