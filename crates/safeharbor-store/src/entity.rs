//! The closed set of stored entity kinds
//!
//! [`Entity`] is a sum type over every record the object store holds.
//! Code that needs to treat parties or resources uniformly goes through
//! [`Entity::party`] / [`Entity::resource`]; code that needs a specific kind
//! matches exhaustively on [`EntityKind`].

use crate::acl_entry::AclEntry;
use crate::event::{DockerfileExecEvent, ParameterValue, ScanEvent};
use crate::party::{Group, PartyBase, User};
use crate::resource::{
    DockerImage, Dockerfile, Flag, Realm, Repo, ResourceBase, ScanConfig,
};
use safeharbor_core::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminant of [`Entity`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// [`User`]
    User,
    /// [`Group`]
    Group,
    /// [`Realm`]
    Realm,
    /// [`Repo`]
    Repo,
    /// [`Dockerfile`]
    Dockerfile,
    /// [`DockerImage`]
    DockerImage,
    /// [`ScanConfig`]
    ScanConfig,
    /// [`Flag`]
    Flag,
    /// [`AclEntry`]
    AclEntry,
    /// [`ParameterValue`]
    ParameterValue,
    /// [`ScanEvent`]
    ScanEvent,
    /// [`DockerfileExecEvent`]
    DockerfileExecEvent,
}

impl EntityKind {
    /// Whether entities of this kind can be granted capabilities
    pub fn is_party(self) -> bool {
        matches!(self, EntityKind::User | EntityKind::Group)
    }

    /// Whether entities of this kind can be acted upon
    pub fn is_resource(self) -> bool {
        matches!(
            self,
            EntityKind::Realm
                | EntityKind::Repo
                | EntityKind::Dockerfile
                | EntityKind::DockerImage
                | EntityKind::ScanConfig
                | EntityKind::Flag
        )
    }

    /// Position in the lock order: realms, repos, repo leaves, groups,
    /// users, then everything else
    pub fn lock_rank(self) -> u8 {
        match self {
            EntityKind::Realm => 0,
            EntityKind::Repo => 1,
            EntityKind::Dockerfile
            | EntityKind::DockerImage
            | EntityKind::ScanConfig
            | EntityKind::Flag => 2,
            EntityKind::Group => 3,
            EntityKind::User => 4,
            EntityKind::AclEntry
            | EntityKind::ParameterValue
            | EntityKind::ScanEvent
            | EntityKind::DockerfileExecEvent => 5,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::User => "user",
            EntityKind::Group => "group",
            EntityKind::Realm => "realm",
            EntityKind::Repo => "repo",
            EntityKind::Dockerfile => "dockerfile",
            EntityKind::DockerImage => "docker image",
            EntityKind::ScanConfig => "scan config",
            EntityKind::Flag => "flag",
            EntityKind::AclEntry => "acl entry",
            EntityKind::ParameterValue => "parameter value",
            EntityKind::ScanEvent => "scan event",
            EntityKind::DockerfileExecEvent => "dockerfile exec event",
        };
        f.write_str(name)
    }
}

/// Any stored record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entity {
    /// A user party
    User(User),
    /// A group party
    Group(Group),
    /// A realm resource
    Realm(Realm),
    /// A repo resource
    Repo(Repo),
    /// A dockerfile resource
    Dockerfile(Dockerfile),
    /// A docker image resource
    DockerImage(DockerImage),
    /// A scan config resource
    ScanConfig(ScanConfig),
    /// A flag resource
    Flag(Flag),
    /// An ACL entry
    AclEntry(AclEntry),
    /// A scan config parameter
    ParameterValue(ParameterValue),
    /// A scan result
    ScanEvent(ScanEvent),
    /// A build result
    DockerfileExecEvent(DockerfileExecEvent),
}

impl Entity {
    /// Id of the record
    pub fn id(&self) -> &ObjectId {
        match self {
            Entity::User(u) => &u.party.id,
            Entity::Group(g) => &g.party.id,
            Entity::Realm(r) => &r.resource.id,
            Entity::Repo(r) => &r.resource.id,
            Entity::Dockerfile(d) => &d.resource.id,
            Entity::DockerImage(i) => &i.resource.id,
            Entity::ScanConfig(s) => &s.resource.id,
            Entity::Flag(f) => &f.resource.id,
            Entity::AclEntry(e) => &e.id,
            Entity::ParameterValue(p) => &p.id,
            Entity::ScanEvent(e) => &e.id,
            Entity::DockerfileExecEvent(e) => &e.id,
        }
    }

    /// Discriminant of the record
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::User(_) => EntityKind::User,
            Entity::Group(_) => EntityKind::Group,
            Entity::Realm(_) => EntityKind::Realm,
            Entity::Repo(_) => EntityKind::Repo,
            Entity::Dockerfile(_) => EntityKind::Dockerfile,
            Entity::DockerImage(_) => EntityKind::DockerImage,
            Entity::ScanConfig(_) => EntityKind::ScanConfig,
            Entity::Flag(_) => EntityKind::Flag,
            Entity::AclEntry(_) => EntityKind::AclEntry,
            Entity::ParameterValue(_) => EntityKind::ParameterValue,
            Entity::ScanEvent(_) => EntityKind::ScanEvent,
            Entity::DockerfileExecEvent(_) => EntityKind::DockerfileExecEvent,
        }
    }

    /// Common party fields, if this is a party
    pub fn party(&self) -> Option<&PartyBase> {
        match self {
            Entity::User(u) => Some(&u.party),
            Entity::Group(g) => Some(&g.party),
            _ => None,
        }
    }

    /// Mutable common party fields, if this is a party
    pub fn party_mut(&mut self) -> Option<&mut PartyBase> {
        match self {
            Entity::User(u) => Some(&mut u.party),
            Entity::Group(g) => Some(&mut g.party),
            _ => None,
        }
    }

    /// Common resource fields, if this is a resource
    pub fn resource(&self) -> Option<&ResourceBase> {
        match self {
            Entity::Realm(r) => Some(&r.resource),
            Entity::Repo(r) => Some(&r.resource),
            Entity::Dockerfile(d) => Some(&d.resource),
            Entity::DockerImage(i) => Some(&i.resource),
            Entity::ScanConfig(s) => Some(&s.resource),
            Entity::Flag(f) => Some(&f.resource),
            _ => None,
        }
    }

    /// Mutable common resource fields, if this is a resource
    pub fn resource_mut(&mut self) -> Option<&mut ResourceBase> {
        match self {
            Entity::Realm(r) => Some(&mut r.resource),
            Entity::Repo(r) => Some(&mut r.resource),
            Entity::Dockerfile(d) => Some(&mut d.resource),
            Entity::DockerImage(i) => Some(&mut i.resource),
            Entity::ScanConfig(s) => Some(&mut s.resource),
            Entity::Flag(f) => Some(&mut f.resource),
            _ => None,
        }
    }
}

macro_rules! entity_variants {
    ($($variant:ident => $ty:ty, $as_ref:ident, $as_mut:ident;)*) => {
        impl Entity {
            $(
                #[doc = concat!("Borrow as [`", stringify!($ty), "`] if this is one")]
                pub fn $as_ref(&self) -> Option<&$ty> {
                    match self {
                        Entity::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                #[doc = concat!("Mutably borrow as [`", stringify!($ty), "`] if this is one")]
                pub fn $as_mut(&mut self) -> Option<&mut $ty> {
                    match self {
                        Entity::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            )*
        }

        $(
            impl From<$ty> for Entity {
                fn from(value: $ty) -> Self {
                    Entity::$variant(value)
                }
            }
        )*
    };
}

entity_variants! {
    User => User, as_user, as_user_mut;
    Group => Group, as_group, as_group_mut;
    Realm => Realm, as_realm, as_realm_mut;
    Repo => Repo, as_repo, as_repo_mut;
    Dockerfile => Dockerfile, as_dockerfile, as_dockerfile_mut;
    DockerImage => DockerImage, as_docker_image, as_docker_image_mut;
    ScanConfig => ScanConfig, as_scan_config, as_scan_config_mut;
    Flag => Flag, as_flag, as_flag_mut;
    AclEntry => AclEntry, as_acl_entry, as_acl_entry_mut;
    ParameterValue => ParameterValue, as_parameter_value, as_parameter_value_mut;
    ScanEvent => ScanEvent, as_scan_event, as_scan_event_mut;
    DockerfileExecEvent => DockerfileExecEvent, as_exec_event, as_exec_event_mut;
}
