//! Read access shared by store views and transactions
//!
//! The ACL subsystem and the authorization engine are written against
//! [`EntitySource`], so the same code reads either a consistent snapshot
//! ([`crate::StoreView`]) or the staged state of an open
//! [`crate::Transaction`].

use crate::acl_entry::AclEntry;
use crate::entity::{Entity, EntityKind};
use crate::event::{DockerfileExecEvent, ParameterValue, ScanEvent};
use crate::party::{Group, PartyBase, User};
use crate::resource::{DockerImage, Dockerfile, Flag, Realm, Repo, ResourceBase, ScanConfig};
use safeharbor_core::{HarborError, ObjectId, Result};

/// Error for an id that resolves to nothing
pub fn missing(id: &ObjectId) -> HarborError {
    HarborError::not_found(format!("no object with id {id}"))
}

/// Error for an id that resolves to an entity of another kind
pub fn wrong_kind(id: &ObjectId, expected: &str, found: EntityKind) -> HarborError {
    HarborError::not_found(format!("object {id} is a {found}, not a {expected}"))
}

macro_rules! typed_getters {
    ($($name:ident => $ty:ty, $as_ref:ident, $label:literal;)*) => {
        $(
            #[doc = concat!("Resolve `id` to a ", $label)]
            fn $name(&self, id: &ObjectId) -> Result<&$ty> {
                let entity = self.entity(id)?;
                entity
                    .$as_ref()
                    .ok_or_else(|| wrong_kind(id, $label, entity.kind()))
            }
        )*
    };
}

/// Read-only access to stored entities
pub trait EntitySource {
    /// Entity with this id, if live
    fn lookup(&self, id: &ObjectId) -> Option<&Entity>;

    /// Id of the user with this login name, if any
    fn user_id_by_login(&self, login_name: &str) -> Option<ObjectId>;

    /// Ids of every realm, in creation order
    fn realm_ids(&self) -> Vec<ObjectId>;

    /// Entity with this id, or `NotFound`
    fn entity(&self, id: &ObjectId) -> Result<&Entity> {
        self.lookup(id).ok_or_else(|| missing(id))
    }

    /// Whether an entity with this id is live
    fn contains(&self, id: &ObjectId) -> bool {
        self.lookup(id).is_some()
    }

    /// Common party fields of `id`
    fn party(&self, id: &ObjectId) -> Result<&PartyBase> {
        let entity = self.entity(id)?;
        entity
            .party()
            .ok_or_else(|| wrong_kind(id, "party", entity.kind()))
    }

    /// Common resource fields of `id`
    fn resource(&self, id: &ObjectId) -> Result<&ResourceBase> {
        let entity = self.entity(id)?;
        entity
            .resource()
            .ok_or_else(|| wrong_kind(id, "resource", entity.kind()))
    }

    /// User with this login name, or `NotFound`
    fn user_by_login(&self, login_name: &str) -> Result<&User> {
        let id = self
            .user_id_by_login(login_name)
            .ok_or_else(|| HarborError::not_found(format!("no user with login {login_name:?}")))?;
        self.user(&id)
    }

    typed_getters! {
        user => User, as_user, "user";
        group => Group, as_group, "group";
        realm => Realm, as_realm, "realm";
        repo => Repo, as_repo, "repo";
        dockerfile => Dockerfile, as_dockerfile, "dockerfile";
        docker_image => DockerImage, as_docker_image, "docker image";
        scan_config => ScanConfig, as_scan_config, "scan config";
        flag => Flag, as_flag, "flag";
        acl_entry => AclEntry, as_acl_entry, "acl entry";
        parameter_value => ParameterValue, as_parameter_value, "parameter value";
        scan_event => ScanEvent, as_scan_event, "scan event";
        exec_event => DockerfileExecEvent, as_exec_event, "dockerfile exec event";
    }
}
