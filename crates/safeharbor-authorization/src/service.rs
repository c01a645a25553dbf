//! Store-backed authorization services
//!
//! [`AccessControl`] and [`Authorizer`] own a shared handle to the object
//! store and are cheap to clone into request tasks. ACL mutations lock the
//! resource before the party, then run in one transaction.

use crate::accessible::{accessible_resources, AccessibleResources};
use crate::acl;
use crate::descriptor::AclEntryDescriptor;
use crate::engine::{authorize, AccessDecision};
use safeharbor_core::{Action, ObjectId, PermissionMask, Result};
use safeharbor_store::{AclEntry, EntitySource, ObjectStore};
use std::sync::Arc;

/// Locked, transactional ACL mutation
#[derive(Debug, Clone)]
pub struct AccessControl {
    store: Arc<ObjectStore>,
}

impl AccessControl {
    /// Service over `store`
    pub fn new(store: Arc<ObjectStore>) -> Self {
        Self { store }
    }

    /// See [`acl::set_access`]
    pub fn set_access(
        &self,
        resource_id: &ObjectId,
        party_id: &ObjectId,
        mask: PermissionMask,
    ) -> Result<AclEntry> {
        let _locks = self.lock_pair(resource_id, party_id)?;
        self.store
            .transaction(|tx| acl::set_access(tx, resource_id, party_id, mask))
    }

    /// See [`acl::add_access`]
    pub fn add_access(
        &self,
        resource_id: &ObjectId,
        party_id: &ObjectId,
        mask: PermissionMask,
    ) -> Result<AclEntry> {
        let _locks = self.lock_pair(resource_id, party_id)?;
        self.store
            .transaction(|tx| acl::add_access(tx, resource_id, party_id, mask))
    }

    /// See [`acl::remove_access`]
    pub fn remove_access(&self, resource_id: &ObjectId, party_id: &ObjectId) -> Result<bool> {
        let _locks = self.lock_pair(resource_id, party_id)?;
        self.store
            .transaction(|tx| acl::remove_access(tx, resource_id, party_id))
    }

    /// See [`acl::remove_all_access`]
    pub fn remove_all_access(&self, resource_id: &ObjectId) -> Result<usize> {
        let _resource = self.store.lock_objects(std::slice::from_ref(resource_id))?;
        // New entries on the resource need its lock, so this list is stable
        let party_ids = self.parties_on(resource_id)?;
        let _parties = self.store.lock_objects(&party_ids)?;
        self.store
            .transaction(|tx| acl::remove_all_access(tx, resource_id))
    }

    /// See [`acl::remove_all_party_access`]
    pub fn remove_all_party_access(&self, party_id: &ObjectId) -> Result<usize> {
        let resource_ids = {
            let view = self.store.view();
            let party = view.party(party_id)?;
            acl::resolve_entries(&view, party_id, &party.acl_entry_ids)?
                .into_iter()
                .map(|e| e.resource_id.clone())
                .collect::<Vec<_>>()
        };
        let mut ids = resource_ids;
        ids.push(party_id.clone());
        let _locks = self.store.lock_objects(&ids)?;
        self.store
            .transaction(|tx| acl::remove_all_party_access(tx, party_id))
    }

    /// Copy of the pair's entry, if any
    pub fn entry_for(&self, resource_id: &ObjectId, party_id: &ObjectId) -> Result<Option<AclEntry>> {
        let view = self.store.view();
        Ok(acl::entry_for_resource(&view, resource_id, party_id)?.cloned())
    }

    /// Descriptors for every entry on `resource_id`
    pub fn descriptors(&self, resource_id: &ObjectId) -> Result<Vec<AclEntryDescriptor>> {
        let view = self.store.view();
        let resource = view.resource(resource_id)?;
        Ok(acl::resolve_entries(&view, resource_id, &resource.acl_entry_ids)?
            .into_iter()
            .map(AclEntryDescriptor::from)
            .collect())
    }

    fn lock_pair(
        &self,
        resource_id: &ObjectId,
        party_id: &ObjectId,
    ) -> Result<safeharbor_store::ObjectLocks<'_>> {
        self.store
            .lock_objects(&[resource_id.clone(), party_id.clone()])
    }

    fn parties_on(&self, resource_id: &ObjectId) -> Result<Vec<ObjectId>> {
        let view = self.store.view();
        let resource = view.resource(resource_id)?;
        Ok(acl::resolve_entries(&view, resource_id, &resource.acl_entry_ids)?
            .into_iter()
            .map(|e| e.party_id.clone())
            .collect())
    }
}

/// Authorization checks against the current store state
#[derive(Debug, Clone)]
pub struct Authorizer {
    store: Arc<ObjectStore>,
}

impl Authorizer {
    /// Service over `store`
    pub fn new(store: Arc<ObjectStore>) -> Self {
        Self { store }
    }

    /// Decide whether `user_id` may perform `action` on `resource_id`
    pub fn authorize(
        &self,
        user_id: &ObjectId,
        action: Action,
        resource_id: &ObjectId,
    ) -> Result<AccessDecision> {
        let view = self.store.view();
        let user = view.user(user_id)?;
        let decision = authorize(&view, user, action, resource_id)?;
        tracing::debug!(%user_id, %action, %resource_id, %decision, "authorization decision");
        Ok(decision)
    }

    /// Like [`Authorizer::authorize`] for a raw single-bit mask
    pub fn authorize_mask(
        &self,
        user_id: &ObjectId,
        mask: PermissionMask,
        resource_id: &ObjectId,
    ) -> Result<AccessDecision> {
        self.authorize(user_id, Action::from_mask(mask)?, resource_id)
    }

    /// Succeed only on `Allow`
    ///
    /// `Deny` is `Forbidden` and `ResourceNotFound` is `NotFound`.
    pub fn require(&self, user_id: &ObjectId, action: Action, resource_id: &ObjectId) -> Result<()> {
        self.authorize(user_id, action, resource_id)?
            .into_result(action, resource_id)
    }

    /// Realms, repos and leaf resources the user holds entries on
    pub fn accessible_resources(&self, user_id: &ObjectId) -> Result<AccessibleResources> {
        let view = self.store.view();
        accessible_resources(&view, view.user(user_id)?)
    }
}
