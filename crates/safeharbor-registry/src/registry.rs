//! The registry service and the helpers its lifecycle operations share
//!
//! Every mutating operation follows the same shape: take the per-object locks
//! it needs (parents before children, resources before parties), then stage
//! all of its changes in one store transaction. A failure anywhere leaves the
//! store exactly as it was.

use crate::config::RegistryConfig;
use crate::requests::NewResource;
use safeharbor_authentication::PasswordHasher;
use safeharbor_authorization::{acl, Authorizer};
use safeharbor_core::{Clock, HarborConfig, HarborError, ObjectId, PermissionMask, Result, Timestamp};
use safeharbor_store::{EntitySource, ObjectLocks, ObjectStore, ResourceBase, Transaction};
use std::sync::Arc;

/// Party and resource lifecycle over a shared object store
#[derive(Debug, Clone)]
pub struct Registry {
    pub(crate) store: Arc<ObjectStore>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) passwords: PasswordHasher,
    pub(crate) authorizer: Authorizer,
    pub(crate) config: RegistryConfig,
}

/// Locks held by one operation, released together on drop
pub(crate) struct HeldLocks<'a> {
    _resources: ObjectLocks<'a>,
    _parties: ObjectLocks<'a>,
}

impl Registry {
    /// Registry over `store`, validating `config` first
    pub fn new(
        config: RegistryConfig,
        store: Arc<ObjectStore>,
        clock: Arc<dyn Clock>,
        passwords: PasswordHasher,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            authorizer: Authorizer::new(Arc::clone(&store)),
            store,
            clock,
            passwords,
            config,
        })
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<ObjectStore> {
        &self.store
    }

    /// Configuration in effect
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Lock `resources` in order, then every party holding an ACL entry on
    /// them together with `parties`
    ///
    /// Granting on a resource needs that resource's lock, so the holder list
    /// read after the first step cannot grow until the locks are dropped.
    pub(crate) fn lock_for_update(
        &self,
        resources: &[ObjectId],
        parties: &[ObjectId],
    ) -> Result<HeldLocks<'_>> {
        let resource_locks = self.store.lock_objects(resources)?;
        let mut party_ids = {
            let view = self.store.view();
            acl_holders(&view, resources)?
        };
        party_ids.extend(parties.iter().cloned());
        let party_locks = self.store.lock_objects(&party_ids)?;
        Ok(HeldLocks {
            _resources: resource_locks,
            _parties: party_locks,
        })
    }

    /// Lock `resources`, then the owner `request` names
    pub(crate) fn lock_for_create(
        &self,
        resources: &[ObjectId],
        request: &NewResource,
    ) -> Result<ObjectLocks<'_>> {
        let mut ids = resources.to_vec();
        ids.extend(request.owner.iter().cloned());
        self.store.lock_objects(&ids)
    }

    /// `resource_id` preceded by its parent, if it has one
    pub(crate) fn with_parent(&self, resource_id: &ObjectId) -> Result<Vec<ObjectId>> {
        let view = self.store.view();
        let resource = view.resource(resource_id)?;
        Ok(resource
            .parent_id
            .iter()
            .chain(std::iter::once(resource_id))
            .cloned()
            .collect())
    }
}

/// Parties holding an entry on any of `resource_ids`, without duplicates
///
/// Ids that are not live resources are skipped; the operation that named
/// them reports the missing object itself.
pub(crate) fn acl_holders<S>(src: &S, resource_ids: &[ObjectId]) -> Result<Vec<ObjectId>>
where
    S: EntitySource + ?Sized,
{
    let mut holders = Vec::new();
    for resource_id in resource_ids {
        let Ok(resource) = src.resource(resource_id) else {
            continue;
        };
        for entry in acl::resolve_entries(src, resource_id, &resource.acl_entry_ids)? {
            if !holders.contains(&entry.party_id) {
                holders.push(entry.party_id.clone());
            }
        }
    }
    Ok(holders)
}

/// Fresh resource fields under `parent_id`
pub(crate) fn new_base(
    tx: &mut Transaction<'_>,
    parent_id: Option<&ObjectId>,
    request: &NewResource,
    now: Timestamp,
) -> ResourceBase {
    ResourceBase::new(
        tx.create_id(),
        parent_id.cloned(),
        request.name.clone(),
        request.description.clone(),
        now,
    )
}

/// Give the requested owner, if any, the full mask on a just-created resource
pub(crate) fn grant_owner(
    tx: &mut Transaction<'_>,
    resource_id: &ObjectId,
    request: &NewResource,
) -> Result<()> {
    if let Some(owner) = &request.owner {
        acl::set_access(tx, resource_id, owner, PermissionMask::FULL)?;
    }
    Ok(())
}

/// Reject `name` if one of the resources in `sibling_ids` already uses it
pub(crate) fn ensure_unique_resource_name<S>(
    src: &S,
    what: &str,
    sibling_ids: &[ObjectId],
    name: &str,
    except: Option<&ObjectId>,
) -> Result<()>
where
    S: EntitySource + ?Sized,
{
    for id in sibling_ids {
        if Some(id) == except {
            continue;
        }
        if src.resource(id)?.name == name {
            return Err(HarborError::already_exists(format!(
                "a {what} named {name:?} already exists"
            )));
        }
    }
    Ok(())
}
