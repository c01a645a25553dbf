//! Realm lifecycle
//!
//! Realms are never deleted. Deactivation is terminal: it revokes every ACL
//! entry on the realm and on everything under it, and marks the realm's
//! users and groups inactive. The records themselves stay in the store, and
//! sessions their users already hold stop authenticating.

use crate::parties::insert_user;
use crate::registry::{ensure_unique_resource_name, Registry};
use crate::requests::{NewRealm, NewUser};
use safeharbor_authorization::acl;
use safeharbor_core::{ObjectId, PermissionMask, Result, Timestamp};
use safeharbor_store::{EntitySource, Realm, ResourceBase, Transaction, User};

/// What [`Registry::deactivate_realm`] touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deactivation {
    /// Resources whose ACL was cleared, the realm included
    pub resources: usize,
    /// ACL entries revoked
    pub revoked_entries: usize,
    /// Users and groups marked inactive
    pub deactivated_parties: usize,
}

impl Registry {
    fn insert_realm(
        &self,
        tx: &mut Transaction<'_>,
        request: &NewRealm,
        admin_user_id: ObjectId,
        now: Timestamp,
    ) -> Result<Realm> {
        let realm_ids = tx.realm_ids();
        ensure_unique_resource_name(&*tx, "realm", &realm_ids, &request.name, None)?;
        let id = tx.create_id();
        let file_directory = self.config.realm_directory(&id);
        let base = ResourceBase::new(id, None, request.name.clone(), request.description.clone(), now);
        let realm = Realm::new(base, admin_user_id, request.org_full_name.clone(), file_directory);
        tx.insert(realm.clone())?;
        Ok(realm)
    }

    /// Create a realm administered by an existing user
    ///
    /// No ACL entry is created; grant the admin access separately.
    pub fn create_realm(&self, request: NewRealm, admin_user_id: &ObjectId) -> Result<Realm> {
        request.validate()?;
        let now = self.now();
        let realm = self.store.transaction(|tx| {
            tx.user(admin_user_id)?;
            self.insert_realm(tx, &request, admin_user_id.clone(), now)
        })?;
        tracing::info!(realm_id = %realm.id(), name = %realm.resource.name, "realm created");
        Ok(realm)
    }

    /// Create a realm together with its admin user, who gets the full mask on it
    pub fn register_realm(&self, request: NewRealm, admin: NewUser) -> Result<(Realm, User)> {
        request.validate()?;
        admin.validate()?;
        let password_hash = self.passwords.hash(admin.password());
        let now = self.now();
        let (realm, user) = self.store.transaction(|tx| {
            let realm_id = self
                .insert_realm(tx, &request, ObjectId::new(""), now)?
                .id()
                .clone();
            let user = insert_user(tx, &realm_id, &admin, password_hash, now)?;
            tx.realm_mut(&realm_id)?.admin_user_id = user.id().clone();
            acl::set_access(tx, &realm_id, user.id(), PermissionMask::FULL)?;
            Ok((tx.realm(&realm_id)?.clone(), tx.user(user.id())?.clone()))
        })?;
        tracing::info!(
            realm_id = %realm.id(),
            admin_user_id = %user.id(),
            name = %realm.resource.name,
            "realm registered"
        );
        Ok((realm, user))
    }

    /// Revoke all access under a realm and deactivate its users and groups
    pub fn deactivate_realm(&self, realm_id: &ObjectId) -> Result<Deactivation> {
        let (resources, parties) = {
            let view = self.store.view();
            let realm = view.realm(realm_id)?;
            let mut resources = vec![realm_id.clone()];
            for repo_id in &realm.repo_ids {
                resources.push(repo_id.clone());
                resources.extend(view.repo(repo_id)?.child_ids().cloned());
            }
            let parties: Vec<ObjectId> = realm
                .member_user_ids
                .iter()
                .chain(&realm.group_ids)
                .cloned()
                .collect();
            (resources, parties)
        };
        let _locks = self.lock_for_update(&resources, &parties)?;

        let summary = self.store.transaction(|tx| {
            let mut summary = Deactivation::default();
            let realm = tx.realm(realm_id)?;
            let repo_ids = realm.repo_ids.clone();
            let party_ids: Vec<ObjectId> = realm
                .member_user_ids
                .iter()
                .chain(&realm.group_ids)
                .cloned()
                .collect();

            summary.revoked_entries += acl::remove_all_access(tx, realm_id)?;
            summary.resources += 1;
            for repo_id in &repo_ids {
                summary.revoked_entries += acl::remove_all_access(tx, repo_id)?;
                summary.resources += 1;
                let children: Vec<ObjectId> = tx.repo(repo_id)?.child_ids().cloned().collect();
                for child_id in &children {
                    summary.revoked_entries += acl::remove_all_access(tx, child_id)?;
                    summary.resources += 1;
                }
            }
            for party_id in &party_ids {
                tx.party_mut(party_id)?.is_active = false;
                summary.deactivated_parties += 1;
            }
            Ok(summary)
        })?;
        tracing::info!(
            %realm_id,
            resources = summary.resources,
            revoked = summary.revoked_entries,
            parties = summary.deactivated_parties,
            "realm deactivated"
        );
        Ok(summary)
    }
}
