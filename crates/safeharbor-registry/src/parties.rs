//! User and group lifecycle
//!
//! Groups contain users only. Membership is recorded on both sides, in the
//! group's `member_user_ids` and the user's `group_ids`.

use crate::registry::Registry;
use crate::requests::NewUser;
use safeharbor_authorization::acl;
use safeharbor_core::{HarborError, ObjectId, Result, Timestamp};
use safeharbor_store::{EntityKind, EntitySource, Group, PartyBase, Transaction, User};
use std::slice;

/// Stage a new user in `realm_id`, enforcing login uniqueness
pub(crate) fn insert_user(
    tx: &mut Transaction<'_>,
    realm_id: &ObjectId,
    request: &NewUser,
    password_hash: Vec<u8>,
    now: Timestamp,
) -> Result<User> {
    tx.realm(realm_id)?;
    if tx.user_id_by_login(&request.login_name).is_some() {
        return Err(HarborError::already_exists(format!(
            "login name {:?} is taken",
            request.login_name
        )));
    }
    let party = PartyBase::new(tx.create_id(), realm_id.clone(), request.name.clone(), now);
    let user = User::new(
        party,
        request.login_name.clone(),
        request.email_address.clone(),
        password_hash,
    );
    tx.realm_mut(realm_id)?.member_user_ids.push(user.id().clone());
    tx.insert(user.clone())?;
    Ok(user)
}

fn not_a_member(group_id: &ObjectId, user_id: &ObjectId) -> HarborError {
    HarborError::not_found(format!("user {user_id} is not a member of group {group_id}"))
}

fn unlink_member(tx: &mut Transaction<'_>, group_id: &ObjectId, user_id: &ObjectId) -> Result<()> {
    tx.group_mut(group_id)?.member_user_ids.retain(|id| id != user_id);
    tx.user_mut(user_id)?.group_ids.retain(|id| id != group_id);
    Ok(())
}

impl Registry {
    /// Create a user in `realm_id` with a hashed password
    pub fn create_user(&self, realm_id: &ObjectId, request: NewUser) -> Result<User> {
        request.validate()?;
        let password_hash = self.passwords.hash(request.password());
        let now = self.now();
        let _lock = self.store.lock_objects(slice::from_ref(realm_id))?;
        let user = self
            .store
            .transaction(|tx| insert_user(tx, realm_id, &request, password_hash, now))?;
        tracing::info!(user_id = %user.id(), %realm_id, login_name = %user.login_name, "user created");
        Ok(user)
    }

    /// Create a group whose name is unique within `realm_id`
    pub fn create_group(
        &self,
        realm_id: &ObjectId,
        name: &str,
        description: &str,
    ) -> Result<Group> {
        if name.trim().is_empty() {
            return Err(HarborError::invalid("group name must not be empty"));
        }
        let now = self.now();
        let _lock = self.store.lock_objects(slice::from_ref(realm_id))?;
        let group = self.store.transaction(|tx| {
            let realm = tx.realm(realm_id)?;
            for group_id in &realm.group_ids {
                if tx.party(group_id)?.name == name {
                    return Err(HarborError::already_exists(format!(
                        "a group named {name:?} already exists in realm {realm_id}"
                    )));
                }
            }
            let party = PartyBase::new(tx.create_id(), realm_id.clone(), name, now);
            let group = Group::new(party, description);
            tx.realm_mut(realm_id)?.group_ids.push(group.id().clone());
            tx.insert(group.clone())?;
            Ok(group)
        })?;
        tracing::info!(group_id = %group.id(), %realm_id, "group created");
        Ok(group)
    }

    /// Add a user to a group
    ///
    /// Fails with `Invalid` when `user_id` names a group and with
    /// `AlreadyExists` when the user is already a member.
    pub fn add_user_to_group(&self, group_id: &ObjectId, user_id: &ObjectId) -> Result<()> {
        let _locks = self
            .store
            .lock_objects(&[group_id.clone(), user_id.clone()])?;
        self.store.transaction(|tx| {
            match tx.entity(user_id)?.kind() {
                EntityKind::User => {}
                EntityKind::Group => {
                    return Err(HarborError::invalid(format!(
                        "group {user_id} cannot be a member of group {group_id}"
                    )))
                }
                other => {
                    return Err(HarborError::not_found(format!(
                        "object {user_id} is a {other}, not a user"
                    )))
                }
            }
            if tx.group(group_id)?.has_member(user_id) {
                return Err(HarborError::already_exists(format!(
                    "user {user_id} is already a member of group {group_id}"
                )));
            }
            tx.group_mut(group_id)?.member_user_ids.push(user_id.clone());
            tx.user_mut(user_id)?.group_ids.push(group_id.clone());
            Ok(())
        })?;
        tracing::info!(%group_id, %user_id, "user added to group");
        Ok(())
    }

    /// Remove a user from a group; ACL entries are untouched
    pub fn remove_user_from_group(&self, group_id: &ObjectId, user_id: &ObjectId) -> Result<()> {
        let _locks = self
            .store
            .lock_objects(&[group_id.clone(), user_id.clone()])?;
        self.store.transaction(|tx| {
            if !tx.group(group_id)?.has_member(user_id) {
                return Err(not_a_member(group_id, user_id));
            }
            unlink_member(tx, group_id, user_id)
        })?;
        tracing::info!(%group_id, %user_id, "user removed from group");
        Ok(())
    }

    /// Delete a group: drop its members, revoke its entries, unlink it from its realm
    pub fn delete_group(&self, group_id: &ObjectId) -> Result<()> {
        let (resources, parties) = {
            let view = self.store.view();
            let group = view.group(group_id)?;
            let mut resources = vec![group.party.realm_id.clone()];
            for entry in acl::resolve_entries(&view, group_id, &group.party.acl_entry_ids)? {
                resources.push(entry.resource_id.clone());
            }
            let mut parties = vec![group_id.clone()];
            parties.extend(group.member_user_ids.iter().cloned());
            (resources, parties)
        };
        let _resource_locks = self.store.lock_objects(&resources)?;
        let _party_locks = self.store.lock_objects(&parties)?;

        let (members, revoked) = self.store.transaction(|tx| {
            let group = tx.group(group_id)?;
            let realm_id = group.party.realm_id.clone();
            let members = group.member_user_ids.clone();
            for user_id in &members {
                unlink_member(tx, group_id, user_id)?;
            }
            let revoked = acl::remove_all_party_access(tx, group_id)?;
            tx.realm_mut(&realm_id)?.group_ids.retain(|id| id != group_id);
            tx.remove(group_id)?;
            Ok((members.len(), revoked))
        })?;
        tracing::info!(%group_id, members, revoked, "group deleted");
        Ok(())
    }
}
