//! ACL subsystem
//!
//! An [`AclEntry`] binds one party to one resource with a permission mask.
//! Its id is listed in the `acl_entry_ids` of both the resource and the party,
//! never in one without the other, and at most one live entry exists per
//! (resource, party) pair.
//!
//! Mutating functions run inside a store [`Transaction`], so an entry is
//! always created, linked and indexed on both sides in one atomic step.
//! [`crate::AccessControl`] wraps them with object locks for standalone use.

use safeharbor_core::{HarborError, ObjectId, PermissionMask, Result};
use safeharbor_store::{AclEntry, EntitySource, Transaction};

fn dangling_entry(owner: &ObjectId, entry_id: &ObjectId) -> HarborError {
    HarborError::internal(format!(
        "object {owner} indexes acl entry {entry_id}, which does not exist"
    ))
}

fn dangling_side(entry: &AclEntry, side: &ObjectId) -> HarborError {
    HarborError::internal(format!(
        "acl entry {} refers to missing object {side}",
        entry.id
    ))
}

/// Resolve every entry listed in `entry_ids`
///
/// An id that does not resolve to an ACL entry means the index is corrupt.
pub fn resolve_entries<'s, S>(
    src: &'s S,
    owner: &ObjectId,
    entry_ids: &'s [ObjectId],
) -> Result<Vec<&'s AclEntry>>
where
    S: EntitySource + ?Sized,
{
    entry_ids
        .iter()
        .map(|id| src.acl_entry(id).map_err(|_| dangling_entry(owner, id)))
        .collect()
}

pub(crate) fn find_entry<'s, S, P>(
    src: &'s S,
    owner: &ObjectId,
    entry_ids: &'s [ObjectId],
    matches: P,
) -> Result<Option<&'s AclEntry>>
where
    S: EntitySource + ?Sized,
    P: Fn(&AclEntry) -> bool,
{
    for id in entry_ids {
        let entry = src.acl_entry(id).map_err(|_| dangling_entry(owner, id))?;
        if matches(entry) {
            return Ok(Some(entry));
        }
    }
    Ok(None)
}

/// Entry binding `party_id` to `resource_id`, found from the party's side
pub fn entry_for_party<'s, S>(
    src: &'s S,
    party_id: &ObjectId,
    resource_id: &ObjectId,
) -> Result<Option<&'s AclEntry>>
where
    S: EntitySource + ?Sized,
{
    let party = src.party(party_id)?;
    find_entry(src, party_id, &party.acl_entry_ids, |e| {
        &e.resource_id == resource_id
    })
}

/// Entry binding `party_id` to `resource_id`, found from the resource's side
pub fn entry_for_resource<'s, S>(
    src: &'s S,
    resource_id: &ObjectId,
    party_id: &ObjectId,
) -> Result<Option<&'s AclEntry>>
where
    S: EntitySource + ?Sized,
{
    let resource = src.resource(resource_id)?;
    find_entry(src, resource_id, &resource.acl_entry_ids, |e| {
        &e.party_id == party_id
    })
}

/// Grant exactly `mask`, overwriting any existing mask for the pair
pub fn set_access(
    tx: &mut Transaction<'_>,
    resource_id: &ObjectId,
    party_id: &ObjectId,
    mask: PermissionMask,
) -> Result<AclEntry> {
    upsert(tx, resource_id, party_id, |_| mask)
}

/// Grant `mask` in addition to whatever the pair already holds
///
/// Granting the same bits twice leaves the entry unchanged.
pub fn add_access(
    tx: &mut Transaction<'_>,
    resource_id: &ObjectId,
    party_id: &ObjectId,
    mask: PermissionMask,
) -> Result<AclEntry> {
    upsert(tx, resource_id, party_id, |existing| existing.union(mask))
}

fn upsert<F>(
    tx: &mut Transaction<'_>,
    resource_id: &ObjectId,
    party_id: &ObjectId,
    merge: F,
) -> Result<AclEntry>
where
    F: FnOnce(PermissionMask) -> PermissionMask,
{
    tx.party(party_id)?;
    let existing = entry_for_resource(&*tx, resource_id, party_id)?.map(|e| e.id.clone());

    if let Some(entry_id) = existing {
        let entry = tx.acl_entry_mut(&entry_id)?;
        entry.mask = merge(entry.mask);
        tracing::debug!(
            entry_id = %entry.id,
            resource_id = %resource_id,
            party_id = %party_id,
            mask = %entry.mask,
            "updated acl entry"
        );
        return Ok(entry.clone());
    }

    let entry = AclEntry::new(
        tx.create_id(),
        resource_id.clone(),
        party_id.clone(),
        merge(PermissionMask::NONE),
    );
    tx.resource_mut(resource_id)?
        .acl_entry_ids
        .push(entry.id.clone());
    tx.party_mut(party_id)?.acl_entry_ids.push(entry.id.clone());
    tx.insert(entry.clone())?;
    tracing::debug!(
        entry_id = %entry.id,
        resource_id = %resource_id,
        party_id = %party_id,
        mask = %entry.mask,
        "created acl entry"
    );
    Ok(entry)
}

/// Revoke the pair's entry; returns whether one existed
pub fn remove_access(
    tx: &mut Transaction<'_>,
    resource_id: &ObjectId,
    party_id: &ObjectId,
) -> Result<bool> {
    tx.party(party_id)?;
    let Some(entry_id) = entry_for_resource(&*tx, resource_id, party_id)?.map(|e| e.id.clone())
    else {
        return Ok(false);
    };
    delete_entry(tx, &entry_id)?;
    Ok(true)
}

/// Revoke every entry on `resource_id`; returns how many were removed
pub fn remove_all_access(tx: &mut Transaction<'_>, resource_id: &ObjectId) -> Result<usize> {
    let entry_ids = tx.resource(resource_id)?.acl_entry_ids.clone();
    for entry_id in &entry_ids {
        delete_entry(tx, entry_id)?;
    }
    if !entry_ids.is_empty() {
        tracing::debug!(%resource_id, removed = entry_ids.len(), "cleared resource acl");
    }
    Ok(entry_ids.len())
}

/// Revoke every entry held by `party_id`; returns how many were removed
pub fn remove_all_party_access(tx: &mut Transaction<'_>, party_id: &ObjectId) -> Result<usize> {
    let entry_ids = tx.party(party_id)?.acl_entry_ids.clone();
    for entry_id in &entry_ids {
        delete_entry(tx, entry_id)?;
    }
    if !entry_ids.is_empty() {
        tracing::debug!(%party_id, removed = entry_ids.len(), "cleared party acl");
    }
    Ok(entry_ids.len())
}

/// Unlink an entry from both indices and delete it
fn delete_entry(tx: &mut Transaction<'_>, entry_id: &ObjectId) -> Result<()> {
    let entry = tx.acl_entry(entry_id)?.clone();
    tx.resource_mut(&entry.resource_id)
        .map_err(|_| dangling_side(&entry, &entry.resource_id))?
        .acl_entry_ids
        .retain(|id| id != entry_id);
    tx.party_mut(&entry.party_id)
        .map_err(|_| dangling_side(&entry, &entry.party_id))?
        .acl_entry_ids
        .retain(|id| id != entry_id);
    tx.remove(entry_id)
}
