//! Authorization engine
//!
//! Decides whether a user may perform one action on one resource.
//!
//! Candidates are the user followed by its groups in membership order. A
//! candidate grants the action when it holds an ACL entry with that bit on
//! the resource itself or on the resource's immediate parent.
//!
//! The walk covers at most two levels of the resource forest. A realm-level
//! grant reaches the realm's repos but not the dockerfiles, images, scan
//! configs or flags beneath them; those need a grant on the repo or on the
//! leaf. This is the documented access policy and is not a transitive walk
//! to the realm root.

use crate::acl::find_entry;
use safeharbor_core::{Action, HarborError, ObjectId, PermissionMask, Result};
use safeharbor_store::{Entity, EntitySource, PartyBase, ResourceBase, User};
use std::fmt;

/// Outcome of an authorization check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Some candidate party holds the action
    Allow,
    /// No candidate party holds the action
    Deny,
    /// The target id does not name a resource
    ResourceNotFound,
}

impl AccessDecision {
    /// Whether access is granted
    pub fn is_allowed(self) -> bool {
        matches!(self, AccessDecision::Allow)
    }

    /// Map a negative decision to the matching caller error
    ///
    /// `Deny` becomes `Forbidden`; `ResourceNotFound` becomes `NotFound`.
    pub fn into_result(self, action: Action, resource_id: &ObjectId) -> Result<()> {
        match self {
            AccessDecision::Allow => Ok(()),
            AccessDecision::Deny => Err(HarborError::forbidden(format!(
                "{action} is not permitted on {resource_id}"
            ))),
            AccessDecision::ResourceNotFound => Err(HarborError::not_found(format!(
                "no resource with id {resource_id}"
            ))),
        }
    }
}

impl fmt::Display for AccessDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AccessDecision::Allow => "allow",
            AccessDecision::Deny => "deny",
            AccessDecision::ResourceNotFound => "resource not found",
        };
        f.write_str(label)
    }
}

/// Decide whether `user` may perform `action` on `resource_id`
pub fn authorize<S>(
    src: &S,
    user: &User,
    action: Action,
    resource_id: &ObjectId,
) -> Result<AccessDecision>
where
    S: EntitySource + ?Sized,
{
    // A user always has every capability on itself
    if user.id() == resource_id {
        return Ok(AccessDecision::Allow);
    }

    let Some(resource) = src.lookup(resource_id).and_then(Entity::resource) else {
        return Ok(AccessDecision::ResourceNotFound);
    };
    let parent = match &resource.parent_id {
        Some(parent_id) => Some(src.resource(parent_id).map_err(|_| {
            HarborError::internal(format!(
                "resource {resource_id} has missing parent {parent_id}"
            ))
        })?),
        None => None,
    };

    for party in candidate_parties(src, user)? {
        if holds(src, party, resource, action)? {
            return Ok(AccessDecision::Allow);
        }
        if let Some(parent) = parent {
            if holds(src, party, parent, action)? {
                return Ok(AccessDecision::Allow);
            }
        }
    }
    Ok(AccessDecision::Deny)
}

/// Like [`authorize`], for callers holding a raw permission mask
///
/// The mask must have exactly one bit set; anything else is `Invalid`.
pub fn authorize_mask<S>(
    src: &S,
    user: &User,
    mask: PermissionMask,
    resource_id: &ObjectId,
) -> Result<AccessDecision>
where
    S: EntitySource + ?Sized,
{
    authorize(src, user, Action::from_mask(mask)?, resource_id)
}

/// The user, then its groups in membership order
pub(crate) fn candidate_parties<'s, S>(src: &'s S, user: &'s User) -> Result<Vec<&'s PartyBase>>
where
    S: EntitySource + ?Sized,
{
    let mut parties = Vec::with_capacity(1 + user.group_ids.len());
    parties.push(&user.party);
    for group_id in &user.group_ids {
        let group = src.group(group_id).map_err(|_| {
            HarborError::internal(format!(
                "user {} is a member of missing group {group_id}",
                user.id()
            ))
        })?;
        parties.push(&group.party);
    }
    Ok(parties)
}

fn holds<S>(src: &S, party: &PartyBase, resource: &ResourceBase, action: Action) -> Result<bool>
where
    S: EntitySource + ?Sized,
{
    let entry = find_entry(src, &party.id, &party.acl_entry_ids, |e| {
        e.resource_id == resource.id
    })?;
    Ok(entry.is_some_and(|e| e.allows(action)))
}
