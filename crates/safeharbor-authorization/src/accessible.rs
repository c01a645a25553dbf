//! Resources reachable through a user's ACL entries
//!
//! Backs the "my realms" / "my repos" listings: every resource referenced by
//! an entry held by the user or one of its groups, classified by kind.

use crate::acl::resolve_entries;
use crate::engine::candidate_parties;
use safeharbor_core::{HarborError, ObjectId, Result};
use safeharbor_store::{Entity, EntitySource, User};

/// Resources a user holds at least one capability on, deduplicated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessibleResources {
    /// Realms
    pub realm_ids: Vec<ObjectId>,
    /// Repos
    pub repo_ids: Vec<ObjectId>,
    /// Dockerfiles, docker images, scan configs and flags
    pub leaf_ids: Vec<ObjectId>,
}

impl AccessibleResources {
    /// Whether nothing is accessible
    pub fn is_empty(&self) -> bool {
        self.realm_ids.is_empty() && self.repo_ids.is_empty() && self.leaf_ids.is_empty()
    }

    fn push_unique(ids: &mut Vec<ObjectId>, id: &ObjectId) {
        if !ids.contains(id) {
            ids.push(id.clone());
        }
    }
}

/// Classify every resource `user` (directly or through a group) has an entry on
///
/// Entries with an empty mask grant nothing and are skipped.
pub fn accessible_resources<S>(src: &S, user: &User) -> Result<AccessibleResources>
where
    S: EntitySource + ?Sized,
{
    let mut found = AccessibleResources::default();
    for party in candidate_parties(src, user)? {
        for entry in resolve_entries(src, &party.id, &party.acl_entry_ids)? {
            if entry.mask.is_empty() {
                continue;
            }
            let target = src.entity(&entry.resource_id).map_err(|_| {
                HarborError::internal(format!(
                    "acl entry {} refers to missing resource {}",
                    entry.id, entry.resource_id
                ))
            })?;
            let bucket = match target {
                Entity::Realm(_) => &mut found.realm_ids,
                Entity::Repo(_) => &mut found.repo_ids,
                Entity::Dockerfile(_)
                | Entity::DockerImage(_)
                | Entity::ScanConfig(_)
                | Entity::Flag(_) => &mut found.leaf_ids,
                Entity::User(_)
                | Entity::Group(_)
                | Entity::AclEntry(_)
                | Entity::ParameterValue(_)
                | Entity::ScanEvent(_)
                | Entity::DockerfileExecEvent(_) => {
                    return Err(HarborError::internal(format!(
                        "acl entry {} targets a {}, not a resource",
                        entry.id,
                        target.kind()
                    )));
                }
            };
            AccessibleResources::push_unique(bucket, &entry.resource_id);
        }
    }
    Ok(found)
}
