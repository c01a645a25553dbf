//! Whole-store invariant checks
//!
//! Each `*_violations` function scans a snapshot and describes every broken
//! link it finds; the matching `assert_*` panics with that list.

use safeharbor_core::ObjectId;
use safeharbor_store::{Entity, EntitySource, ObjectStore};
use std::collections::HashSet;

/// Broken links in the bidirectional ACL index
pub fn acl_index_violations(store: &ObjectStore) -> Vec<String> {
    let mut problems = Vec::new();
    let snapshot = store.snapshot();
    let view = store.view();
    let mut pairs = HashSet::new();

    for entity in &snapshot {
        if let Some(entry) = entity.as_acl_entry() {
            match view.resource(&entry.resource_id) {
                Ok(r) if r.acl_entry_ids.contains(&entry.id) => {}
                Ok(_) => problems.push(format!("resource {} does not list entry {}", entry.resource_id, entry.id)),
                Err(_) => problems.push(format!("entry {} names missing resource {}", entry.id, entry.resource_id)),
            }
            match view.party(&entry.party_id) {
                Ok(p) if p.acl_entry_ids.contains(&entry.id) => {}
                Ok(_) => problems.push(format!("party {} does not list entry {}", entry.party_id, entry.id)),
                Err(_) => problems.push(format!("entry {} names missing party {}", entry.id, entry.party_id)),
            }
            if !pairs.insert((entry.resource_id.clone(), entry.party_id.clone())) {
                problems.push(format!(
                    "more than one entry for resource {} and party {}",
                    entry.resource_id, entry.party_id
                ));
            }
        }

        let owner = entity.id();
        let listed: &[ObjectId] = match (entity.resource(), entity.party()) {
            (Some(r), _) => &r.acl_entry_ids,
            (_, Some(p)) => &p.acl_entry_ids,
            _ => continue,
        };
        for entry_id in listed {
            match view.acl_entry(entry_id) {
                Ok(e) if &e.resource_id == owner || &e.party_id == owner => {}
                Ok(_) => problems.push(format!("{owner} lists entry {entry_id}, which names neither side as {owner}")),
                Err(_) => problems.push(format!("{owner} lists missing entry {entry_id}")),
            }
        }
    }
    problems
}

/// Panic unless every ACL entry is indexed on exactly both of its sides
pub fn assert_acl_index_consistent(store: &ObjectStore) {
    let problems = acl_index_violations(store);
    assert!(problems.is_empty(), "acl index is inconsistent: {problems:#?}");
}

/// Group members that are not users
pub fn nested_group_violations(store: &ObjectStore) -> Vec<String> {
    let snapshot = store.snapshot();
    let view = store.view();
    let mut problems = Vec::new();
    for group in snapshot.iter().filter_map(Entity::as_group) {
        for member in &group.member_user_ids {
            if view.user(member).is_err() {
                problems.push(format!("group {} has non-user member {member}", group.id()));
            }
        }
    }
    problems
}

/// Panic if any group contains something other than a user
pub fn assert_no_nested_groups(store: &ObjectStore) {
    let problems = nested_group_violations(store);
    assert!(problems.is_empty(), "groups contain non-users: {problems:#?}");
}

/// Resources whose parent does not list them as a child
pub fn parent_link_violations(store: &ObjectStore) -> Vec<String> {
    let snapshot = store.snapshot();
    let view = store.view();
    let mut problems = Vec::new();
    for entity in snapshot {
        let Some(resource) = entity.resource() else {
            continue;
        };
        let Some(parent_id) = &resource.parent_id else {
            continue;
        };
        let listed = match view.lookup(parent_id) {
            Some(Entity::Realm(realm)) => realm.repo_ids.contains(&resource.id),
            Some(Entity::Repo(repo)) => repo.child_ids().any(|c| c == &resource.id),
            _ => false,
        };
        if !listed {
            problems.push(format!("{} {} is not listed by parent {parent_id}", entity.kind(), resource.id));
        }
    }
    problems
}

/// Panic unless every child resource is listed by its parent
pub fn assert_parent_links_consistent(store: &ObjectStore) {
    let problems = parent_link_violations(store);
    assert!(problems.is_empty(), "parent links are inconsistent: {problems:#?}");
}
