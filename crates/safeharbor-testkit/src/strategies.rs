//! Property test strategies for SafeHarbor types
//!
//! ACL operations are generated against index positions rather than ids, so
//! one strategy can drive any fixture: [`AclOp::apply`] maps the positions
//! onto the fixture's actual resources and parties.

use proptest::prelude::*;

// Re-export proptest for convenience
pub use proptest;

use safeharbor_authorization::acl;
use safeharbor_core::{Action, ObjectId, PermissionMask, Result};
use safeharbor_store::Transaction;

/// Any single action
pub fn arb_action() -> impl Strategy<Value = Action> {
    prop::sample::select(Action::ALL.to_vec())
}

/// Any mask, including the empty and full masks
pub fn arb_mask() -> impl Strategy<Value = PermissionMask> {
    any::<[bool; 5]>().prop_map(PermissionMask::from_array)
}

/// One ACL mutation, addressed by fixture position
#[derive(Debug, Clone)]
pub enum AclOp {
    /// `set_access`
    Set {
        /// Resource position
        resource: usize,
        /// Party position
        party: usize,
        /// Mask to set
        mask: PermissionMask,
    },
    /// `add_access`
    Add {
        /// Resource position
        resource: usize,
        /// Party position
        party: usize,
        /// Mask to merge in
        mask: PermissionMask,
    },
    /// `remove_access`
    Remove {
        /// Resource position
        resource: usize,
        /// Party position
        party: usize,
    },
    /// `remove_all_access`
    RemoveAll {
        /// Resource position
        resource: usize,
    },
    /// `remove_all_party_access`
    RemoveAllParty {
        /// Party position
        party: usize,
    },
}

impl AclOp {
    /// Run the operation against `resources[i]` / `parties[j]`
    pub fn apply(
        &self,
        tx: &mut Transaction<'_>,
        resources: &[ObjectId],
        parties: &[ObjectId],
    ) -> Result<()> {
        match *self {
            AclOp::Set { resource, party, mask } => {
                acl::set_access(tx, pick(resources, resource), pick(parties, party), mask)?;
            }
            AclOp::Add { resource, party, mask } => {
                acl::add_access(tx, pick(resources, resource), pick(parties, party), mask)?;
            }
            AclOp::Remove { resource, party } => {
                acl::remove_access(tx, pick(resources, resource), pick(parties, party))?;
            }
            AclOp::RemoveAll { resource } => {
                acl::remove_all_access(tx, pick(resources, resource))?;
            }
            AclOp::RemoveAllParty { party } => {
                acl::remove_all_party_access(tx, pick(parties, party))?;
            }
        }
        Ok(())
    }
}

fn pick(ids: &[ObjectId], position: usize) -> &ObjectId {
    &ids[position % ids.len()]
}

/// One ACL operation over `resources` resources and `parties` parties
pub fn arb_acl_op(resources: usize, parties: usize) -> impl Strategy<Value = AclOp> {
    let r = 0..resources.max(1);
    let p = 0..parties.max(1);
    prop_oneof![
        3 => (r.clone(), p.clone(), arb_mask())
            .prop_map(|(resource, party, mask)| AclOp::Set { resource, party, mask }),
        3 => (r.clone(), p.clone(), arb_mask())
            .prop_map(|(resource, party, mask)| AclOp::Add { resource, party, mask }),
        2 => (r.clone(), p.clone()).prop_map(|(resource, party)| AclOp::Remove { resource, party }),
        1 => r.prop_map(|resource| AclOp::RemoveAll { resource }),
        1 => p.prop_map(|party| AclOp::RemoveAllParty { party }),
    ]
}

/// Up to `max_len` operations
pub fn arb_acl_ops(resources: usize, parties: usize, max_len: usize) -> impl Strategy<Value = Vec<AclOp>> {
    prop::collection::vec(arb_acl_op(resources, parties), 0..max_len)
}
