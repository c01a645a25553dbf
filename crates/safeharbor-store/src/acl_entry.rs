//! ACL entry records

use safeharbor_core::{Action, ObjectId, PermissionMask};
use serde::{Deserialize, Serialize};

/// Binding of one party to one resource with a permission mask
///
/// The entry's id is listed in both the resource's and the party's
/// `acl_entry_ids`, never in only one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    /// Internal id
    pub id: ObjectId,
    /// Resource the entry grants access to
    pub resource_id: ObjectId,
    /// Party holding the access
    pub party_id: ObjectId,
    /// Granted capabilities
    pub mask: PermissionMask,
}

impl AclEntry {
    /// New entry
    pub fn new(
        id: ObjectId,
        resource_id: ObjectId,
        party_id: ObjectId,
        mask: PermissionMask,
    ) -> Self {
        Self {
            id,
            resource_id,
            party_id,
            mask,
        }
    }

    /// Whether the entry grants `action`
    pub fn allows(&self, action: Action) -> bool {
        self.mask.allows(action)
    }
}
