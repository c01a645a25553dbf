//! Outbound ACL entry descriptor
//!
//! The mask travels as five `"true"` / `"false"` strings in the fixed order
//! `CreateIn, Read, Write, Execute, Delete`.

use safeharbor_core::{HarborError, ObjectId, PermissionMask, Result};
use safeharbor_store::AclEntry;
use serde::{Deserialize, Serialize};

/// Wire view of one ACL entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AclEntryDescriptor {
    /// Entry id
    pub entry_id: ObjectId,
    /// Resource the entry applies to
    pub resource_id: ObjectId,
    /// Party holding the entry
    pub party_id: ObjectId,
    /// Granted capabilities
    #[serde(with = "wire_mask")]
    pub mask: PermissionMask,
}

impl AclEntryDescriptor {
    /// Encode as JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| HarborError::internal(format!("failed to encode acl descriptor: {e}")))
    }

    /// Decode from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| HarborError::invalid(format!("malformed acl descriptor: {e}")))
    }
}

impl From<&AclEntry> for AclEntryDescriptor {
    fn from(entry: &AclEntry) -> Self {
        Self {
            entry_id: entry.id.clone(),
            resource_id: entry.resource_id.clone(),
            party_id: entry.party_id.clone(),
            mask: entry.mask,
        }
    }
}

mod wire_mask {
    use safeharbor_core::PermissionMask;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(mask: &PermissionMask, serializer: S) -> Result<S::Ok, S::Error> {
        mask.to_wire().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PermissionMask, D::Error> {
        let fields = Vec::<String>::deserialize(deserializer)?;
        PermissionMask::from_wire(&fields).map_err(D::Error::custom)
    }
}
