//! Parties: the users and groups that can be granted capabilities

use safeharbor_core::{ObjectId, Timestamp};
use serde::{Deserialize, Serialize};

/// Fields every party carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyBase {
    /// Internal id
    pub id: ObjectId,
    /// Display name
    pub name: String,
    /// Cleared when the owning realm is deactivated
    pub is_active: bool,
    /// When the party was created
    pub creation_time: Timestamp,
    /// Realm the party belongs to
    pub realm_id: ObjectId,
    /// ACL entries granted to this party
    pub acl_entry_ids: Vec<ObjectId>,
}

impl PartyBase {
    /// Active party with no ACL entries
    pub fn new(id: ObjectId, realm_id: ObjectId, name: impl Into<String>, now: Timestamp) -> Self {
        Self {
            id,
            name: name.into(),
            is_active: true,
            creation_time: now,
            realm_id,
            acl_entry_ids: Vec::new(),
        }
    }
}

/// A person who can log in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Common party fields
    pub party: PartyBase,
    /// External-facing login id, unique across all realms
    pub login_name: String,
    /// Contact address, target of verification emails
    pub email_address: String,
    /// `salted_hash(secret_salt, password)`
    pub password_hash: Vec<u8>,
    /// Groups this user is a member of, in joining order
    pub group_ids: Vec<ObjectId>,
    /// Most recent login attempts, oldest first
    pub recent_login_timestamps: Vec<Timestamp>,
    /// Build and scan events this user triggered
    pub event_ids: Vec<ObjectId>,
}

impl User {
    /// New active user
    pub fn new(
        party: PartyBase,
        login_name: impl Into<String>,
        email_address: impl Into<String>,
        password_hash: Vec<u8>,
    ) -> Self {
        Self {
            party,
            login_name: login_name.into(),
            email_address: email_address.into(),
            password_hash,
            group_ids: Vec::new(),
            recent_login_timestamps: Vec::new(),
            event_ids: Vec::new(),
        }
    }

    /// Internal id
    pub fn id(&self) -> &ObjectId {
        &self.party.id
    }

    /// Whether the user is a member of `group_id`
    pub fn is_member_of(&self, group_id: &ObjectId) -> bool {
        self.group_ids.contains(group_id)
    }
}

/// A named set of users. Groups never contain other groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Common party fields
    pub party: PartyBase,
    /// Free-form description
    pub description: String,
    /// Member user ids
    pub member_user_ids: Vec<ObjectId>,
}

impl Group {
    /// New empty group
    pub fn new(party: PartyBase, description: impl Into<String>) -> Self {
        Self {
            party,
            description: description.into(),
            member_user_ids: Vec::new(),
        }
    }

    /// Internal id
    pub fn id(&self) -> &ObjectId {
        &self.party.id
    }

    /// Whether `user_id` is a member
    pub fn has_member(&self, user_id: &ObjectId) -> bool {
        self.member_user_ids.contains(user_id)
    }
}
