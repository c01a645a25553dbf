//! Permission masks and single-capability actions
//!
//! A [`PermissionMask`] is the five independent capability bits carried by an
//! ACL entry. An [`Action`] is exactly one of those bits and is what the
//! authorization engine is asked about.

use crate::{HarborError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// One capability bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    /// Create child resources inside the target
    CreateIn,
    /// Read the target
    Read,
    /// Modify the target
    Write,
    /// Execute the target (build a dockerfile, run a scan)
    Execute,
    /// Delete the target
    Delete,
}

impl Action {
    /// All actions in wire order
    pub const ALL: [Action; 5] = [
        Action::CreateIn,
        Action::Read,
        Action::Write,
        Action::Execute,
        Action::Delete,
    ];

    /// Position of this action in the wire encoding
    pub fn index(self) -> usize {
        match self {
            Action::CreateIn => 0,
            Action::Read => 1,
            Action::Write => 2,
            Action::Execute => 3,
            Action::Delete => 4,
        }
    }

    /// Convert a mask naming exactly one action
    ///
    /// A mask with no bits or several bits set is a caller error.
    pub fn from_mask(mask: PermissionMask) -> Result<Action> {
        let mut set = Action::ALL.into_iter().filter(|a| mask.allows(*a));
        match (set.next(), set.next()) {
            (Some(action), None) => Ok(action),
            (None, _) => Err(HarborError::invalid("permission mask names no action")),
            (Some(_), Some(_)) => Err(HarborError::invalid(format!(
                "permission mask {mask} names more than one action"
            ))),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::CreateIn => "CreateIn",
            Action::Read => "Read",
            Action::Write => "Write",
            Action::Execute => "Execute",
            Action::Delete => "Delete",
        };
        f.write_str(name)
    }
}

/// Five named capability bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionMask {
    /// May create child resources
    pub create_in: bool,
    /// May read
    pub read: bool,
    /// May write
    pub write: bool,
    /// May execute
    pub execute: bool,
    /// May delete
    pub delete: bool,
}

impl PermissionMask {
    /// No capabilities
    pub const NONE: PermissionMask = PermissionMask {
        create_in: false,
        read: false,
        write: false,
        execute: false,
        delete: false,
    };

    /// Every capability
    pub const FULL: PermissionMask = PermissionMask {
        create_in: true,
        read: true,
        write: true,
        execute: true,
        delete: true,
    };

    /// Mask holding only `action`
    pub fn only(action: Action) -> Self {
        Self::NONE.with(action)
    }

    /// Mask holding every listed action
    pub fn of(actions: &[Action]) -> Self {
        actions.iter().fold(Self::NONE, |mask, a| mask.with(*a))
    }

    /// Copy of this mask with `action` set
    pub fn with(mut self, action: Action) -> Self {
        *self.bit_mut(action) = true;
        self
    }

    /// Whether `action` is set
    pub fn allows(&self, action: Action) -> bool {
        self.to_array()[action.index()]
    }

    /// Whether no bit is set
    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }

    /// Bitwise OR of two masks
    pub fn union(self, other: PermissionMask) -> Self {
        Self {
            create_in: self.create_in || other.create_in,
            read: self.read || other.read,
            write: self.write || other.write,
            execute: self.execute || other.execute,
            delete: self.delete || other.delete,
        }
    }

    /// Bits in wire order
    pub fn to_array(self) -> [bool; 5] {
        [
            self.create_in,
            self.read,
            self.write,
            self.execute,
            self.delete,
        ]
    }

    /// Build from bits in wire order
    pub fn from_array(bits: [bool; 5]) -> Self {
        Self {
            create_in: bits[0],
            read: bits[1],
            write: bits[2],
            execute: bits[3],
            delete: bits[4],
        }
    }

    /// Wire encoding: five `"true"`/`"false"` strings in fixed order
    pub fn to_wire(self) -> [&'static str; 5] {
        self.to_array().map(|bit| if bit { "true" } else { "false" })
    }

    /// Parse the wire encoding
    pub fn from_wire<S: AsRef<str>>(fields: &[S]) -> Result<Self> {
        if fields.len() != 5 {
            return Err(HarborError::invalid(format!(
                "permission mask needs 5 fields, got {}",
                fields.len()
            )));
        }
        let mut bits = [false; 5];
        for (bit, field) in bits.iter_mut().zip(fields) {
            *bit = match field.as_ref() {
                "true" => true,
                "false" => false,
                other => {
                    return Err(HarborError::invalid(format!(
                        "permission mask field must be \"true\" or \"false\", got {other:?}"
                    )))
                }
            };
        }
        Ok(Self::from_array(bits))
    }

    fn bit_mut(&mut self, action: Action) -> &mut bool {
        match action {
            Action::CreateIn => &mut self.create_in,
            Action::Read => &mut self.read,
            Action::Write => &mut self.write,
            Action::Execute => &mut self.execute,
            Action::Delete => &mut self.delete,
        }
    }
}

impl BitOr for PermissionMask {
    type Output = PermissionMask;

    fn bitor(self, rhs: PermissionMask) -> PermissionMask {
        self.union(rhs)
    }
}

impl From<Action> for PermissionMask {
    fn from(action: Action) -> Self {
        Self::only(action)
    }
}

impl fmt::Display for PermissionMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = Action::ALL
            .iter()
            .filter(|a| self.allows(**a))
            .map(ToString::to_string)
            .collect();
        write!(f, "[{}]", names.join(","))
    }
}
