//! Object identifiers and the process-wide id generator
//!
//! Every persistent entity (party, resource, ACL entry, event) is keyed by an
//! [`ObjectId`]. Ids are minted by [`IdGenerator`] from a monotonically
//! increasing counter, so they are never reused, even after the entity they
//! named has been deleted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a stored entity
///
/// Internal ids are distinct from external-facing names such as a user's
/// login name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Wrap an existing id string, e.g. one parsed from a request
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty id, used where a parent or back-reference is absent
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Monotonic unique-id generator
///
/// The counter only moves forward. A store that reloads persisted entities
/// seeds the generator past the largest id it has seen.
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    /// Create a generator whose first id is `seed`
    pub fn starting_at(seed: u64) -> Self {
        Self {
            next: AtomicU64::new(seed),
        }
    }

    /// Mint the next id
    pub fn create_id(&self) -> ObjectId {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        ObjectId(n.to_string())
    }

    /// Advance the counter so that it will never mint `id` or anything below it
    ///
    /// Non-numeric ids are ignored; they cannot collide with minted ids.
    pub fn observe(&self, id: &ObjectId) {
        if let Ok(n) = id.as_str().parse::<u64>() {
            self.next.fetch_max(n.saturating_add(1), Ordering::SeqCst);
        }
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn ids_are_monotonic() {
        let gen = IdGenerator::default();
        let a: u64 = gen.create_id().as_str().parse().unwrap();
        let b: u64 = gen.create_id().as_str().parse().unwrap();
        assert!(b > a);
    }

    #[test]
    fn observe_skips_past_existing_ids() {
        let gen = IdGenerator::starting_at(5);
        gen.observe(&ObjectId::new("41"));
        gen.observe(&ObjectId::new("not-a-number"));
        assert_eq!(gen.create_id(), ObjectId::new("42"));
        // Observing an older id never moves the counter backwards
        gen.observe(&ObjectId::new("7"));
        assert_eq!(gen.create_id(), ObjectId::new("43"));
    }

    #[test]
    fn concurrent_generation_never_collides() {
        let gen = Arc::new(IdGenerator::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gen = Arc::clone(&gen);
                std::thread::spawn(move || (0..500).map(|_| gen.create_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id minted");
            }
        }
        assert_eq!(seen.len(), 4000);
    }
}
