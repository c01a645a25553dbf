//! Per-object advisory locks
//!
//! Multi-step mutations hold the locks of every entity they touch for their
//! whole duration. Locks are taken in a fixed order to avoid deadlock:
//! parent before child, resource before party. The manager takes ids in the
//! order it is given; `ObjectStore::lock_objects` sorts them first.
//! Acquisition waits at most the given timeout and then fails with
//! `LockTimeout`.

use parking_lot::{Condvar, Mutex};
use safeharbor_core::{HarborError, ObjectId, Result};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Table of currently held object locks
#[derive(Debug, Default)]
pub struct LockManager {
    held: Mutex<HashSet<ObjectId>>,
    released: Condvar,
}

impl LockManager {
    /// Empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock on `id`, waiting at most `timeout`
    pub fn acquire(&self, id: &ObjectId, timeout: Duration) -> Result<ObjectLock<'_>> {
        self.acquire_until(id, Instant::now() + timeout)
    }

    /// Acquire the locks on `ids` in the given order
    ///
    /// Duplicate ids are locked once. All acquisitions share one deadline; on
    /// timeout the locks already taken are released before returning.
    pub fn acquire_all(&self, ids: &[ObjectId], timeout: Duration) -> Result<ObjectLocks<'_>> {
        let deadline = Instant::now() + timeout;
        let mut seen = HashSet::new();
        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            if !seen.insert(id) {
                continue;
            }
            guards.push(self.acquire_until(id, deadline)?);
        }
        Ok(ObjectLocks { _guards: guards })
    }

    /// Whether some task currently holds the lock on `id`
    pub fn is_locked(&self, id: &ObjectId) -> bool {
        self.held.lock().contains(id)
    }

    fn acquire_until(&self, id: &ObjectId, deadline: Instant) -> Result<ObjectLock<'_>> {
        let mut held = self.held.lock();
        while held.contains(id) {
            if self.released.wait_until(&mut held, deadline).timed_out() && held.contains(id) {
                tracing::warn!(object_id = %id, "timed out waiting for object lock");
                return Err(HarborError::lock_timeout(format!(
                    "could not lock object {id} in time"
                )));
            }
        }
        held.insert(id.clone());
        Ok(ObjectLock {
            manager: self,
            id: id.clone(),
        })
    }

    fn release(&self, id: &ObjectId) {
        self.held.lock().remove(id);
        self.released.notify_all();
    }
}

/// Guard for one object lock, released on drop
#[derive(Debug)]
pub struct ObjectLock<'a> {
    manager: &'a LockManager,
    id: ObjectId,
}

impl ObjectLock<'_> {
    /// Id of the locked object
    pub fn id(&self) -> &ObjectId {
        &self.id
    }
}

impl Drop for ObjectLock<'_> {
    fn drop(&mut self) {
        self.manager.release(&self.id);
    }
}

/// Guards for a set of object locks, released together on drop
#[derive(Debug)]
pub struct ObjectLocks<'a> {
    _guards: Vec<ObjectLock<'a>>,
}
