//! Object store
//!
//! The authoritative keyed collection of every entity, plus two auxiliary
//! indices: user-by-login-name and the list of realm ids.
//!
//! Mutations go through [`ObjectStore::transaction`]. A [`Transaction`]
//! stages inserts, copy-on-write modifications and deletions in an overlay;
//! the overlay is applied atomically, indices included, only if the closure
//! succeeds. A failed closure leaves the store exactly as it was, so no
//! observer ever sees a child linked to a parent that does not list it, or an
//! ACL entry indexed on only one side.
//!
//! Deletion is soft with respect to ids: a deleted id is tombstoned and can
//! never be added again.

use crate::config::StoreConfig;
use crate::entity::Entity;
use crate::lock::{LockManager, ObjectLocks};
use crate::party::User;
use crate::source::{missing, wrong_kind, EntitySource};
use crate::{
    AclEntry, DockerImage, Dockerfile, DockerfileExecEvent, Flag, Group, ParameterValue, Realm,
    Repo, ScanConfig, ScanEvent,
};
use parking_lot::{RwLock, RwLockReadGuard};
use safeharbor_core::{HarborError, IdGenerator, ObjectId, Result};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
struct StoreState {
    entities: HashMap<ObjectId, Entity>,
    tombstones: HashSet<ObjectId>,
    users_by_login: HashMap<String, ObjectId>,
    realm_ids: Vec<ObjectId>,
}

impl StoreState {
    fn is_taken(&self, id: &ObjectId) -> bool {
        self.entities.contains_key(id) || self.tombstones.contains(id)
    }

    fn apply(&mut self, changes: Changes) -> Result<()> {
        self.check_logins(&changes)?;
        let Changes { mut staged, order } = changes;
        for id in order {
            match staged.remove(&id) {
                Some(Staged::Put(entity)) => self.put_entity(entity),
                Some(Staged::Removed) => self.remove_entity(&id),
                None => {}
            }
        }
        Ok(())
    }

    /// Login names must stay unique after the changes are applied
    fn check_logins(&self, changes: &Changes) -> Result<()> {
        let base_login = |id: &ObjectId| {
            self.entities
                .get(id)
                .and_then(Entity::as_user)
                .map(|u| u.login_name.as_str())
        };

        let mut released = HashSet::new();
        for (id, change) in &changes.staged {
            if let Some(old_login) = base_login(id) {
                let kept = matches!(change, Staged::Put(Entity::User(u)) if u.login_name == old_login);
                if !kept {
                    released.insert(old_login);
                }
            }
        }

        let mut claimed: HashMap<&str, &ObjectId> = HashMap::new();
        for (id, change) in &changes.staged {
            let Staged::Put(Entity::User(user)) = change else {
                continue;
            };
            let login = user.login_name.as_str();
            if base_login(id) == Some(login) {
                continue;
            }
            let owned_elsewhere = self
                .users_by_login
                .get(login)
                .is_some_and(|owner| owner != id && !released.contains(login));
            if owned_elsewhere || claimed.insert(login, id).is_some() {
                return Err(HarborError::already_exists(format!(
                    "login name {login:?} is already in use"
                )));
            }
        }
        Ok(())
    }

    fn put_entity(&mut self, entity: Entity) {
        let id = entity.id().clone();
        if let Some(old_user) = self.entities.get(&id).and_then(Entity::as_user) {
            let login = old_user.login_name.clone();
            self.unindex_login(&login, &id);
        }
        match &entity {
            Entity::User(user) => {
                self.users_by_login
                    .insert(user.login_name.clone(), id.clone());
            }
            Entity::Realm(_) if !self.realm_ids.contains(&id) => {
                self.realm_ids.push(id.clone());
            }
            _ => {}
        }
        self.entities.insert(id, entity);
    }

    fn unindex_login(&mut self, login: &str, id: &ObjectId) {
        if self.users_by_login.get(login) == Some(id) {
            self.users_by_login.remove(login);
        }
    }

    fn remove_entity(&mut self, id: &ObjectId) {
        if let Some(old) = self.entities.remove(id) {
            match old {
                Entity::User(user) => self.unindex_login(&user.login_name, id),
                Entity::Realm(_) => self.realm_ids.retain(|r| r != id),
                _ => {}
            }
        }
        self.tombstones.insert(id.clone());
    }
}

/// In-memory object store shared by every service
#[derive(Debug)]
pub struct ObjectStore {
    state: RwLock<StoreState>,
    ids: IdGenerator,
    locks: LockManager,
    config: StoreConfig,
}

impl ObjectStore {
    /// Empty store
    pub fn new(config: StoreConfig) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            ids: IdGenerator::starting_at(config.id_seed),
            locks: LockManager::new(),
            config,
        }
    }

    /// Store preloaded with previously persisted entities
    ///
    /// The id generator is advanced past every loaded id.
    pub fn from_entities<I>(config: StoreConfig, entities: I) -> Result<Self>
    where
        I: IntoIterator<Item = Entity>,
    {
        let store = Self::new(config);
        store.transaction(|tx| {
            for entity in entities {
                tx.ids.observe(entity.id());
                tx.insert(entity)?;
            }
            Ok(())
        })?;
        Ok(store)
    }

    /// Store configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Mint a fresh, never reused id
    pub fn create_id(&self) -> ObjectId {
        self.ids.create_id()
    }

    /// Consistent read-only view; holds the store's read lock until dropped
    ///
    /// Do not open a transaction on the same thread while a view is alive.
    pub fn view(&self) -> StoreView<'_> {
        StoreView {
            state: self.state.read(),
        }
    }

    /// Run `f` against a staged overlay and commit it atomically on success
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T>,
    {
        let mut state = self.state.write();
        let (outcome, changes) = {
            let mut tx = Transaction::new(&state, &self.ids);
            let outcome = f(&mut tx);
            (outcome, tx.into_changes())
        };
        let value = outcome?;
        state.apply(changes)?;
        Ok(value)
    }

    /// Lock `ids` in canonical order using the configured timeout
    ///
    /// Callers may list ids in any order; see [`ObjectStore::lock_order`].
    /// Must not be called while a view is alive on the same thread.
    pub fn lock_objects(&self, ids: &[ObjectId]) -> Result<ObjectLocks<'_>> {
        let ordered = self.lock_order(ids);
        self.locks.acquire_all(&ordered, self.config.lock_timeout())
    }

    /// `ids` deduplicated and sorted by kind rank, then by id
    ///
    /// Parents come before children and resources before parties, and two
    /// lock sets that overlap are always taken in the same relative order.
    /// Ids with no live entity sort last.
    pub fn lock_order(&self, ids: &[ObjectId]) -> Vec<ObjectId> {
        let state = self.state.read();
        let mut keyed: Vec<(u8, &ObjectId)> = ids
            .iter()
            .map(|id| {
                let rank = state
                    .entities
                    .get(id)
                    .map_or(u8::MAX, |entity| entity.kind().lock_rank());
                (rank, id)
            })
            .collect();
        keyed.sort();
        keyed.dedup();
        keyed.into_iter().map(|(_, id)| id.clone()).collect()
    }

    /// The per-object lock table
    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    /// Insert a new entity; an id already in use is an internal error
    pub fn add(&self, entity: Entity) -> Result<()> {
        self.transaction(|tx| tx.insert(entity))
    }

    /// Copy of the entity with this id
    pub fn get(&self, id: &ObjectId) -> Result<Entity> {
        self.view().entity(id).cloned()
    }

    /// Replace an existing entity
    pub fn update(&self, entity: Entity) -> Result<()> {
        self.transaction(|tx| tx.put(entity))
    }

    /// Delete an entity, tombstoning its id
    pub fn delete(&self, id: &ObjectId) -> Result<()> {
        self.transaction(|tx| tx.remove(id))
    }

    /// Copy of the user with this login name
    pub fn user_by_login(&self, login_name: &str) -> Result<User> {
        self.view().user_by_login(login_name).cloned()
    }

    /// Ids of every realm
    pub fn realm_ids(&self) -> Vec<ObjectId> {
        self.view().realm_ids()
    }

    /// Copy of every live entity, in no particular order
    pub fn snapshot(&self) -> Vec<Entity> {
        self.state.read().entities.values().cloned().collect()
    }
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

/// Read-only snapshot of the store
pub struct StoreView<'a> {
    state: RwLockReadGuard<'a, StoreState>,
}

impl EntitySource for StoreView<'_> {
    fn lookup(&self, id: &ObjectId) -> Option<&Entity> {
        self.state.entities.get(id)
    }

    fn user_id_by_login(&self, login_name: &str) -> Option<ObjectId> {
        self.state.users_by_login.get(login_name).cloned()
    }

    fn realm_ids(&self) -> Vec<ObjectId> {
        self.state.realm_ids.clone()
    }
}

#[derive(Debug)]
enum Staged {
    Put(Entity),
    Removed,
}

#[derive(Debug, Default)]
struct Changes {
    staged: HashMap<ObjectId, Staged>,
    order: Vec<ObjectId>,
}

/// Staged overlay over the store
///
/// Reads see the transaction's own writes. Nothing is visible to other
/// tasks until [`ObjectStore::transaction`] commits.
pub struct Transaction<'a> {
    base: &'a StoreState,
    ids: &'a IdGenerator,
    changes: Changes,
}

macro_rules! typed_mut {
    ($($name:ident => $ty:ty, $as_mut:ident, $label:literal;)*) => {
        $(
            #[doc = concat!("Stage a modification of the ", $label, " `id`")]
            pub fn $name(&mut self, id: &ObjectId) -> Result<&mut $ty> {
                let entity = self.entity_mut(id)?;
                let kind = entity.kind();
                entity.$as_mut().ok_or_else(|| wrong_kind(id, $label, kind))
            }
        )*
    };
}

impl<'a> Transaction<'a> {
    fn new(base: &'a StoreState, ids: &'a IdGenerator) -> Self {
        Self {
            base,
            ids,
            changes: Changes::default(),
        }
    }

    fn into_changes(self) -> Changes {
        self.changes
    }

    fn stage(&mut self, id: ObjectId, change: Staged) {
        if !self.changes.staged.contains_key(&id) {
            self.changes.order.push(id.clone());
        }
        self.changes.staged.insert(id, change);
    }

    /// Mint a fresh id
    pub fn create_id(&mut self) -> ObjectId {
        self.ids.create_id()
    }

    /// Stage a new entity
    ///
    /// Adding an id that is live, tombstoned or already staged means the id
    /// generator is broken; that is an internal error, not a caller error.
    pub fn insert(&mut self, entity: impl Into<Entity>) -> Result<()> {
        let entity = entity.into();
        let id = entity.id().clone();
        if self.base.is_taken(&id) || self.changes.staged.contains_key(&id) {
            return Err(HarborError::internal(format!(
                "object id {id} is already in use"
            )));
        }
        self.stage(id, Staged::Put(entity));
        Ok(())
    }

    /// Stage a replacement of an existing entity
    pub fn put(&mut self, entity: impl Into<Entity>) -> Result<()> {
        let entity = entity.into();
        let id = entity.id().clone();
        if !self.contains(&id) {
            return Err(missing(&id));
        }
        self.stage(id, Staged::Put(entity));
        Ok(())
    }

    /// Stage a deletion
    pub fn remove(&mut self, id: &ObjectId) -> Result<()> {
        if !self.contains(id) {
            return Err(missing(id));
        }
        self.stage(id.clone(), Staged::Removed);
        Ok(())
    }

    /// Mutable access to an entity, copied into the overlay on first use
    pub fn entity_mut(&mut self, id: &ObjectId) -> Result<&mut Entity> {
        if !self.changes.staged.contains_key(id) {
            let current = self.base.entities.get(id).cloned().ok_or_else(|| missing(id))?;
            self.stage(id.clone(), Staged::Put(current));
        }
        match self.changes.staged.get_mut(id) {
            Some(Staged::Put(entity)) => Ok(entity),
            _ => Err(missing(id)),
        }
    }

    typed_mut! {
        user_mut => User, as_user_mut, "user";
        group_mut => Group, as_group_mut, "group";
        realm_mut => Realm, as_realm_mut, "realm";
        repo_mut => Repo, as_repo_mut, "repo";
        dockerfile_mut => Dockerfile, as_dockerfile_mut, "dockerfile";
        docker_image_mut => DockerImage, as_docker_image_mut, "docker image";
        scan_config_mut => ScanConfig, as_scan_config_mut, "scan config";
        flag_mut => Flag, as_flag_mut, "flag";
        acl_entry_mut => AclEntry, as_acl_entry_mut, "acl entry";
        parameter_value_mut => ParameterValue, as_parameter_value_mut, "parameter value";
        scan_event_mut => ScanEvent, as_scan_event_mut, "scan event";
        exec_event_mut => DockerfileExecEvent, as_exec_event_mut, "dockerfile exec event";
    }

    /// Mutable common party fields of `id`
    pub fn party_mut(&mut self, id: &ObjectId) -> Result<&mut crate::PartyBase> {
        let entity = self.entity_mut(id)?;
        let kind = entity.kind();
        entity.party_mut().ok_or_else(|| wrong_kind(id, "party", kind))
    }

    /// Mutable common resource fields of `id`
    pub fn resource_mut(&mut self, id: &ObjectId) -> Result<&mut crate::ResourceBase> {
        let entity = self.entity_mut(id)?;
        let kind = entity.kind();
        entity
            .resource_mut()
            .ok_or_else(|| wrong_kind(id, "resource", kind))
    }
}

impl EntitySource for Transaction<'_> {
    fn lookup(&self, id: &ObjectId) -> Option<&Entity> {
        match self.changes.staged.get(id) {
            Some(Staged::Put(entity)) => Some(entity),
            Some(Staged::Removed) => None,
            None => self.base.entities.get(id),
        }
    }

    fn user_id_by_login(&self, login_name: &str) -> Option<ObjectId> {
        let staged = self.changes.order.iter().find(|id| {
            matches!(
                self.changes.staged.get(*id),
                Some(Staged::Put(Entity::User(u))) if u.login_name == login_name
            )
        });
        if let Some(id) = staged {
            return Some(id.clone());
        }
        // The indexed owner may have been renamed or removed in this overlay
        self.base
            .users_by_login
            .get(login_name)
            .filter(|id| {
                self.lookup(id)
                    .and_then(Entity::as_user)
                    .is_some_and(|u| u.login_name == login_name)
            })
            .cloned()
    }

    fn realm_ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self
            .base
            .realm_ids
            .iter()
            .filter(|id| self.lookup(id).is_some())
            .cloned()
            .collect();
        for id in &self.changes.order {
            if !ids.contains(id) && self.lookup(id).and_then(Entity::as_realm).is_some() {
                ids.push(id.clone());
            }
        }
        ids
    }
}
