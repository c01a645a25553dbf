//! Store fixture
//!
//! Builds realms, parties and resources directly in the object store with
//! their parent/child and membership links in place, without going through
//! the registry's lifecycle operations. Useful for exercising the store, ACL
//! and engine layers in isolation.

use crate::clock::ManualClock;
use safeharbor_authorization::acl;
use safeharbor_core::{Clock, ObjectId, PermissionMask};
use safeharbor_store::{
    AclEntry, DockerImage, Dockerfile, Entity, Flag, Group, ObjectStore, PartyBase, Realm, Repo,
    ResourceBase, ScanConfig, Transaction, User,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Shared store and clock with helpers to populate them
#[derive(Debug, Clone)]
pub struct Fixture {
    store: Arc<ObjectStore>,
    clock: Arc<ManualClock>,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    /// Empty store, clock at a fixed instant
    pub fn new() -> Self {
        Self {
            store: Arc::new(ObjectStore::default()),
            clock: Arc::new(ManualClock::default()),
        }
    }

    /// The store
    pub fn store(&self) -> &Arc<ObjectStore> {
        &self.store
    }

    /// The clock
    pub fn clock(&self) -> &Arc<ManualClock> {
        &self.clock
    }

    fn resource_base(&self, parent: Option<&ObjectId>, name: &str) -> ResourceBase {
        ResourceBase::new(
            self.store.create_id(),
            parent.cloned(),
            name,
            format!("{name} (fixture)"),
            self.clock.now(),
        )
    }

    fn commit<F>(&self, f: F)
    where
        F: FnOnce(&mut Transaction<'_>) -> safeharbor_core::Result<()>,
    {
        self.store.transaction(f).expect("fixture transaction failed");
    }

    /// Realm with no admin yet
    pub fn realm(&self, name: &str) -> ObjectId {
        let realm = Realm::new(
            self.resource_base(None, name),
            ObjectId::new(""),
            format!("{name} Inc."),
            PathBuf::from(name),
        );
        let id = realm.id().clone();
        self.commit(|tx| tx.insert(realm));
        id
    }

    /// User belonging to `realm_id`
    pub fn user(&self, realm_id: &ObjectId, login: &str) -> ObjectId {
        self.user_with_hash(realm_id, login, Vec::new())
    }

    /// User with a specific stored password hash
    pub fn user_with_hash(&self, realm_id: &ObjectId, login: &str, password_hash: Vec<u8>) -> ObjectId {
        let party = PartyBase::new(self.store.create_id(), realm_id.clone(), login, self.clock.now());
        let user = User::new(party, login, format!("{login}@example.com"), password_hash);
        let id = user.id().clone();
        self.commit(|tx| {
            tx.realm_mut(realm_id)?.member_user_ids.push(id.clone());
            tx.insert(user)
        });
        id
    }

    /// Make `user_id` the realm's administrator
    pub fn make_admin(&self, realm_id: &ObjectId, user_id: &ObjectId) {
        self.commit(|tx| {
            tx.realm_mut(realm_id)?.admin_user_id = user_id.clone();
            Ok(())
        });
    }

    /// Group in `realm_id`
    pub fn group(&self, realm_id: &ObjectId, name: &str) -> ObjectId {
        let party = PartyBase::new(self.store.create_id(), realm_id.clone(), name, self.clock.now());
        let group = Group::new(party, format!("{name} (fixture)"));
        let id = group.id().clone();
        self.commit(|tx| {
            tx.realm_mut(realm_id)?.group_ids.push(id.clone());
            tx.insert(group)
        });
        id
    }

    /// Add `user_id` to `group_id` on both sides
    pub fn join(&self, group_id: &ObjectId, user_id: &ObjectId) {
        self.commit(|tx| {
            tx.group_mut(group_id)?.member_user_ids.push(user_id.clone());
            tx.user_mut(user_id)?.group_ids.push(group_id.clone());
            Ok(())
        });
    }

    /// Repo under `realm_id`
    pub fn repo(&self, realm_id: &ObjectId, name: &str) -> ObjectId {
        let repo = Repo::new(
            self.resource_base(Some(realm_id), name),
            PathBuf::from(realm_id.as_str()).join(name),
        );
        let id = repo.id().clone();
        self.commit(|tx| {
            tx.realm_mut(realm_id)?.repo_ids.push(id.clone());
            tx.insert(repo)
        });
        id
    }

    fn leaf<F>(&self, repo_id: &ObjectId, entity: Entity, link: F) -> ObjectId
    where
        F: FnOnce(&mut Repo) -> &mut Vec<ObjectId>,
    {
        let id = entity.id().clone();
        self.commit(|tx| {
            link(tx.repo_mut(repo_id)?).push(id.clone());
            tx.insert(entity)
        });
        id
    }

    /// Dockerfile under `repo_id`
    pub fn dockerfile(&self, repo_id: &ObjectId, name: &str) -> ObjectId {
        let dockerfile = Dockerfile::new(self.resource_base(Some(repo_id), name), PathBuf::from(name));
        self.leaf(repo_id, dockerfile.into(), |r| &mut r.dockerfile_ids)
    }

    /// Docker image under `repo_id`
    pub fn docker_image(&self, repo_id: &ObjectId, name: &str) -> ObjectId {
        let image = DockerImage::new(self.resource_base(Some(repo_id), name), "", "");
        self.leaf(repo_id, image.into(), |r| &mut r.docker_image_ids)
    }

    /// Scan config under `repo_id`, without a flag
    pub fn scan_config(&self, repo_id: &ObjectId, name: &str) -> ObjectId {
        let config = ScanConfig::new(self.resource_base(Some(repo_id), name), "clair", "score < 5", None);
        self.leaf(repo_id, config.into(), |r| &mut r.scan_config_ids)
    }

    /// Flag under `repo_id`
    pub fn flag(&self, repo_id: &ObjectId, name: &str) -> ObjectId {
        let flag = Flag::new(self.resource_base(Some(repo_id), name), PathBuf::from(format!("{name}.png")));
        self.leaf(repo_id, flag.into(), |r| &mut r.flag_ids)
    }

    /// Set the pair's mask through the ACL subsystem
    pub fn grant(&self, resource_id: &ObjectId, party_id: &ObjectId, mask: PermissionMask) -> AclEntry {
        self.store
            .transaction(|tx| acl::set_access(tx, resource_id, party_id, mask))
            .expect("fixture grant failed")
    }
}
