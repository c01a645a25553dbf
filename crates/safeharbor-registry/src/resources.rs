//! Repo and leaf resource lifecycle
//!
//! Creating a resource links it into its parent's child list in the same
//! transaction. Deleting one revokes its ACL entries, unlinks it from the
//! parent and clears the back-references events hold to it. Events are never
//! deleted with the resources they describe.

use crate::config::RegistryConfig;
use crate::registry::{ensure_unique_resource_name, grant_owner, new_base, Registry};
use crate::requests::{NewResource, NewScanConfig, ScanConfigPatch};
use safeharbor_authorization::acl;
use safeharbor_core::{HarborError, ObjectId, Result};
use safeharbor_store::{
    DockerImage, Dockerfile, Entity, EntitySource, Flag, ParameterValue, Repo, ResourceBase,
    ScanConfig, Transaction,
};
use std::path::PathBuf;

/// A resource that lives directly under a repo
trait RepoChild: Clone + Into<Entity> {
    const LABEL: &'static str;

    fn siblings(repo: &mut Repo) -> &mut Vec<ObjectId>;

    fn from_entity(entity: &Entity) -> Option<&Self>;
}

macro_rules! repo_child {
    ($($ty:ty => $label:literal, $list:ident, $as_ref:ident;)*) => {
        $(
            impl RepoChild for $ty {
                const LABEL: &'static str = $label;

                fn siblings(repo: &mut Repo) -> &mut Vec<ObjectId> {
                    &mut repo.$list
                }

                fn from_entity(entity: &Entity) -> Option<&Self> {
                    entity.$as_ref()
                }
            }
        )*
    };
}

repo_child! {
    Dockerfile => "dockerfile", dockerfile_ids, as_dockerfile;
    DockerImage => "docker image", docker_image_ids, as_docker_image;
    ScanConfig => "scan config", scan_config_ids, as_scan_config;
    Flag => "flag", flag_ids, as_flag;
}

/// Parent of a non-realm resource; a missing one means the forest is corrupt
fn repo_of(resource: &ResourceBase) -> Result<ObjectId> {
    resource.parent_id.clone().ok_or_else(|| {
        HarborError::internal(format!("resource {} has no parent", resource.id))
    })
}

fn unlink_from_repo<T: RepoChild>(
    tx: &mut Transaction<'_>,
    repo_id: &ObjectId,
    id: &ObjectId,
) -> Result<()> {
    T::siblings(tx.repo_mut(repo_id)?).retain(|child| child != id);
    Ok(())
}

/// A flag may only be attached to scan configs of its own repo
fn check_flag(tx: &Transaction<'_>, repo_id: &ObjectId, flag_id: &ObjectId) -> Result<()> {
    let flag = tx.flag(flag_id)?;
    if flag.resource.parent_id.as_ref() != Some(repo_id) {
        return Err(HarborError::invalid(format!(
            "flag {flag_id} does not belong to repo {repo_id}"
        )));
    }
    Ok(())
}

fn insert_parameters(
    tx: &mut Transaction<'_>,
    scan_config_id: &ObjectId,
    parameters: &[(String, String)],
) -> Result<Vec<ObjectId>> {
    let mut ids = Vec::with_capacity(parameters.len());
    for (name, value) in parameters {
        let parameter = ParameterValue {
            id: tx.create_id(),
            name: name.clone(),
            value: value.clone(),
            scan_config_id: scan_config_id.clone(),
        };
        ids.push(parameter.id.clone());
        tx.insert(parameter)?;
    }
    Ok(ids)
}

fn remove_parameters(tx: &mut Transaction<'_>, parameter_ids: &[ObjectId]) -> Result<()> {
    for id in parameter_ids {
        tx.remove(id)?;
    }
    Ok(())
}

fn remove_dockerfile(tx: &mut Transaction<'_>, id: &ObjectId) -> Result<()> {
    let dockerfile = tx.dockerfile(id)?;
    let repo_id = repo_of(&dockerfile.resource)?;
    let event_ids = dockerfile.exec_event_ids.clone();
    acl::remove_all_access(tx, id)?;
    for event_id in &event_ids {
        tx.exec_event_mut(event_id)?.dockerfile_id = None;
    }
    unlink_from_repo::<Dockerfile>(tx, &repo_id, id)?;
    tx.remove(id)
}

fn remove_docker_image(tx: &mut Transaction<'_>, id: &ObjectId) -> Result<()> {
    let image = tx.docker_image(id)?;
    let repo_id = repo_of(&image.resource)?;
    let scan_event_ids = image.scan_event_ids.clone();
    let build_event_id = image.build_event_id.clone();
    acl::remove_all_access(tx, id)?;
    for event_id in &scan_event_ids {
        tx.scan_event_mut(event_id)?.docker_image_id = None;
    }
    if let Some(event_id) = &build_event_id {
        tx.exec_event_mut(event_id)?.docker_image_id = None;
    }
    unlink_from_repo::<DockerImage>(tx, &repo_id, id)?;
    tx.remove(id)
}

fn remove_scan_config(tx: &mut Transaction<'_>, id: &ObjectId) -> Result<()> {
    let config = tx.scan_config(id)?;
    if !config.scan_event_ids.is_empty() {
        return Err(HarborError::conflict(format!(
            "scan config {id} has {} recorded scans",
            config.scan_event_ids.len()
        )));
    }
    let repo_id = repo_of(&config.resource)?;
    let parameter_ids = config.parameter_value_ids.clone();
    let flag_id = config.flag_id.clone();
    acl::remove_all_access(tx, id)?;
    remove_parameters(tx, &parameter_ids)?;
    if let Some(flag_id) = &flag_id {
        tx.flag_mut(flag_id)?
            .used_by_scan_config_ids
            .retain(|config_id| config_id != id);
    }
    unlink_from_repo::<ScanConfig>(tx, &repo_id, id)?;
    tx.remove(id)
}

fn remove_flag(tx: &mut Transaction<'_>, id: &ObjectId) -> Result<()> {
    let flag = tx.flag(id)?;
    if !flag.used_by_scan_config_ids.is_empty() {
        return Err(HarborError::conflict(format!(
            "flag {id} is used by {} scan configs",
            flag.used_by_scan_config_ids.len()
        )));
    }
    let repo_id = repo_of(&flag.resource)?;
    acl::remove_all_access(tx, id)?;
    unlink_from_repo::<Flag>(tx, &repo_id, id)?;
    tx.remove(id)
}

impl Registry {
    fn create_in_repo<T, F>(
        &self,
        repo_id: &ObjectId,
        request: &NewResource,
        locks: &[ObjectId],
        make: F,
    ) -> Result<T>
    where
        T: RepoChild,
        F: FnOnce(&mut Transaction<'_>, ResourceBase) -> Result<T>,
    {
        request.validate(T::LABEL)?;
        let now = self.now();
        let mut resources = vec![repo_id.clone()];
        resources.extend(locks.iter().cloned());
        let _locks = self.lock_for_create(&resources, request)?;
        let child = self.store.transaction(|tx| {
            tx.repo(repo_id)?;
            let base = new_base(tx, Some(repo_id), request, now);
            let id = base.id.clone();
            let child = make(tx, base)?;
            T::siblings(tx.repo_mut(repo_id)?).push(id.clone());
            tx.insert(child)?;
            grant_owner(tx, &id, request)?;
            T::from_entity(tx.entity(&id)?)
                .cloned()
                .ok_or_else(|| HarborError::internal(format!("staged {} {id} vanished", T::LABEL)))
        })?;
        Ok(child)
    }

    /// Create a repo whose name is unique within `realm_id`
    pub fn create_repo(&self, realm_id: &ObjectId, request: NewResource) -> Result<Repo> {
        request.validate("repo")?;
        let now = self.now();
        let _locks = self.lock_for_create(std::slice::from_ref(realm_id), &request)?;
        let repo = self.store.transaction(|tx| {
            let realm = tx.realm(realm_id)?;
            let realm_directory = realm.file_directory.clone();
            let siblings = realm.repo_ids.clone();
            ensure_unique_resource_name(&*tx, "repo", &siblings, &request.name, None)?;

            let base = new_base(tx, Some(realm_id), &request, now);
            let id = base.id.clone();
            let repo = Repo::new(base, RegistryConfig::repo_directory(&realm_directory, &id));
            tx.realm_mut(realm_id)?.repo_ids.push(id.clone());
            tx.insert(repo)?;
            grant_owner(tx, &id, &request)?;
            Ok(tx.repo(&id)?.clone())
        })?;
        tracing::info!(repo_id = %repo.id(), %realm_id, name = %repo.resource.name, "repo created");
        Ok(repo)
    }

    /// Register a dockerfile stored at `external_file_path`
    pub fn create_dockerfile(
        &self,
        repo_id: &ObjectId,
        request: NewResource,
        external_file_path: PathBuf,
    ) -> Result<Dockerfile> {
        let dockerfile = self.create_in_repo(repo_id, &request, &[], |_, base| {
            Ok(Dockerfile::new(base, external_file_path))
        })?;
        tracing::info!(dockerfile_id = %dockerfile.resource.id, %repo_id, "dockerfile created");
        Ok(dockerfile)
    }

    /// Register an image built or imported outside [`Registry::exec_dockerfile`]
    pub fn create_docker_image(
        &self,
        repo_id: &ObjectId,
        request: NewResource,
        content_signature: &str,
        build_output: &str,
    ) -> Result<DockerImage> {
        let image = self.create_in_repo(repo_id, &request, &[], |_, base| {
            Ok(DockerImage::new(base, content_signature, build_output))
        })?;
        tracing::info!(docker_image_id = %image.resource.id, %repo_id, "docker image created");
        Ok(image)
    }

    /// Create a scan config, its parameter values and its flag link
    pub fn create_scan_config(&self, repo_id: &ObjectId, request: NewScanConfig) -> Result<ScanConfig> {
        let locks: Vec<ObjectId> = request.flag_id.iter().cloned().collect();
        let config = self.create_in_repo(repo_id, &request.resource, &locks, |tx, base| {
            let siblings = tx.repo(repo_id)?.scan_config_ids.clone();
            ensure_unique_resource_name(&*tx, "scan config", &siblings, &base.name, None)?;
            let id = base.id.clone();
            let mut config = ScanConfig::new(
                base,
                request.provider_name.clone(),
                request.success_expression.clone(),
                request.flag_id.clone(),
            );
            config.parameter_value_ids = insert_parameters(tx, &id, &request.parameters)?;
            if let Some(flag_id) = &request.flag_id {
                check_flag(tx, repo_id, flag_id)?;
                tx.flag_mut(flag_id)?.used_by_scan_config_ids.push(id);
            }
            Ok(config)
        })?;
        tracing::info!(scan_config_id = %config.resource.id, %repo_id, "scan config created");
        Ok(config)
    }

    /// Create a flag shown by `success_image_path`
    pub fn create_flag(
        &self,
        repo_id: &ObjectId,
        request: NewResource,
        success_image_path: PathBuf,
    ) -> Result<Flag> {
        let flag = self.create_in_repo(repo_id, &request, &[], |_, base| {
            Ok(Flag::new(base, success_image_path))
        })?;
        tracing::info!(flag_id = %flag.resource.id, %repo_id, "flag created");
        Ok(flag)
    }

    /// Delete a dockerfile; its build events remain with no dockerfile
    pub fn delete_dockerfile(&self, id: &ObjectId) -> Result<()> {
        let _locks = self.lock_for_update(&self.with_parent(id)?, &[])?;
        self.store.transaction(|tx| remove_dockerfile(tx, id))?;
        tracing::info!(dockerfile_id = %id, "dockerfile deleted");
        Ok(())
    }

    /// Delete an image; its scan and build events remain with no image
    pub fn delete_docker_image(&self, id: &ObjectId) -> Result<()> {
        let _locks = self.lock_for_update(&self.with_parent(id)?, &[])?;
        self.store.transaction(|tx| remove_docker_image(tx, id))?;
        tracing::info!(docker_image_id = %id, "docker image deleted");
        Ok(())
    }

    /// Delete a scan config and its parameters
    ///
    /// Refused with `Conflict` while the config has recorded scans.
    pub fn delete_scan_config(&self, id: &ObjectId) -> Result<()> {
        let mut resources = self.with_parent(id)?;
        resources.extend(self.store.view().scan_config(id)?.flag_id.iter().cloned());
        let _locks = self.lock_for_update(&resources, &[])?;
        self.store.transaction(|tx| remove_scan_config(tx, id))?;
        tracing::info!(scan_config_id = %id, "scan config deleted");
        Ok(())
    }

    /// Delete a flag; refused with `Conflict` while a scan config uses it
    pub fn delete_flag(&self, id: &ObjectId) -> Result<()> {
        let _locks = self.lock_for_update(&self.with_parent(id)?, &[])?;
        self.store.transaction(|tx| remove_flag(tx, id))?;
        tracing::info!(flag_id = %id, "flag deleted");
        Ok(())
    }

    /// Delete a repo and everything under it
    ///
    /// Refused with `Conflict` if any of its scan configs has recorded scans.
    pub fn delete_repo(&self, id: &ObjectId) -> Result<()> {
        let resources = {
            let view = self.store.view();
            let repo = view.repo(id)?;
            let mut resources: Vec<ObjectId> = repo.resource.parent_id.iter().cloned().collect();
            resources.push(id.clone());
            resources.extend(repo.child_ids().cloned());
            resources
        };
        let _locks = self.lock_for_update(&resources, &[])?;

        let removed = self.store.transaction(|tx| {
            let repo = tx.repo(id)?.clone();
            for config_id in &repo.scan_config_ids {
                if !tx.scan_config(config_id)?.scan_event_ids.is_empty() {
                    return Err(HarborError::conflict(format!(
                        "repo {id} has scan config {config_id} with recorded scans"
                    )));
                }
            }
            for config_id in &repo.scan_config_ids {
                remove_scan_config(tx, config_id)?;
            }
            for flag_id in &repo.flag_ids {
                remove_flag(tx, flag_id)?;
            }
            for image_id in &repo.docker_image_ids {
                remove_docker_image(tx, image_id)?;
            }
            for dockerfile_id in &repo.dockerfile_ids {
                remove_dockerfile(tx, dockerfile_id)?;
            }
            acl::remove_all_access(tx, id)?;
            let realm_id = repo_of(&repo.resource)?;
            tx.realm_mut(&realm_id)?.repo_ids.retain(|repo_id| repo_id != id);
            tx.remove(id)?;
            Ok(repo.child_ids().count())
        })?;
        tracing::info!(repo_id = %id, children = removed, "repo deleted");
        Ok(())
    }

    /// Apply `patch` to a scan config in one step
    pub fn update_scan_config(&self, id: &ObjectId, patch: ScanConfigPatch) -> Result<ScanConfig> {
        if patch.is_empty() {
            return Ok(self.store.view().scan_config(id)?.clone());
        }
        if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(HarborError::invalid("scan config name must not be empty"));
        }
        let mut resources = self.with_parent(id)?;
        resources.extend(self.store.view().scan_config(id)?.flag_id.iter().cloned());
        if let Some(Some(flag_id)) = &patch.flag_id {
            resources.push(flag_id.clone());
        }
        let _locks = self.store.lock_objects(&resources)?;

        let config = self.store.transaction(|tx| {
            let current = tx.scan_config(id)?.clone();
            let repo_id = repo_of(&current.resource)?;

            if let Some(name) = &patch.name {
                let siblings = tx.repo(&repo_id)?.scan_config_ids.clone();
                ensure_unique_resource_name(&*tx, "scan config", &siblings, name, Some(id))?;
            }
            let parameter_ids = match &patch.parameters {
                Some(parameters) => {
                    remove_parameters(tx, &current.parameter_value_ids)?;
                    Some(insert_parameters(tx, id, parameters)?)
                }
                None => None,
            };
            if let Some(new_flag) = &patch.flag_id {
                if new_flag != &current.flag_id {
                    if let Some(old_flag) = &current.flag_id {
                        tx.flag_mut(old_flag)?
                            .used_by_scan_config_ids
                            .retain(|config_id| config_id != id);
                    }
                    if let Some(flag_id) = new_flag {
                        check_flag(tx, &repo_id, flag_id)?;
                        tx.flag_mut(flag_id)?.used_by_scan_config_ids.push(id.clone());
                    }
                }
            }

            let config = tx.scan_config_mut(id)?;
            if let Some(name) = &patch.name {
                config.resource.name.clone_from(name);
            }
            if let Some(description) = &patch.description {
                config.resource.description.clone_from(description);
            }
            if let Some(provider_name) = &patch.provider_name {
                config.provider_name.clone_from(provider_name);
            }
            if let Some(expression) = &patch.success_expression {
                config.success_expression.clone_from(expression);
            }
            if let Some(ids) = parameter_ids {
                config.parameter_value_ids = ids;
            }
            if let Some(flag_id) = &patch.flag_id {
                config.flag_id.clone_from(flag_id);
            }
            Ok(config.clone())
        })?;
        tracing::info!(scan_config_id = %id, "scan config updated");
        Ok(config)
    }
}
