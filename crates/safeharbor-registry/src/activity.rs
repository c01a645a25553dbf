//! Builds and scans
//!
//! Both operations authorize the caller, read what the collaborator needs,
//! release everything, await the collaborator, and only then lock and record
//! the outcome. A collaborator failure records nothing.

use crate::collaborators::{scan_score, BuildTool, ScanProvider};
use crate::registry::Registry;
use safeharbor_authorization::acl;
use safeharbor_core::{Action, HarborError, ObjectId, PermissionMask, Result};
use safeharbor_store::{DockerImage, DockerfileExecEvent, EntitySource, ResourceBase, ScanEvent};

impl Registry {
    /// Build a dockerfile into a new image owned by the caller
    ///
    /// Requires `Execute` on the dockerfile. The image lands in the
    /// dockerfile's repo and a build event is recorded on the dockerfile and
    /// on the user.
    pub async fn exec_dockerfile(
        &self,
        user_id: &ObjectId,
        dockerfile_id: &ObjectId,
        image_name: &str,
        build_tool: &dyn BuildTool,
    ) -> Result<(DockerImage, DockerfileExecEvent)> {
        if image_name.trim().is_empty() {
            return Err(HarborError::invalid("image name must not be empty"));
        }
        self.authorizer.require(user_id, Action::Execute, dockerfile_id)?;
        let (path, dockerfile_name, repo_id) = {
            let view = self.store.view();
            let dockerfile = view.dockerfile(dockerfile_id)?;
            let repo_id = dockerfile.resource.parent_id.clone().ok_or_else(|| {
                HarborError::internal(format!("dockerfile {dockerfile_id} has no parent repo"))
            })?;
            (
                dockerfile.external_file_path.clone(),
                dockerfile.resource.name.clone(),
                repo_id,
            )
        };

        let build_output = match build_tool.build(&path, image_name).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(%dockerfile_id, error = %e, "build failed");
                return Err(e);
            }
        };
        let saved = build_tool.save(image_name).await?;

        let _locks = self.store.lock_objects(&[
            repo_id.clone(),
            dockerfile_id.clone(),
            user_id.clone(),
        ])?;
        let now = self.now();
        let (image, event) = self.store.transaction(|tx| {
            tx.dockerfile(dockerfile_id)?;
            let base = ResourceBase::new(
                tx.create_id(),
                Some(repo_id.clone()),
                image_name,
                format!("built from {dockerfile_name}"),
                now,
            );
            let image_id = base.id.clone();
            let event = DockerfileExecEvent {
                id: tx.create_id(),
                when: now,
                user_id: user_id.clone(),
                dockerfile_id: Some(dockerfile_id.clone()),
                docker_image_id: Some(image_id.clone()),
                build_output: build_output.clone(),
            };
            let mut image = DockerImage::new(base, saved.signature.clone(), build_output.clone());
            image.build_event_id = Some(event.id.clone());

            tx.repo_mut(&repo_id)?.docker_image_ids.push(image_id.clone());
            tx.dockerfile_mut(dockerfile_id)?
                .exec_event_ids
                .push(event.id.clone());
            tx.user_mut(user_id)?.event_ids.push(event.id.clone());
            tx.insert(image)?;
            tx.insert(event.clone())?;
            acl::set_access(tx, &image_id, user_id, PermissionMask::FULL)?;
            Ok((tx.docker_image(&image_id)?.clone(), event))
        })?;
        tracing::info!(
            %dockerfile_id,
            docker_image_id = %image.resource.id,
            %user_id,
            path = %saved.path.display(),
            "dockerfile built"
        );
        Ok((image, event))
    }

    /// Scan an image with a scan config's provider and parameters
    ///
    /// Requires `Execute` on the scan config and `Read` on the image. The
    /// event is appended to the image's, the config's and the user's history.
    pub async fn scan_image(
        &self,
        user_id: &ObjectId,
        scan_config_id: &ObjectId,
        image_id: &ObjectId,
        provider: &dyn ScanProvider,
    ) -> Result<ScanEvent> {
        self.authorizer.require(user_id, Action::Execute, scan_config_id)?;
        self.authorizer.require(user_id, Action::Read, image_id)?;
        let (provider_name, parameters, image_ref) = {
            let view = self.store.view();
            let config = view.scan_config(scan_config_id)?;
            let mut parameters = Vec::with_capacity(config.parameter_value_ids.len());
            for id in &config.parameter_value_ids {
                let parameter = view.parameter_value(id)?;
                parameters.push((parameter.name.clone(), parameter.value.clone()));
            }
            let image = view.docker_image(image_id)?;
            (config.provider_name.clone(), parameters, image.resource.name.clone())
        };
        if provider.name() != provider_name {
            return Err(HarborError::invalid(format!(
                "scan config {scan_config_id} uses provider {provider_name:?}, not {:?}",
                provider.name()
            )));
        }

        let findings = match provider.scan(&image_ref, &parameters).await {
            Ok(findings) => findings,
            Err(e) => {
                tracing::warn!(%image_id, provider = %provider_name, error = %e, "scan failed");
                return Err(e);
            }
        };

        let _locks = self.store.lock_objects(&[
            scan_config_id.clone(),
            image_id.clone(),
            user_id.clone(),
        ])?;
        let now = self.now();
        let event = self.store.transaction(|tx| {
            let event = ScanEvent {
                id: tx.create_id(),
                when: now,
                user_id: user_id.clone(),
                scan_config_id: Some(scan_config_id.clone()),
                docker_image_id: Some(image_id.clone()),
                provider_name: provider_name.clone(),
                parameter_values: parameters.clone(),
                score: scan_score(&findings),
                vulnerability_count: findings.len(),
            };
            tx.docker_image_mut(image_id)?
                .scan_event_ids
                .push(event.id.clone());
            tx.scan_config_mut(scan_config_id)?
                .scan_event_ids
                .push(event.id.clone());
            tx.user_mut(user_id)?.event_ids.push(event.id.clone());
            tx.insert(event.clone())?;
            Ok(event)
        })?;
        tracing::info!(
            %image_id,
            %scan_config_id,
            %user_id,
            vulnerabilities = event.vulnerability_count,
            score = event.score,
            "image scanned"
        );
        Ok(event)
    }
}
