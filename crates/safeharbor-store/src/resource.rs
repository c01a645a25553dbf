//! Resources: the forest of things parties act on
//!
//! Realm is the root. Repos hang off realms; dockerfiles, images, scan
//! configs and flags hang off repos. A resource's parent is fixed when it is
//! created and never repointed, which keeps the forest acyclic.

use safeharbor_core::{ObjectId, Timestamp};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Fields every resource carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBase {
    /// Internal id
    pub id: ObjectId,
    /// Name, unique among siblings where the lifecycle operations require it
    pub name: String,
    /// Free-form description
    pub description: String,
    /// When the resource was created
    pub creation_time: Timestamp,
    /// Owning resource; `None` only for realms
    pub parent_id: Option<ObjectId>,
    /// ACL entries naming this resource
    pub acl_entry_ids: Vec<ObjectId>,
}

impl ResourceBase {
    /// Resource with no ACL entries
    pub fn new(
        id: ObjectId,
        parent_id: Option<ObjectId>,
        name: impl Into<String>,
        description: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            creation_time: now,
            parent_id,
            acl_entry_ids: Vec::new(),
        }
    }
}

/// Tenant root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Realm {
    /// Common resource fields
    pub resource: ResourceBase,
    /// User administering the realm
    pub admin_user_id: ObjectId,
    /// Organization's full legal name
    pub org_full_name: String,
    /// Users belonging to the realm
    pub member_user_ids: Vec<ObjectId>,
    /// Groups defined in the realm
    pub group_ids: Vec<ObjectId>,
    /// Repositories in the realm
    pub repo_ids: Vec<ObjectId>,
    /// Directory holding the realm's artifacts
    pub file_directory: PathBuf,
}

impl Realm {
    /// Empty realm
    pub fn new(
        resource: ResourceBase,
        admin_user_id: ObjectId,
        org_full_name: impl Into<String>,
        file_directory: PathBuf,
    ) -> Self {
        Self {
            resource,
            admin_user_id,
            org_full_name: org_full_name.into(),
            member_user_ids: Vec::new(),
            group_ids: Vec::new(),
            repo_ids: Vec::new(),
            file_directory,
        }
    }

    /// Internal id
    pub fn id(&self) -> &ObjectId {
        &self.resource.id
    }
}

/// Repository of build files, images, scan configs and flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repo {
    /// Common resource fields; parent is the realm
    pub resource: ResourceBase,
    /// Dockerfiles
    pub dockerfile_ids: Vec<ObjectId>,
    /// Built images
    pub docker_image_ids: Vec<ObjectId>,
    /// Scan configurations
    pub scan_config_ids: Vec<ObjectId>,
    /// Success/failure flags
    pub flag_ids: Vec<ObjectId>,
    /// Directory holding the repo's artifacts
    pub file_directory: PathBuf,
}

impl Repo {
    /// Empty repo
    pub fn new(resource: ResourceBase, file_directory: PathBuf) -> Self {
        Self {
            resource,
            dockerfile_ids: Vec::new(),
            docker_image_ids: Vec::new(),
            scan_config_ids: Vec::new(),
            flag_ids: Vec::new(),
            file_directory,
        }
    }

    /// Internal id
    pub fn id(&self) -> &ObjectId {
        &self.resource.id
    }

    /// Every child resource id, in dockerfile, image, scan config, flag order
    pub fn child_ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.dockerfile_ids
            .iter()
            .chain(&self.docker_image_ids)
            .chain(&self.scan_config_ids)
            .chain(&self.flag_ids)
    }
}

/// Build file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dockerfile {
    /// Common resource fields; parent is the repo
    pub resource: ResourceBase,
    /// Where the build file is stored
    pub external_file_path: PathBuf,
    /// Builds run from this file
    pub exec_event_ids: Vec<ObjectId>,
}

impl Dockerfile {
    /// Dockerfile with no builds
    pub fn new(resource: ResourceBase, external_file_path: PathBuf) -> Self {
        Self {
            resource,
            external_file_path,
            exec_event_ids: Vec::new(),
        }
    }
}

/// Built container image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerImage {
    /// Common resource fields; parent is the repo
    pub resource: ResourceBase,
    /// Scans of this image, oldest first
    pub scan_event_ids: Vec<ObjectId>,
    /// Digest of the image content
    pub content_signature: String,
    /// Output captured from the build tool
    pub build_output: String,
    /// Build that produced this image, if it was built here
    #[serde(default)]
    pub build_event_id: Option<ObjectId>,
}

impl DockerImage {
    /// Unscanned image
    pub fn new(
        resource: ResourceBase,
        content_signature: impl Into<String>,
        build_output: impl Into<String>,
    ) -> Self {
        Self {
            resource,
            scan_event_ids: Vec::new(),
            content_signature: content_signature.into(),
            build_output: build_output.into(),
            build_event_id: None,
        }
    }

    /// Most recent scan, if any
    pub fn latest_scan_event_id(&self) -> Option<&ObjectId> {
        self.scan_event_ids.last()
    }
}

/// Binding of a repo to an external scan provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Common resource fields; parent is the repo
    pub resource: ResourceBase,
    /// Name of the scan provider
    pub provider_name: String,
    /// Provider parameters
    pub parameter_value_ids: Vec<ObjectId>,
    /// Expression deciding whether a scan passed
    pub success_expression: String,
    /// Flag shown for this config's results
    pub flag_id: Option<ObjectId>,
    /// Scans run with this config
    pub scan_event_ids: Vec<ObjectId>,
}

impl ScanConfig {
    /// Config with no parameters or history
    pub fn new(
        resource: ResourceBase,
        provider_name: impl Into<String>,
        success_expression: impl Into<String>,
        flag_id: Option<ObjectId>,
    ) -> Self {
        Self {
            resource,
            provider_name: provider_name.into(),
            parameter_value_ids: Vec::new(),
            success_expression: success_expression.into(),
            flag_id,
            scan_event_ids: Vec::new(),
        }
    }
}

/// Success/failure graphic referenced by scan configs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    /// Common resource fields; parent is the repo
    pub resource: ResourceBase,
    /// Image shown on success
    pub success_image_path: PathBuf,
    /// Scan configs pointing at this flag
    pub used_by_scan_config_ids: Vec<ObjectId>,
}

impl Flag {
    /// Unused flag
    pub fn new(resource: ResourceBase, success_image_path: PathBuf) -> Self {
        Self {
            resource,
            success_image_path,
            used_by_scan_config_ids: Vec::new(),
        }
    }
}
