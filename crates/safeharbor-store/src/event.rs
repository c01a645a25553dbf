//! Historical records: builds, scans, and scan parameters
//!
//! Events outlive the resources they describe. When a dockerfile or image is
//! deleted, the matching back-reference on its events is set to `None`.

use safeharbor_core::{ObjectId, Timestamp};
use serde::{Deserialize, Serialize};

/// One provider parameter of a scan config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterValue {
    /// Internal id
    pub id: ObjectId,
    /// Parameter name as the provider knows it
    pub name: String,
    /// Parameter value
    pub value: String,
    /// Owning scan config
    pub scan_config_id: ObjectId,
}

/// Result of scanning an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanEvent {
    /// Internal id
    pub id: ObjectId,
    /// When the scan finished
    pub when: Timestamp,
    /// User who requested the scan
    pub user_id: ObjectId,
    /// Config the scan ran with
    pub scan_config_id: Option<ObjectId>,
    /// Image that was scanned; `None` once the image is deleted
    pub docker_image_id: Option<ObjectId>,
    /// Provider that ran the scan
    pub provider_name: String,
    /// Parameters as they were at scan time
    pub parameter_values: Vec<(String, String)>,
    /// Provider-supplied score
    pub score: f64,
    /// Number of vulnerabilities reported
    pub vulnerability_count: usize,
}

/// Result of building an image from a dockerfile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerfileExecEvent {
    /// Internal id
    pub id: ObjectId,
    /// When the build finished
    pub when: Timestamp,
    /// User who requested the build
    pub user_id: ObjectId,
    /// Dockerfile that was built; `None` once it is deleted
    pub dockerfile_id: Option<ObjectId>,
    /// Resulting image; `None` once it is deleted
    pub docker_image_id: Option<ObjectId>,
    /// Output captured from the build tool
    pub build_output: String,
}
