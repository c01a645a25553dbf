//! External tools the registry drives
//!
//! Building images and scanning them happen outside this process. The
//! registry only calls these traits and records what they report; it never
//! holds a store lock across one of their `.await` points.

use async_trait::async_trait;
use safeharbor_core::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Image written to disk by [`BuildTool::save`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedImage {
    /// Where the image archive was written
    pub path: PathBuf,
    /// Content digest reported by the tool
    pub signature: String,
}

/// Container build tool
#[async_trait]
pub trait BuildTool: Send + Sync {
    /// Build the dockerfile at `dockerfile_path`, tagging the result; returns the build log
    async fn build(&self, dockerfile_path: &Path, tag: &str) -> Result<String>;

    /// Export a built image
    async fn save(&self, image_ref: &str) -> Result<SavedImage>;
}

/// One finding reported by a scanner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    /// Advisory identifier
    pub id: String,
    /// Provider-specific severity label
    pub severity: String,
    /// Severity score, higher is worse
    pub score: f64,
}

/// Vulnerability scanner
#[async_trait]
pub trait ScanProvider: Send + Sync {
    /// Name scan configs refer to this provider by
    fn name(&self) -> &str;

    /// Scan `image_ref` with the config's `(name, value)` parameters
    async fn scan(&self, image_ref: &str, params: &[(String, String)]) -> Result<Vec<Vulnerability>>;
}

/// Aggregate score of a scan: the worst finding, or zero for a clean image
pub fn scan_score(findings: &[Vulnerability]) -> f64 {
    findings.iter().map(|v| v.score).fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(score: f64) -> Vulnerability {
        Vulnerability {
            id: format!("CVE-{score}"),
            severity: "high".to_string(),
            score,
        }
    }

    #[test]
    fn score_is_worst_finding() {
        assert_eq!(scan_score(&[]), 0.0);
        assert_eq!(scan_score(&[finding(3.5), finding(9.1), finding(7.0)]), 9.1);
    }
}
