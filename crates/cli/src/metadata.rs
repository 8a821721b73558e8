//! Dataset metadata sidecars.
//!
//! Proposing a file writes `<stem>_metadata.json` next to it. The registry
//! never sees this file; it only helps reviewers identify a proposal.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub author: String,
    pub task: String,
    pub license: String,
    #[serde(default)]
    pub description: String,
    /// The dataset identifier, SHA-256 of the file contents.
    pub sha256: String,
}

impl DatasetMetadata {
    /// Path of the sidecar for `dataset`.
    pub fn sidecar_path(dataset: &Path) -> PathBuf {
        let stem = dataset
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        dataset.with_file_name(format!("{stem}_metadata.json"))
    }

    pub fn save(&self, dataset: &Path) -> Result<PathBuf> {
        let path = Self::sidecar_path(dataset);
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    /// Load the sidecar for `dataset`, if there is one.
    pub fn load(dataset: &Path) -> Result<Option<Self>> {
        let path = Self::sidecar_path(dataset);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let metadata = serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(metadata))
    }
}
