use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::coordinate::ArtifactCoordinate;
use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::util::atomic_write;

/// JSON sidecar stored next to every artifact as `<file>.meta.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub coordinate: ArtifactCoordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub sha256: Fingerprint,
    pub size: u64,
    pub created_millis: u64,
}

impl ArtifactMetadata {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        atomic_write(path, &bytes)
    }

    pub fn age_millis(&self, now_millis: u64) -> u64 {
        now_millis.saturating_sub(self.created_millis)
    }
}
