//! Launcher metadata: the version manifest and per-version downloads.

use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::http::HttpClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionType {
    OldAlpha,
    OldBeta,
    Snapshot,
    Release,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: VersionType,
    /// Location of the version metadata.
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VersionManifest {
    pub versions: Vec<VersionEntry>,
}

impl VersionManifest {
    pub fn fetch(http: &HttpClient, url: &str) -> Result<Self> {
        let manifest: Self = http.get_json(url)?;
        tracing::debug!(
            target: "anvil.pipeline",
            url,
            versions = manifest.versions.len(),
            "fetched version manifest"
        );
        Ok(manifest)
    }

    pub fn find(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|entry| entry.id == id)
    }

    pub fn require(&self, id: &str) -> Result<&VersionEntry> {
        self.find(id).ok_or_else(|| PipelineError::UnknownVersion {
            version: id.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Download {
    pub sha1: String,
    #[serde(default)]
    pub size: Option<u64>,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Downloads {
    #[serde(default)]
    pub client: Option<Download>,
    #[serde(default)]
    pub server: Option<Download>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VersionMetadata {
    pub id: String,
    #[serde(default)]
    pub downloads: Downloads,
}

impl VersionMetadata {
    pub fn fetch(http: &HttpClient, entry: &VersionEntry) -> Result<Self> {
        http.get_json(&entry.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn manifest_versions_deserialize() {
        let manifest: VersionManifest = serde_json::from_str(
            r#"{
                "latest": { "release": "1.12.2", "snapshot": "17w50a" },
                "versions": [
                    { "id": "17w50a", "type": "snapshot", "url": "https://example.invalid/17w50a.json", "time": "2017-12-11T00:00:00+00:00" },
                    { "id": "1.12.2", "type": "release", "url": "https://example.invalid/1.12.2.json" },
                    { "id": "b1.7.3", "type": "old_beta", "url": "https://example.invalid/b1.7.3.json" },
                    { "id": "x", "type": "experiment", "url": "https://example.invalid/x.json" }
                ]
            }"#,
        )
        .unwrap();

        let kinds: Vec<VersionType> = manifest.versions.iter().map(|v| v.kind).collect();
        assert_eq!(
            kinds,
            vec![
                VersionType::Snapshot,
                VersionType::Release,
                VersionType::OldBeta,
                VersionType::Unknown
            ]
        );
        assert_eq!(
            manifest.require("1.12.2").unwrap().url,
            "https://example.invalid/1.12.2.json"
        );
        assert!(matches!(
            manifest.require("1.99"),
            Err(PipelineError::UnknownVersion { .. })
        ));
    }

    #[test]
    fn metadata_without_server_download() {
        let metadata: VersionMetadata = serde_json::from_str(
            r#"{ "id": "a1.0.4", "downloads": { "client": { "sha1": "abc", "size": 3, "url": "https://example.invalid/client.jar" } } }"#,
        )
        .unwrap();
        assert!(metadata.downloads.server.is_none());
        assert_eq!(metadata.downloads.client.unwrap().size, Some(3));
    }
}
