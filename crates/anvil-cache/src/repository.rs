use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::coordinate::ArtifactCoordinate;
use crate::error::{CacheError, Result};
use crate::fingerprint::Fingerprint;
use crate::lock::ArtifactLock;
use crate::metadata::ArtifactMetadata;
use crate::store::ArtifactStore;
use crate::util::{atomic_write_with, now_millis, remove_file_best_effort};

pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const METADATA_SUFFIX: &str = ".meta.json";
const LOCK_SUFFIX: &str = ".lock";

/// Maven-layout artifact repository on the local filesystem.
///
/// `<root>/<group path>/<artifactId>/<version>/<artifactId>-<version>[-<classifier>].<type>`
/// with a `.meta.json` sidecar. An artifact exists once both files are present;
/// the sidecar is written first and the content last.
#[derive(Clone, Debug)]
pub struct LocalRepository {
    root: PathBuf,
    snapshot_ttl: Duration,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            snapshot_ttl: DEFAULT_SNAPSHOT_TTL,
        }
    }

    /// How long a `-SNAPSHOT` artifact counts as present.
    #[must_use]
    pub fn with_snapshot_ttl(mut self, ttl: Duration) -> Self {
        self.snapshot_ttl = ttl;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact_path(&self, coordinate: &ArtifactCoordinate) -> PathBuf {
        self.root.join(coordinate.relative_path())
    }

    pub fn metadata_path(&self, coordinate: &ArtifactCoordinate) -> PathBuf {
        with_suffix(&self.artifact_path(coordinate), METADATA_SUFFIX)
    }

    fn lock_path(&self, coordinate: &ArtifactCoordinate) -> PathBuf {
        with_suffix(&self.artifact_path(coordinate), LOCK_SUFFIX)
    }

    pub fn metadata(&self, coordinate: &ArtifactCoordinate) -> Result<Option<ArtifactMetadata>> {
        match ArtifactMetadata::load(&self.metadata_path(coordinate)) {
            Ok(metadata) => Ok(Some(metadata)),
            Err(CacheError::Io(err)) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Deletes an artifact and its sidecar.
    pub fn remove(&self, coordinate: &ArtifactCoordinate) -> Result<()> {
        let _lock = ArtifactLock::acquire(&self.lock_path(coordinate))?;
        for path in [self.artifact_path(coordinate), self.metadata_path(coordinate)] {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        tracing::debug!(target: "anvil.cache", %coordinate, "removed artifact");
        Ok(())
    }
}

impl ArtifactStore for LocalRepository {
    fn exists(&self, coordinate: &ArtifactCoordinate) -> Result<bool> {
        if !self.artifact_path(coordinate).is_file() {
            return Ok(false);
        }
        let metadata = match self.metadata(coordinate) {
            Ok(Some(metadata)) => metadata,
            Ok(None) => return Ok(false),
            Err(CacheError::Json { message }) => {
                tracing::warn!(
                    target: "anvil.cache",
                    %coordinate,
                    error = %message,
                    "corrupt artifact metadata; treating as missing"
                );
                return Ok(false);
            }
            Err(err) => return Err(err),
        };

        if coordinate.is_snapshot() {
            let age = Duration::from_millis(metadata.age_millis(now_millis()));
            if age >= self.snapshot_ttl {
                tracing::debug!(
                    target: "anvil.cache",
                    %coordinate,
                    age_secs = age.as_secs(),
                    "snapshot artifact expired"
                );
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn fetch(&self, coordinate: &ArtifactCoordinate) -> Result<PathBuf> {
        if !self.exists(coordinate)? {
            return Err(CacheError::NotFound {
                coordinate: coordinate.to_string(),
            });
        }
        let path = self.artifact_path(coordinate);
        if let Some(metadata) = self.metadata(coordinate)? {
            let found = Fingerprint::from_file(&path)?;
            if found != metadata.sha256 {
                return Err(CacheError::ChecksumMismatch {
                    path,
                    expected: metadata.sha256.to_string(),
                    found: found.to_string(),
                });
            }
        }
        Ok(path)
    }

    fn store(
        &self,
        coordinate: &ArtifactCoordinate,
        content: &Path,
        description: Option<&str>,
    ) -> Result<PathBuf> {
        let _lock = ArtifactLock::acquire(&self.lock_path(coordinate))?;
        let path = self.artifact_path(coordinate);

        let sha256 = Fingerprint::from_file(content)?;
        let size = std::fs::metadata(content)?.len();
        let metadata = ArtifactMetadata {
            coordinate: coordinate.clone(),
            description: description.map(str::to_string),
            sha256,
            size,
            created_millis: now_millis(),
        };

        // Drop the old content first so a crash between the two writes leaves
        // a sidecar without content, which reads as a miss.
        if !remove_file_best_effort(&path, "store.replace") {
            return Err(io::Error::other(format!("cannot replace {}", path.display())).into());
        }
        metadata.save(&self.metadata_path(coordinate))?;
        atomic_write_with(&path, |out| {
            let mut reader = File::open(content)?;
            io::copy(&mut reader, out)?;
            Ok(())
        })?;

        tracing::info!(
            target: "anvil.cache",
            %coordinate,
            path = %path.display(),
            size,
            "stored artifact"
        );
        Ok(path)
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// `$ANVIL_REPOSITORY`, or `~/.anvil/repository`.
pub fn default_repository_root() -> Result<PathBuf> {
    if let Some(root) = std::env::var_os("ANVIL_REPOSITORY").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(root));
    }
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .ok_or(CacheError::MissingHomeDir)?;
    Ok(home.join(".anvil").join("repository"))
}
