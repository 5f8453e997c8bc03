use std::path::{Path, PathBuf};

use crate::coordinate::ArtifactCoordinate;
use crate::error::Result;

/// Content store keyed by coordinate.
///
/// A cache miss is `Ok(false)` from [`exists`](Self::exists) or
/// `CacheError::NotFound` from [`fetch`](Self::fetch), never an I/O error.
pub trait ArtifactStore {
    fn exists(&self, coordinate: &ArtifactCoordinate) -> Result<bool>;

    /// Path of the stored artifact.
    fn fetch(&self, coordinate: &ArtifactCoordinate) -> Result<PathBuf>;

    /// Copies `content` into the store. The artifact becomes visible only once
    /// it is complete. Returns the stored path.
    fn store(
        &self,
        coordinate: &ArtifactCoordinate,
        content: &Path,
        description: Option<&str>,
    ) -> Result<PathBuf>;
}

impl<S: ArtifactStore + ?Sized> ArtifactStore for &S {
    fn exists(&self, coordinate: &ArtifactCoordinate) -> Result<bool> {
        (**self).exists(coordinate)
    }

    fn fetch(&self, coordinate: &ArtifactCoordinate) -> Result<PathBuf> {
        (**self).fetch(coordinate)
    }

    fn store(
        &self,
        coordinate: &ArtifactCoordinate,
        content: &Path,
        description: Option<&str>,
    ) -> Result<PathBuf> {
        (**self).store(coordinate, content, description)
    }
}
