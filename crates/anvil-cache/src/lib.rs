//! Coordinate-keyed artifact repository used by every pipeline stage.
//!
//! ## On-disk layout
//!
//! Artifacts live under the repository root in maven layout:
//! - `<group path>/<artifactId>/<version>/<artifactId>-<version>[-<classifier>].<type>`:
//!   the artifact content
//! - `<file>.meta.json`: [`ArtifactMetadata`] (coordinate, sha256, size, creation time)
//! - `<file>.lock`: `fs2` lock file held while storing

mod coordinate;
mod error;
mod fingerprint;
mod lock;
mod metadata;
mod repository;
mod store;
mod util;

pub use coordinate::ArtifactCoordinate;
pub use error::{CacheError, Result};
pub use fingerprint::Fingerprint;
pub use lock::ArtifactLock;
pub use metadata::ArtifactMetadata;
pub use repository::{default_repository_root, LocalRepository, DEFAULT_SNAPSHOT_TTL};
pub use store::ArtifactStore;
pub use util::{atomic_write, atomic_write_with, now_millis};
