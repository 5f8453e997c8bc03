//! The build pipeline: download the game jar, fetch and apply mappings,
//! decompile, extract resources and maintain the patched source repository.
//!
//! Every expensive stage is a [`CachedStage`]: its output coordinate is
//! derived from the configuration, and a present artifact is reused instead
//! of recomputed. Stages share nothing but the artifact store.

mod decompile;
mod error;
mod http;
mod launcher;
mod pipeline;
mod stage;
pub mod stages;
pub mod temp;

pub use crate::decompile::{
    CommandDecompiler, Decompiler, FormatError, Formatter, NormalizingFormatter,
};
pub use crate::error::{PipelineError, Result};
pub use crate::http::HttpClient;
pub use crate::launcher::{
    Download as GameDownload, Downloads, VersionEntry, VersionManifest, VersionMetadata,
    VersionType,
};
pub use crate::pipeline::{BuildReport, Collaborators, Pipeline};
pub use crate::stage::{in_stage, run_cached, CachedStage, StageContext, LIVE_MAPPING_VERSION};
