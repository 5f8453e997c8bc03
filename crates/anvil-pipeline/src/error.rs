use std::path::PathBuf;

use anvil_access::AccessError;
use anvil_archive::ArchiveError;
use anvil_cache::CacheError;
use anvil_config::ConfigError;
use anvil_mappings::MappingError;
use anvil_patch::PatchError;
use anvil_process::RunCommandError;
use anvil_remap::RemapError;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Wraps the failure of one stage with its name.
    #[error("stage {stage} failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<PipelineError>,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Remap(#[from] RemapError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Process(#[from] RunCommandError),

    #[error("server returned status {status} for {url}")]
    Transport { url: String, status: u16 },

    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown game version {version}")]
    UnknownVersion { version: String },

    #[error("game version {version} has no {module} download")]
    MissingDownload { version: String, module: String },

    #[error("{archive} does not contain {entry}")]
    MissingEntry { archive: PathBuf, entry: String },

    #[error("decompiler produced no output in {dir}")]
    NoDecompilerOutput { dir: PathBuf },
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    /// The innermost error, below any stage wrappers.
    pub fn root_cause(&self) -> &PipelineError {
        match self {
            Self::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
