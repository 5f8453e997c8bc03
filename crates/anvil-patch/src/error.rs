use std::path::PathBuf;

use anvil_process::RunCommandError;

pub type Result<T> = std::result::Result<T, PatchError>;

#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("could not locate a git installation: {message}")]
    GitUnavailable { message: String },

    #[error(transparent)]
    Git(#[from] RunCommandError),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a git repository")]
    NotInitialized { path: PathBuf },

    #[error(
        "the repository at {path} has uncommitted changes; generate patches before rebuilding or pass force"
    )]
    DirtyWorkingTree { path: PathBuf },

    #[error("{commits} commits since the baseline but only {patches} patch files; generate patches before rebuilding or pass force")]
    UnexportedCommits { commits: usize, patches: usize },

    #[error("failed to apply patch {patch}: {message}")]
    Conflict {
        patch: PathBuf,
        /// Patches after the failed one, not yet applied.
        remaining: Vec<PathBuf>,
        message: String,
    },

    #[error("unexpected output from `{command}`: {output:?}")]
    UnexpectedOutput { command: String, output: String },

    #[error("no patch application is in progress")]
    NoOperationInProgress,
}

impl PatchError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
