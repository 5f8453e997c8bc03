use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors produced by the artifact repository.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to determine home directory for default repository path")]
    MissingHomeDir,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {message}")]
    Json { message: String },

    /// The artifact is not in the repository. Callers usually compute and
    /// store it, so this is kept apart from I/O failures.
    #[error("artifact {coordinate} not found")]
    NotFound { coordinate: String },

    #[error("invalid artifact coordinate {value:?}: {reason}")]
    InvalidCoordinate { value: String, reason: &'static str },

    #[error("artifact checksum mismatch for {path}: expected {expected}, found {found}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
        }
    }
}
