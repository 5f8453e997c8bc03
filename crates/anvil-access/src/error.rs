use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, AccessError>;

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("failed to read access transformation map {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid access transformation map: {message}")]
    Json { message: String },

    #[error("unknown visibility {value:?} (expected public, protected, private or package-private)")]
    InvalidVisibility { value: String },

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("java parser unavailable: {message}")]
    Parser { message: String },
}

impl From<serde_json::Error> for AccessError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
        }
    }
}
