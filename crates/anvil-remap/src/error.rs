use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, RemapError>;

#[derive(Debug, thiserror::Error)]
pub enum RemapError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to open archive {path}: {source}")]
    OpenArchive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("malformed class entry {entry}: {source}")]
    Class {
        entry: String,
        #[source]
        source: anvil_classfile::Error,
    },
}
