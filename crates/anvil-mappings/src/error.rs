use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, MappingError>;

#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("failed to read mapping file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed csv mapping at line {line}: {message}")]
    Csv { line: usize, message: String },

    #[error("unknown side {value:?}; expected \"client\" or \"server\"")]
    UnknownSide { value: String },
}
