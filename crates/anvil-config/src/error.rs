use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse toml config: {0}")]
    Toml(String),

    #[error("invalid module {value:?} (expected client or server)")]
    InvalidModule { value: String },

    #[error("missing required setting `{name}`")]
    MissingValue { name: &'static str },

    #[error("missing required directory `{name}`")]
    MissingDirectory { name: &'static str },

    #[error("invalid mapping version {value:?} (expected <channel>-<version> or live)")]
    InvalidMappingVersion { value: String },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::Toml(err.to_string())
    }
}
