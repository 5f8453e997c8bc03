//! Pipeline configuration.
//!
//! A single TOML document names the game module and versions to build, the
//! directories the pipeline works in and the knobs of each stage:
//!
//! ```toml
//! module = "server"
//! game_version = "1.12.2"
//! mapping_version = "snapshot-20171003"
//! source_directory = "src/minecraft/java"
//! patch_directory = "src/minecraft/patches"
//! resource_directory = "src/minecraft/resources"
//!
//! [git]
//! author_name = "Basin"
//! ```

mod error;
mod logging;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use crate::error::{ConfigError, Result};
pub use crate::logging::{init_tracing, LoggingConfig};

/// Which distribution of the game is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Module {
    Client,
    Server,
}

impl Module {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Self::Client),
            "server" => Ok(Self::Server),
            _ => Err(ConfigError::InvalidModule {
                value: value.to_string(),
            }),
        }
    }
}

/// `<channel>-<version>` names an exported mapping release; `live` builds the
/// mappings from the current state of the export service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingVersion {
    Live,
    Export { channel: String, version: String },
}

impl MappingVersion {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }
}

impl fmt::Display for MappingVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => f.write_str("live"),
            Self::Export { channel, version } => write!(f, "{channel}-{version}"),
        }
    }
}

impl FromStr for MappingVersion {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("live") {
            return Ok(Self::Live);
        }
        match value.split_once('-') {
            Some((channel, version)) if !channel.is_empty() && !version.is_empty() => {
                Ok(Self::Export {
                    channel: channel.to_string(),
                    version: version.to_string(),
                })
            }
            _ => Err(ConfigError::InvalidMappingVersion {
                value: value.to_string(),
            }),
        }
    }
}

/// URL templates. `{game}`, `{channel}`, `{version}` and `{name}` are
/// substituted before each request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UrlConfig {
    #[serde(default = "UrlConfig::default_version_manifest")]
    pub version_manifest: String,
    #[serde(default = "UrlConfig::default_srg")]
    pub srg: String,
    #[serde(default = "UrlConfig::default_mcp")]
    pub mcp: String,
    #[serde(default = "UrlConfig::default_mcp_live")]
    pub mcp_live: String,
}

impl UrlConfig {
    fn default_version_manifest() -> String {
        "https://launchermeta.mojang.com/mc/game/version_manifest.json".to_owned()
    }

    fn default_srg() -> String {
        "http://files.minecraftforge.net/maven/de/oceanlabs/mcp/mcp/{game}/mcp-{game}-csrg.zip"
            .to_owned()
    }

    fn default_mcp() -> String {
        "http://export.mcpbot.bspk.rs/mcp_{channel}/{version}-{game}/mcp_{channel}-{version}-{game}.zip"
            .to_owned()
    }

    fn default_mcp_live() -> String {
        "http://export.mcpbot.bspk.rs/{name}.csv".to_owned()
    }
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            version_manifest: Self::default_version_manifest(),
            srg: Self::default_srg(),
            mcp: Self::default_mcp(),
            mcp_live: Self::default_mcp_live(),
        }
    }
}

/// Fills `{key}` placeholders in a URL template.
pub fn expand_template(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |url, (key, value)| {
        url.replace(&format!("{{{key}}}"), value)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    #[serde(default = "NetworkConfig::default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "NetworkConfig::default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

impl NetworkConfig {
    fn default_connect_timeout_ms() -> u64 {
        30_000
    }

    fn default_read_timeout_ms() -> u64 {
        120_000
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: Self::default_connect_timeout_ms(),
            read_timeout_ms: Self::default_read_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitConfig {
    /// Kill git invocations running longer than this. No limit by default.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default = "GitConfig::default_author_name")]
    pub author_name: String,
    #[serde(default = "GitConfig::default_author_email")]
    pub author_email: String,
}

impl GitConfig {
    fn default_author_name() -> String {
        "Anvil".to_owned()
    }

    fn default_author_email() -> String {
        "anvil@localhost".to_owned()
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            author_name: Self::default_author_name(),
            author_email: Self::default_author_email(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecompileConfig {
    #[serde(default = "DecompileConfig::default_java")]
    pub java: PathBuf,
    /// Decompiler jar run with `java -jar`.
    #[serde(default)]
    pub decompiler_jar: Option<PathBuf>,
    /// Entries starting with one of these are passed to the decompiler.
    #[serde(default = "DecompileConfig::default_included_prefixes")]
    pub included_prefixes: Vec<String>,
    /// Entries passed to the decompiler by exact name.
    #[serde(default = "DecompileConfig::default_included_files")]
    pub included_files: Vec<String>,
}

impl DecompileConfig {
    fn default_java() -> PathBuf {
        PathBuf::from("java")
    }

    fn default_included_prefixes() -> Vec<String> {
        vec!["assets".to_owned(), "net".to_owned()]
    }

    fn default_included_files() -> Vec<String> {
        vec![
            "log4j2.xml".to_owned(),
            "pack.png".to_owned(),
            "yggdrasil_session_pubkey.der".to_owned(),
        ]
    }

    pub fn includes(&self, name: &str) -> bool {
        self.included_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
            || self.included_files.iter().any(|file| file == name)
    }
}

impl Default for DecompileConfig {
    fn default() -> Self {
        Self {
            java: Self::default_java(),
            decompiler_jar: None,
            included_prefixes: Self::default_included_prefixes(),
            included_files: Self::default_included_files(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// `client` or `server`.
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub game_version: String,
    /// `<channel>-<version>` or `live`.
    #[serde(default)]
    pub mapping_version: String,
    #[serde(default = "PipelineConfig::default_group")]
    pub group: String,

    /// Artifact cache root; `$ANVIL_REPOSITORY` or `~/.anvil/repository`
    /// when unset.
    #[serde(default)]
    pub repository: Option<PathBuf>,
    #[serde(default)]
    pub source_directory: Option<PathBuf>,
    #[serde(default)]
    pub patch_directory: Option<PathBuf>,
    #[serde(default)]
    pub resource_directory: Option<PathBuf>,

    /// Resource names never extracted.
    #[serde(default)]
    pub excluded_resources: Vec<String>,
    /// Access transformation map applied to decompiled sources.
    #[serde(default)]
    pub access_transformation: Option<PathBuf>,
    /// Continue past the dirty-tree safeguard.
    #[serde(default)]
    pub force: bool,

    #[serde(default)]
    pub urls: UrlConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub decompile: DecompileConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            module: String::new(),
            game_version: String::new(),
            mapping_version: String::new(),
            group: Self::default_group(),
            repository: None,
            source_directory: None,
            patch_directory: None,
            resource_directory: None,
            excluded_resources: Vec::new(),
            access_transformation: None,
            force: false,
            urls: UrlConfig::default(),
            network: NetworkConfig::default(),
            git: GitConfig::default(),
            decompile: DecompileConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PipelineConfig {
    fn default_group() -> String {
        "net.minecraft".to_owned()
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Loads a config file. Relative paths inside it are resolved against the
    /// file's directory.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        tracing::debug!(target: "anvil.config", path = %path.display(), "loaded config");
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut Option<PathBuf>| {
            if let Some(p) = path.as_mut() {
                if p.is_relative() {
                    *p = base.join(&*p);
                }
            }
        };
        resolve(&mut self.repository);
        resolve(&mut self.source_directory);
        resolve(&mut self.patch_directory);
        resolve(&mut self.resource_directory);
        resolve(&mut self.access_transformation);
        resolve(&mut self.decompile.decompiler_jar);
        resolve(&mut self.logging.file);
    }

    /// Checks every setting the pipeline needs before any work starts.
    pub fn validate(&self) -> Result<()> {
        self.module()?;
        if self.game_version.trim().is_empty() {
            return Err(ConfigError::MissingValue {
                name: "game_version",
            });
        }
        if self.mapping_version.trim().is_empty() {
            return Err(ConfigError::MissingValue {
                name: "mapping_version",
            });
        }
        self.mapping_version()?;
        if self.group.trim().is_empty() {
            return Err(ConfigError::MissingValue { name: "group" });
        }
        self.source_directory()?;
        self.patch_directory()?;
        self.resource_directory()?;
        Ok(())
    }

    pub fn module(&self) -> Result<Module> {
        self.module.parse()
    }

    pub fn mapping_version(&self) -> Result<MappingVersion> {
        self.mapping_version.parse()
    }

    pub fn repository_root(&self) -> Result<PathBuf> {
        match &self.repository {
            Some(path) => Ok(path.clone()),
            None => anvil_cache::default_repository_root()
                .map_err(|_| ConfigError::MissingDirectory { name: "repository" }),
        }
    }

    pub fn source_directory(&self) -> Result<&Path> {
        required_dir(&self.source_directory, "source_directory")
    }

    pub fn patch_directory(&self) -> Result<&Path> {
        required_dir(&self.patch_directory, "patch_directory")
    }

    pub fn resource_directory(&self) -> Result<&Path> {
        required_dir(&self.resource_directory, "resource_directory")
    }
}

fn required_dir<'a>(dir: &'a Option<PathBuf>, name: &'static str) -> Result<&'a Path> {
    dir.as_deref()
        .filter(|path| !path.as_os_str().is_empty())
        .ok_or(ConfigError::MissingDirectory { name })
}
