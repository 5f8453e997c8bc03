use std::path::PathBuf;

use anvil_access::AccessMap;
use anvil_archive::Extracted;
use anvil_cache::LocalRepository;
use anvil_config::PipelineConfig;

use crate::decompile::{CommandDecompiler, Decompiler, Formatter, NormalizingFormatter};
use crate::error::Result;
use crate::http::HttpClient;
use crate::stage::{in_stage, run_cached, StageContext};
use crate::stages::{self, ApplyMappings, Decompile, Download, FetchMcpMappings, FetchSrgMappings};

/// The external tools the pipeline delegates to.
pub struct Collaborators {
    pub decompiler: Box<dyn Decompiler>,
    pub formatter: Box<dyn Formatter>,
}

impl Collaborators {
    /// The configured decompiler jar with the normalizing formatter.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            decompiler: Box::new(CommandDecompiler::from_config(&config.decompile)?),
            formatter: Box::new(NormalizingFormatter),
        })
    }
}

/// What a build produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub vanilla: PathBuf,
    pub mapped: PathBuf,
    pub sources: PathBuf,
    pub resources: Vec<Extracted>,
    /// `false` when the source repository already existed.
    pub repository_initialized: bool,
    pub applied_patches: Vec<PathBuf>,
}

pub struct Pipeline {
    config: PipelineConfig,
    collaborators: Collaborators,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs every build stage in order: download, mappings, remap,
    /// decompile, resources, repository, safeguard and patches.
    ///
    /// Cached artifacts are reused, so a second run with the same
    /// configuration only re-applies the patches.
    pub fn run(&self) -> Result<BuildReport> {
        let config = &self.config;
        config.validate()?;

        let store = LocalRepository::new(config.repository_root()?);
        let http = HttpClient::new(&config.network);
        let access = config
            .access_transformation
            .as_deref()
            .map(AccessMap::from_path)
            .transpose()?;
        let ctx = StageContext {
            config,
            module: config.module()?,
            mapping_version: config.mapping_version()?,
            store: &store,
            http: &http,
            decompiler: self.collaborators.decompiler.as_ref(),
            formatter: self.collaborators.formatter.as_ref(),
            access: access.as_ref(),
        };

        tracing::info!(
            target: "anvil.pipeline",
            module = %ctx.module,
            game_version = %config.game_version,
            mapping_version = %ctx.mapping_version,
            repository = %store.root().display(),
            "starting build"
        );

        let vanilla = run_cached(&Download, &ctx)?;
        run_cached(&FetchSrgMappings, &ctx)?;
        run_cached(&FetchMcpMappings, &ctx)?;
        let mapped = run_cached(&ApplyMappings, &ctx)?;
        let sources = run_cached(&Decompile, &ctx)?;
        let resources = stages::extract_resources(&ctx)?;

        let workflow = in_stage("check-git", None, || stages::workflow(config))?;
        let repository_initialized = stages::initialize_repository(&ctx, &workflow)?;
        stages::safeguard(&workflow)?;
        let applied_patches = stages::apply_patches(&workflow)?;

        tracing::info!(
            target: "anvil.pipeline",
            patches = applied_patches.len(),
            "build finished"
        );
        Ok(BuildReport {
            vanilla,
            mapped,
            sources,
            resources,
            repository_initialized,
            applied_patches,
        })
    }

    /// Exports the commits on top of the baseline as the new patch set.
    pub fn generate_patches(&self) -> Result<Vec<PathBuf>> {
        let workflow = in_stage("check-git", None, || stages::workflow(&self.config))?;
        stages::generate_patches(&workflow)
    }
}
