use std::path::{Path, PathBuf};

use anvil_access::AccessMap;
use anvil_cache::{ArtifactCoordinate, ArtifactStore};
use anvil_config::{MappingVersion, Module, PipelineConfig};
use anvil_mappings::Side;

use crate::decompile::{Decompiler, Formatter};
use crate::error::{PipelineError, Result};
use crate::http::HttpClient;
use crate::temp::with_temp_files;

/// Version used for `live` mappings. Snapshot artifacts expire in the cache.
pub const LIVE_MAPPING_VERSION: &str = "0.0.0-SNAPSHOT";

/// Everything a stage may read. Stages communicate only through the store.
pub struct StageContext<'a> {
    pub config: &'a PipelineConfig,
    pub module: Module,
    pub mapping_version: MappingVersion,
    pub store: &'a dyn ArtifactStore,
    pub http: &'a HttpClient,
    pub decompiler: &'a dyn Decompiler,
    pub formatter: &'a dyn Formatter,
    pub access: Option<&'a AccessMap>,
}

impl StageContext<'_> {
    pub fn side(&self) -> Side {
        match self.module {
            Module::Client => Side::Client,
            Module::Server => Side::Server,
        }
    }

    fn group(&self) -> &str {
        &self.config.group
    }

    /// Version segment of the mappings artifact; `live` becomes a snapshot.
    fn mapping_label(&self) -> String {
        match &self.mapping_version {
            MappingVersion::Live => LIVE_MAPPING_VERSION.to_string(),
            version => version.to_string(),
        }
    }

    /// `gameVersion-mappingVersion`, so products of `live` mappings are
    /// snapshots too.
    pub fn mapped_version(&self) -> String {
        format!("{}-{}", self.config.game_version, self.mapping_label())
    }

    pub fn vanilla_coordinate(&self) -> ArtifactCoordinate {
        ArtifactCoordinate::new(
            self.group(),
            self.module.as_str(),
            &self.config.game_version,
            "jar",
        )
        .with_classifier("vanilla")
    }

    pub fn srg_coordinate(&self) -> ArtifactCoordinate {
        ArtifactCoordinate::new(self.group(), "mappings-srg", &self.config.game_version, "zip")
    }

    pub fn mcp_coordinate(&self) -> ArtifactCoordinate {
        ArtifactCoordinate::new(self.group(), "mappings-mcp", self.mapping_label(), "zip")
    }

    pub fn mapped_coordinate(&self) -> ArtifactCoordinate {
        ArtifactCoordinate::new(self.group(), self.module.as_str(), self.mapped_version(), "jar")
            .with_classifier("mapped")
    }

    pub fn source_coordinate(&self) -> ArtifactCoordinate {
        ArtifactCoordinate::new(self.group(), self.module.as_str(), self.mapped_version(), "jar")
            .with_classifier("source")
    }
}

/// A stage whose product is one cached artifact.
pub trait CachedStage {
    fn name(&self) -> &'static str;

    fn coordinate(&self, ctx: &StageContext<'_>) -> ArtifactCoordinate;

    fn description(&self) -> &'static str;

    /// Writes the artifact to `output`.
    fn compute(&self, ctx: &StageContext<'_>, output: &Path) -> Result<()>;
}

/// Runs `f` inside a span naming the stage and attaches the stage name to
/// any error.
pub fn in_stage<T>(
    stage: &'static str,
    coordinate: Option<&ArtifactCoordinate>,
    f: impl FnOnce() -> Result<T>,
) -> Result<T> {
    let coordinate = coordinate.map(ToString::to_string).unwrap_or_default();
    let span = tracing::info_span!("stage", stage, coordinate = %coordinate);
    let _enter = span.enter();
    f().map_err(|source| {
        tracing::error!(target: "anvil.pipeline", error = %source, "stage failed");
        PipelineError::Stage {
            stage,
            source: Box::new(source),
        }
    })
}

/// The store protocol: a present artifact is reused, otherwise it is computed
/// into a temporary file and stored. Returns the stored path.
pub fn run_cached<S: CachedStage + ?Sized>(stage: &S, ctx: &StageContext<'_>) -> Result<PathBuf> {
    let coordinate = stage.coordinate(ctx);
    in_stage(stage.name(), Some(&coordinate), || {
        if ctx.store.exists(&coordinate)? {
            tracing::info!(target: "anvil.pipeline", "artifact cached; skipping");
            return Ok(ctx.store.fetch(&coordinate)?);
        }

        tracing::info!(target: "anvil.pipeline", "computing artifact");
        with_temp_files(1, |paths| {
            stage.compute(ctx, &paths[0])?;
            Ok(ctx
                .store
                .store(&coordinate, &paths[0], Some(stage.description()))?)
        })
    })
}
