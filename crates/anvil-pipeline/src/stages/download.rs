use std::path::Path;

use anvil_cache::ArtifactCoordinate;
use anvil_config::Module;

use crate::error::{PipelineError, Result};
use crate::launcher::{VersionManifest, VersionMetadata};
use crate::stage::{CachedStage, StageContext};

/// Fetches the vanilla game jar named by the launcher metadata.
pub struct Download;

impl CachedStage for Download {
    fn name(&self) -> &'static str {
        "download"
    }

    fn coordinate(&self, ctx: &StageContext<'_>) -> ArtifactCoordinate {
        ctx.vanilla_coordinate()
    }

    fn description(&self) -> &'static str {
        "vanilla game jar"
    }

    fn compute(&self, ctx: &StageContext<'_>, output: &Path) -> Result<()> {
        let version = &ctx.config.game_version;
        let manifest = VersionManifest::fetch(ctx.http, &ctx.config.urls.version_manifest)?;
        let entry = manifest.require(version)?;
        let metadata = VersionMetadata::fetch(ctx.http, entry)?;

        let download = match ctx.module {
            Module::Client => metadata.downloads.client.as_ref(),
            Module::Server => metadata.downloads.server.as_ref(),
        }
        .ok_or_else(|| PipelineError::MissingDownload {
            version: version.clone(),
            module: ctx.module.to_string(),
        })?;

        // not verified: sha1 is not part of the hashing stack
        tracing::info!(
            target: "anvil.pipeline",
            version = %version,
            kind = ?entry.kind,
            sha1 = %download.sha1,
            url = %download.url,
            "downloading game jar"
        );
        ctx.http.download(&download.url, output)?;
        Ok(())
    }
}
