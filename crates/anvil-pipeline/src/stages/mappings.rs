use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anvil_archive::ArchiveError;
use anvil_cache::ArtifactCoordinate;
use anvil_config::{expand_template, MappingVersion};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{PipelineError, Result};
use crate::stage::{CachedStage, StageContext};

/// Tables fetched one by one for `live` mappings.
pub const LIVE_MAPPING_FILES: &[&str] = &["fields", "methods", "params"];

/// The SRG (compact) mappings for the game version.
pub struct FetchSrgMappings;

impl CachedStage for FetchSrgMappings {
    fn name(&self) -> &'static str {
        "fetch-srg-mappings"
    }

    fn coordinate(&self, ctx: &StageContext<'_>) -> ArtifactCoordinate {
        ctx.srg_coordinate()
    }

    fn description(&self) -> &'static str {
        "SRG mappings"
    }

    fn compute(&self, ctx: &StageContext<'_>, output: &Path) -> Result<()> {
        let game = ctx.config.game_version.as_str();
        let url = expand_template(&ctx.config.urls.srg, &[("game", game)]);
        ctx.http.download(&url, output)?;
        Ok(())
    }
}

/// The MCP (CSV) mappings: an exported release, or a zip assembled from the
/// live tables.
pub struct FetchMcpMappings;

impl CachedStage for FetchMcpMappings {
    fn name(&self) -> &'static str {
        "fetch-mcp-mappings"
    }

    fn coordinate(&self, ctx: &StageContext<'_>) -> ArtifactCoordinate {
        ctx.mcp_coordinate()
    }

    fn description(&self) -> &'static str {
        "MCP mappings"
    }

    fn compute(&self, ctx: &StageContext<'_>, output: &Path) -> Result<()> {
        match &ctx.mapping_version {
            MappingVersion::Export { channel, version } => {
                let url = expand_template(
                    &ctx.config.urls.mcp,
                    &[
                        ("channel", channel.as_str()),
                        ("version", version.as_str()),
                        ("game", ctx.config.game_version.as_str()),
                    ],
                );
                ctx.http.download(&url, output)?;
            }
            MappingVersion::Live => {
                tracing::warn!(
                    target: "anvil.pipeline",
                    "using live mappings; the result is not reproducible"
                );
                let file = File::create(output).map_err(PipelineError::io(output))?;
                let mut zip = ZipWriter::new(BufWriter::new(file));
                let options = FileOptions::<()>::default()
                    .compression_method(CompressionMethod::Deflated)
                    .last_modified_time(zip::DateTime::default());
                for name in LIVE_MAPPING_FILES {
                    let url = expand_template(&ctx.config.urls.mcp_live, &[("name", *name)]);
                    let body = ctx.http.get_bytes(&url)?;
                    zip.start_file(format!("{name}.csv"), options)
                        .map_err(zip_error(output))?;
                    zip.write_all(&body).map_err(PipelineError::io(output))?;
                }
                zip.finish()
                    .map_err(zip_error(output))?
                    .flush()
                    .map_err(PipelineError::io(output))?;
            }
        }
        Ok(())
    }
}

fn zip_error(path: &Path) -> impl FnOnce(zip::result::ZipError) -> ArchiveError + '_ {
    move |source| ArchiveError::Zip {
        path: path.to_path_buf(),
        source,
    }
}
