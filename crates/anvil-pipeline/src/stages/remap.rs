use std::fs;
use std::path::Path;

use anvil_archive::Archive;
use anvil_cache::ArtifactCoordinate;
use anvil_mappings::{CompactMapping, CsvMapping};

use crate::error::{PipelineError, Result};
use crate::stage::{CachedStage, StageContext};
use crate::temp::with_temp_files;

use super::{FetchMcpMappings, FetchSrgMappings};

const COMPACT_ENTRY: &str = "joined.csrg";
const FIELDS_ENTRY: &str = "fields.csv";
const METHODS_ENTRY: &str = "methods.csv";

/// Renames the vanilla jar into the mapped jar.
pub struct ApplyMappings;

impl CachedStage for ApplyMappings {
    fn name(&self) -> &'static str {
        "apply-mappings"
    }

    fn coordinate(&self, ctx: &StageContext<'_>) -> ArtifactCoordinate {
        ctx.mapped_coordinate()
    }

    fn description(&self) -> &'static str {
        "mapped game jar"
    }

    fn compute(&self, ctx: &StageContext<'_>, output: &Path) -> Result<()> {
        let vanilla = ctx.store.fetch(&ctx.vanilla_coordinate())?;
        let srg = Archive::new(ctx.store.fetch(&FetchSrgMappings.coordinate(ctx))?);
        let mcp = Archive::new(ctx.store.fetch(&FetchMcpMappings.coordinate(ctx))?);

        with_temp_files(3, |paths| {
            copy_entry(&srg, COMPACT_ENTRY, &paths[0])?;
            copy_entry(&mcp, FIELDS_ENTRY, &paths[1])?;
            copy_entry(&mcp, METHODS_ENTRY, &paths[2])?;

            let compact = CompactMapping::from_path(&paths[0])?;
            let fields = CsvMapping::from_path(&paths[1], ctx.side())?;
            let methods = CsvMapping::from_path(&paths[2], ctx.side())?;
            tracing::debug!(
                target: "anvil.pipeline",
                types = compact.type_count(),
                compact_fields = compact.field_count(),
                compact_methods = compact.method_count(),
                csv_fields = fields.len(),
                csv_methods = methods.len(),
                "loaded mappings"
            );

            let report = anvil_remap::remap_archive(&vanilla, output, compact, fields, methods)?;
            tracing::info!(
                target: "anvil.pipeline",
                classes = report.classes,
                resources = report.resources,
                dropped_signatures = report.dropped_signatures,
                "remapped archive"
            );
            Ok(())
        })
    }
}

fn copy_entry(archive: &Archive, entry: &str, dest: &Path) -> Result<()> {
    let bytes = archive
        .read(entry)?
        .ok_or_else(|| PipelineError::MissingEntry {
            archive: archive.path().to_path_buf(),
            entry: entry.to_string(),
        })?;
    fs::write(dest, bytes).map_err(PipelineError::io(dest))
}
