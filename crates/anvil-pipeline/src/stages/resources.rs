use anvil_archive::{Archive, Extracted, Overwrite};

use crate::error::Result;
use crate::stage::{in_stage, StageContext};

/// Copies the non-source entries of the source jar into the resource
/// directory. Local files at least as new as their entry are kept.
pub fn extract_resources(ctx: &StageContext<'_>) -> Result<Vec<Extracted>> {
    let coordinate = ctx.source_coordinate();
    in_stage("extract-resources", Some(&coordinate), || {
        let dest = ctx.config.resource_directory()?;
        let excluded = &ctx.config.excluded_resources;
        let sources = Archive::new(ctx.store.fetch(&coordinate)?);

        let resources = sources.extract(dest, Overwrite::IfOlder, |name| {
            if name.ends_with(".java") {
                return false;
            }
            if excluded.iter().any(|pattern| pattern == name) {
                tracing::debug!(target: "anvil.pipeline", entry = name, "excluded resource");
                return false;
            }
            true
        })?;
        tracing::info!(
            target: "anvil.pipeline",
            path = %dest.display(),
            resources = resources.len(),
            written = resources.iter().filter(|r| r.written).count(),
            "extracted resources"
        );
        Ok(resources)
    })
}
