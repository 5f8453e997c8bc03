use std::path::Path;

use anvil_archive::Archive;
use anvil_cache::ArtifactCoordinate;

use crate::error::Result;
use crate::stage::{CachedStage, StageContext};
use crate::temp::{with_temp_dir, with_temp_files};

/// Decompiles the mapped jar into the source jar.
pub struct Decompile;

impl CachedStage for Decompile {
    fn name(&self) -> &'static str {
        "decompile"
    }

    fn coordinate(&self, ctx: &StageContext<'_>) -> ArtifactCoordinate {
        ctx.source_coordinate()
    }

    fn description(&self) -> &'static str {
        "decompiled sources"
    }

    fn compute(&self, ctx: &StageContext<'_>, output: &Path) -> Result<()> {
        let mapped = Archive::new(ctx.store.fetch(&ctx.mapped_coordinate())?);
        let decompile = &ctx.config.decompile;

        with_temp_files(1, |paths| {
            let stripped = &paths[0];
            let kept = mapped.copy_filtered(stripped, |name| decompile.includes(name))?;
            tracing::debug!(target: "anvil.pipeline", entries = kept, "stripped mapped jar");

            with_temp_dir(|dir| {
                let produced = Archive::new(ctx.decompiler.decompile(stripped, dir)?);
                let written = produced.rewrite(output, |name, content| {
                    post_process(ctx, name, content).map(Some)
                })?;
                tracing::info!(target: "anvil.pipeline", entries = written, "post-processed sources");
                Ok(())
            })
        })
    }
}

fn post_process(ctx: &StageContext<'_>, name: &str, content: Vec<u8>) -> Result<Vec<u8>> {
    if name.ends_with(".java") {
        let mut source = match String::from_utf8(content) {
            Ok(source) => source,
            Err(err) => {
                tracing::warn!(target: "anvil.pipeline", entry = name, "source is not utf-8; copied as is");
                return Ok(err.into_bytes());
            }
        };
        if let Some(access) = ctx.access.filter(|access| access.covers_file(name)) {
            source = access.apply(&source).map_err(|err| {
                tracing::error!(target: "anvil.pipeline", entry = name, error = %err, "access transformation failed");
                err
            })?;
        }
        let source = match ctx.formatter.format(&source) {
            Ok(formatted) => formatted,
            Err(err) => {
                tracing::warn!(target: "anvil.pipeline", entry = name, error = %err, "formatter failed; keeping unformatted source");
                source
            }
        };
        return Ok(source.into_bytes());
    }
    if name.ends_with(".xml") {
        return Ok(content.into_iter().filter(|&byte| byte != b'\r').collect());
    }
    Ok(content)
}
