use std::path::PathBuf;
use std::time::Duration;

use anvil_archive::{Archive, Overwrite};
use anvil_config::PipelineConfig;
use anvil_patch::{Author, Git, PatchWorkflow};

use crate::error::Result;
use crate::stage::{in_stage, StageContext};

/// The patch workflow over the configured source and patch directories.
///
/// Fails with `GitUnavailable` before touching the tree when `git` cannot be
/// run.
pub fn workflow(config: &PipelineConfig) -> Result<PatchWorkflow> {
    Git::version()?;
    let author = Author {
        name: config.git.author_name.clone(),
        email: config.git.author_email.clone(),
    };
    let git = Git::new(config.source_directory()?, author)
        .with_timeout(config.git.timeout_ms.map(Duration::from_millis));
    Ok(PatchWorkflow::new(git, config.patch_directory()?).force(config.force))
}

/// Creates the baseline repository from the decompiled sources. Returns
/// `false` when the repository already existed.
pub fn initialize_repository(ctx: &StageContext<'_>, workflow: &PatchWorkflow) -> Result<bool> {
    let coordinate = ctx.source_coordinate();
    in_stage("initialize-repository", Some(&coordinate), || {
        workflow.init_baseline(|dir| -> Result<()> {
            let sources = Archive::new(ctx.store.fetch(&coordinate)?);
            let extracted = sources.extract(dir, Overwrite::Always, |name| name.ends_with(".java"))?;
            tracing::info!(target: "anvil.pipeline", files = extracted.len(), "extracted baseline sources");
            Ok(())
        })
    })
}

pub fn safeguard(workflow: &PatchWorkflow) -> Result<()> {
    in_stage("safeguard", None, || Ok(workflow.safeguard()?))
}

/// Resets the tree to the baseline and applies the patch set.
pub fn apply_patches(workflow: &PatchWorkflow) -> Result<Vec<PathBuf>> {
    in_stage("apply-patches", None, || Ok(workflow.apply()?))
}

/// Replaces the patch set with the commits on top of the baseline.
pub fn generate_patches(workflow: &PatchWorkflow) -> Result<Vec<PathBuf>> {
    in_stage("generate-patches", None, || Ok(workflow.generate()?))
}
