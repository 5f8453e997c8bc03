use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PatchError, Result};
use crate::git::Git;

/// Branch marking the unmodified decompiled sources.
pub const UPSTREAM_BRANCH: &str = "upstream";

pub const BASELINE_MESSAGE: &str = "Added decompiled sources.";

/// State of the source working tree, derived from git on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryState {
    /// No repository yet.
    Uninitialized,
    /// HEAD is the baseline commit and the tree is clean.
    Baseline,
    /// Commits on top of the baseline, tree clean.
    Patched,
    /// Uncommitted changes.
    Dirty,
    /// A patch failed to apply and `git am` is waiting for a resolution.
    Applying,
}

impl fmt::Display for RepositoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::Baseline => "baseline",
            Self::Patched => "patched",
            Self::Dirty => "dirty",
            Self::Applying => "applying",
        })
    }
}

/// How to settle a conflicted patch application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The conflict was resolved and staged; commit it.
    Continue,
    /// Drop the failed patch.
    Skip,
    /// Return to the state before the failed patch.
    Abort,
}

/// Drives the source tree between the decompiled baseline and the patch set
/// in `patch_dir`.
#[derive(Debug, Clone)]
pub struct PatchWorkflow {
    git: Git,
    patch_dir: PathBuf,
    force: bool,
}

impl PatchWorkflow {
    pub fn new(git: Git, patch_dir: impl Into<PathBuf>) -> Self {
        Self {
            git,
            patch_dir: patch_dir.into(),
            force: false,
        }
    }

    /// Allow destructive transitions on a dirty tree.
    #[must_use]
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn source_dir(&self) -> &Path {
        self.git.root()
    }

    pub fn patch_dir(&self) -> &Path {
        &self.patch_dir
    }

    pub fn state(&self) -> Result<RepositoryState> {
        if !self.git.is_repository() {
            return Ok(RepositoryState::Uninitialized);
        }
        if self.source_dir().join(".git").join("rebase-apply").exists() {
            return Ok(RepositoryState::Applying);
        }
        if self.git.is_dirty()? {
            return Ok(RepositoryState::Dirty);
        }
        if self.git.rev_parse("HEAD")? == self.git.rev_parse(UPSTREAM_BRANCH)? {
            Ok(RepositoryState::Baseline)
        } else {
            Ok(RepositoryState::Patched)
        }
    }

    /// Creates the repository and commits whatever `populate` writes into the
    /// source directory as the baseline. Returns `false` without touching
    /// anything when a repository already exists.
    pub fn init_baseline<E>(
        &self,
        populate: impl FnOnce(&Path) -> std::result::Result<(), E>,
    ) -> std::result::Result<bool, E>
    where
        E: From<PatchError>,
    {
        let dir = self.source_dir();
        if self.git.is_repository() {
            tracing::info!(target: "anvil.patch", path = %dir.display(), "repository exists; skipping");
            return Ok(false);
        }

        let created_dir = !dir.exists();
        fs::create_dir_all(dir).map_err(PatchError::io(dir))?;
        let result = (|| -> std::result::Result<(), E> {
            self.git.run(["init"])?;
            populate(dir)?;
            self.git.run(["add", "-A"])?;
            self.git.run(["commit", "-q", "-m", BASELINE_MESSAGE])?;
            self.git.run(["branch", UPSTREAM_BRANCH])?;
            Ok(())
        })();
        if let Err(err) = result {
            self.discard_partial_baseline(created_dir);
            return Err(err);
        }

        tracing::info!(target: "anvil.patch", path = %dir.display(), "initialized repository");
        Ok(true)
    }

    /// Removes what a failed `init_baseline` left behind so the next run starts
    /// from `Uninitialized` again.
    fn discard_partial_baseline(&self, created_dir: bool) {
        let dir = self.source_dir();
        let target = if created_dir {
            dir.to_path_buf()
        } else {
            dir.join(".git")
        };
        if !target.exists() {
            return;
        }
        match fs::remove_dir_all(&target) {
            Ok(()) => {
                tracing::info!(target: "anvil.patch", path = %target.display(), "removed partial repository");
            }
            Err(err) => {
                tracing::warn!(
                    target: "anvil.patch",
                    path = %target.display(),
                    error = %err,
                    "failed to remove partial repository; delete it before rebuilding"
                );
            }
        }
    }

    /// Patch files in application order.
    pub fn patches(&self) -> Result<Vec<PathBuf>> {
        if !self.patch_dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut patches = Vec::new();
        let entries = fs::read_dir(&self.patch_dir).map_err(PatchError::io(&self.patch_dir))?;
        for entry in entries {
            let path = entry.map_err(PatchError::io(&self.patch_dir))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "patch") {
                patches.push(path);
            }
        }
        patches.sort();
        Ok(patches)
    }

    /// Refuses to continue when resetting the tree would lose work: a dirty
    /// tree, a pending `git am`, or commits that were never exported as
    /// patches. `force` turns each refusal into a warning.
    pub fn safeguard(&self) -> Result<()> {
        let state = self.state()?;
        let path = self.source_dir();
        tracing::debug!(target: "anvil.patch", path = %path.display(), state = %state, "validating repository state");
        match state {
            RepositoryState::Uninitialized => {
                tracing::info!(target: "anvil.patch", path = %path.display(), "no repository; assuming clean state");
                return Ok(());
            }
            RepositoryState::Dirty | RepositoryState::Applying => {
                if !self.force {
                    tracing::error!(target: "anvil.patch", path = %path.display(), state = %state, "repository has uncommitted changes");
                    return Err(PatchError::DirtyWorkingTree {
                        path: path.to_path_buf(),
                    });
                }
                tracing::warn!(
                    target: "anvil.patch",
                    path = %path.display(),
                    state = %state,
                    force = true,
                    "repository has uncommitted changes; continuing because force is set"
                );
            }
            RepositoryState::Baseline | RepositoryState::Patched => {}
        }

        let commits = self.git.count_commits(UPSTREAM_BRANCH, "HEAD")?;
        let patches = self.patches()?.len();
        if commits > patches {
            if !self.force {
                return Err(PatchError::UnexportedCommits { commits, patches });
            }
            tracing::warn!(
                target: "anvil.patch",
                commits,
                patches,
                force = true,
                "commits were never exported as patches; continuing because force is set"
            );
        }
        Ok(())
    }

    /// Resets the tree to the baseline and applies every patch in order.
    ///
    /// A missing patch directory is not an error. On a failed patch the
    /// repository is left in [`RepositoryState::Applying`]; see
    /// [`PatchWorkflow::resolve`].
    pub fn apply(&self) -> Result<Vec<PathBuf>> {
        if !self.patch_dir.exists() {
            tracing::warn!(
                target: "anvil.patch",
                path = %self.patch_dir.display(),
                "patch directory does not exist; skipping"
            );
            return Ok(Vec::new());
        }

        // a pending `git am` counts as uncommitted work
        self.safeguard()?;

        // fails when nothing is in progress
        if self.git.try_run(["am", "--abort"])?.status.success() {
            tracing::warn!(target: "anvil.patch", "aborted previous patch application");
        }
        self.git.run(["reset", "--hard", "-q", UPSTREAM_BRANCH])?;

        let patches = self.patches()?;
        self.apply_patches(&patches)?;
        Ok(patches)
    }

    /// Applies `patches` on top of the current HEAD without resetting.
    pub fn apply_patches(&self, patches: &[PathBuf]) -> Result<()> {
        for (i, patch) in patches.iter().enumerate() {
            tracing::info!(target: "anvil.patch", patch = %patch.display(), "applying patch");
            let result = self.git.try_run([
                OsStr::new("am"),
                OsStr::new("--ignore-whitespace"),
                OsStr::new("--3way"),
                patch.as_os_str(),
            ])?;
            if !result.status.success() {
                tracing::error!(
                    target: "anvil.patch",
                    patch = %patch.display(),
                    stderr = %result.output.stderr.trim_end(),
                    "could not apply patch"
                );
                return Err(PatchError::Conflict {
                    patch: patch.clone(),
                    remaining: patches[i + 1..].to_vec(),
                    message: result.output.stderr.trim_end().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Settles a pending `git am` after a conflict.
    pub fn resolve(&self, resolution: Resolution) -> Result<RepositoryState> {
        if self.state()? != RepositoryState::Applying {
            return Err(PatchError::NoOperationInProgress);
        }
        let flag = match resolution {
            Resolution::Continue => "--continue",
            Resolution::Skip => "--skip",
            Resolution::Abort => "--abort",
        };
        self.git.run(["am", flag])?;
        let state = self.state()?;
        tracing::info!(target: "anvil.patch", resolution = ?resolution, state = %state, "resolved patch application");
        Ok(state)
    }

    /// Replaces the patch set with one patch per commit since the baseline.
    pub fn generate(&self) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.patch_dir).map_err(PatchError::io(&self.patch_dir))?;
        for patch in self.patches()? {
            fs::remove_file(&patch).map_err(PatchError::io(&patch))?;
        }

        if self.state()? == RepositoryState::Dirty {
            tracing::warn!(
                target: "anvil.patch",
                path = %self.source_dir().display(),
                "repository has uncommitted changes; they will not be part of the patch set"
            );
        }

        self.git.run([
            OsStr::new("format-patch"),
            OsStr::new("--minimal"),
            OsStr::new("--no-stat"),
            OsStr::new("-N"),
            OsStr::new("-o"),
            self.patch_dir.as_os_str(),
            OsStr::new(UPSTREAM_BRANCH),
        ])?;

        let patches = self.patches()?;
        tracing::info!(
            target: "anvil.patch",
            path = %self.patch_dir.display(),
            patches = patches.len(),
            "generated patches"
        );
        Ok(patches)
    }
}
