//! Git-backed patch workflow for the decompiled source tree.
//!
//! The tree starts as a single baseline commit on the `upstream` branch.
//! Developer edits are committed on top and exported as numbered patch files;
//! rebuilding resets to the baseline and re-applies the patch set with
//! `git am`.

mod error;
mod git;
mod workflow;

pub use crate::error::{PatchError, Result};
pub use crate::git::{Author, Git};
pub use crate::workflow::{
    PatchWorkflow, RepositoryState, Resolution, BASELINE_MESSAGE, UPSTREAM_BRANCH,
};
