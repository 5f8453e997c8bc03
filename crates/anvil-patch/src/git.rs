use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anvil_process::{CommandResult, CommandSpec, RunCommandError, RunOptions};

use crate::error::{PatchError, Result};

/// Identity used for every commit the workflow creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub email: String,
}

impl Default for Author {
    fn default() -> Self {
        Self {
            name: "Anvil".to_string(),
            email: "anvil@localhost".to_string(),
        }
    }
}

/// A `git` invocation context rooted at one working tree.
///
/// Commands run with the configured author and commit signing disabled, so
/// the result does not depend on the user's global git configuration.
#[derive(Debug, Clone)]
pub struct Git {
    root: PathBuf,
    author: Author,
    timeout: Option<Duration>,
}

impl Git {
    pub fn new(root: impl Into<PathBuf>, author: Author) -> Self {
        Self {
            root: root.into(),
            author,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Runs `git --version`; fails with [`PatchError::GitUnavailable`] when git
    /// is missing from `PATH` or exits with an error.
    pub fn version() -> Result<String> {
        let command = CommandSpec::new("git").arg("--version");
        let result = anvil_process::run_checked(&command, &RunOptions::default())
            .map_err(|err| PatchError::GitUnavailable {
                message: err.to_string(),
            })?;
        let version = result.output.stdout.trim().to_string();
        tracing::info!(target: "anvil.patch", version = %version, "found git installation");
        Ok(version)
    }

    fn command<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        CommandSpec::new("git")
            .current_dir(&self.root)
            .arg("-c")
            .arg(format!("user.name={}", self.author.name))
            .arg("-c")
            .arg(format!("user.email={}", self.author.email))
            .args(["-c", "commit.gpgsign=false"])
            .args(args)
    }

    fn options(&self) -> RunOptions {
        RunOptions::default().with_timeout(self.timeout)
    }

    /// Runs a git command and returns its trimmed stdout. A non-zero exit is
    /// an error carrying the captured stderr.
    pub fn run<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let command = self.command(args);
        let result = anvil_process::run_checked(&command, &self.options())?;
        Ok(result.output.stdout.trim_end().to_string())
    }

    /// Runs a git command whose exit status the caller interprets.
    pub fn try_run<I, S>(&self, args: I) -> Result<CommandResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let command = self.command(args);
        anvil_process::run(&command, &self.options()).map_err(|source| {
            PatchError::Git(RunCommandError::Io { command, source })
        })
    }

    pub fn is_repository(&self) -> bool {
        self.root.join(".git").exists()
    }

    pub fn rev_parse(&self, rev: &str) -> Result<String> {
        self.run(["rev-parse", "--verify", rev])
    }

    /// `git status --porcelain` produced output.
    pub fn is_dirty(&self) -> Result<bool> {
        Ok(!self.run(["status", "--porcelain"])?.is_empty())
    }

    /// Number of commits reachable from `to` but not from `from`.
    pub fn count_commits(&self, from: &str, to: &str) -> Result<usize> {
        let range = format!("{from}..{to}");
        let output = self.run(["rev-list", "--count", range.as_str()])?;
        parse_count(&range, output)
    }
}

fn parse_count(range: &str, output: String) -> Result<usize> {
    output
        .trim()
        .parse()
        .map_err(|_| PatchError::UnexpectedOutput {
            command: format!("git rev-list --count {range}"),
            output,
        })
}
