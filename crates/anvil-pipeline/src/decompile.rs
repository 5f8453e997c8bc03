//! Boundaries to the external decompiler and the source formatter.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anvil_config::{ConfigError, DecompileConfig};
use anvil_process::{CommandSpec, RunOptions};

use crate::error::{PipelineError, Result};

/// Turns a jar of classes into a jar of sources.
pub trait Decompiler {
    /// Decompiles `input`, writing into `output_dir`, and returns the path of
    /// the produced source archive.
    fn decompile(&self, input: &Path, output_dir: &Path) -> Result<PathBuf>;
}

/// Runs a Fernflower-compatible decompiler jar on the JVM.
#[derive(Debug, Clone)]
pub struct CommandDecompiler {
    java: PathBuf,
    jar: PathBuf,
    options: RunOptions,
}

impl CommandDecompiler {
    pub const ARGUMENTS: &'static [&'static str] = &[
        "-din=1",
        "-rbr=0",
        "-rsy=1",
        "-dgs=1",
        "-asc=1",
        "-log=ERROR",
    ];

    pub fn new(java: impl Into<PathBuf>, jar: impl Into<PathBuf>) -> Self {
        Self {
            java: java.into(),
            jar: jar.into(),
            options: RunOptions::default(),
        }
    }

    pub fn from_config(config: &DecompileConfig) -> std::result::Result<Self, ConfigError> {
        let jar = config
            .decompiler_jar
            .clone()
            .ok_or(ConfigError::MissingValue {
                name: "decompile.decompiler_jar",
            })?;
        Ok(Self::new(config.java.clone(), jar))
    }

    pub fn command(&self, input: &Path, output_dir: &Path) -> CommandSpec {
        let mut args: Vec<OsString> = vec!["-jar".into(), self.jar.clone().into()];
        args.extend(Self::ARGUMENTS.iter().map(OsString::from));
        args.push(input.into());
        args.push(output_dir.into());
        CommandSpec::new(self.java.clone()).current_dir(output_dir).args(args)
    }
}

impl Decompiler for CommandDecompiler {
    fn decompile(&self, input: &Path, output_dir: &Path) -> Result<PathBuf> {
        let command = self.command(input, output_dir);
        tracing::info!(target: "anvil.pipeline", command = %command, "decompiling");
        anvil_process::run_checked(&command, &self.options)?;

        // the decompiler names its output after the input
        let expected = input.file_name().map(|name| output_dir.join(name));
        if let Some(path) = expected.filter(|path| path.is_file()) {
            return Ok(path);
        }
        first_file(output_dir)?.ok_or_else(|| PipelineError::NoDecompilerOutput {
            dir: output_dir.to_path_buf(),
        })
    }
}

fn first_file(dir: &Path) -> Result<Option<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(PipelineError::io(dir))? {
        let path = entry.map_err(PipelineError::io(dir))?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files.into_iter().next())
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct FormatError {
    pub message: String,
}

/// Rewrites decompiled source text into the checked-in layout.
pub trait Formatter {
    fn format(&self, source: &str) -> std::result::Result<String, FormatError>;
}

/// `\n` line endings, no trailing whitespace, exactly one final newline.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizingFormatter;

impl Formatter for NormalizingFormatter {
    fn format(&self, source: &str) -> std::result::Result<String, FormatError> {
        let mut out = String::with_capacity(source.len() + 1);
        for line in source.lines() {
            out.push_str(line.trim_end());
            out.push('\n');
        }
        let trimmed = out.trim_end_matches('\n').len();
        out.truncate(trimmed);
        out.push('\n');
        Ok(out)
    }
}
