//! Synchronous subprocess execution for the external tools the pipeline
//! drives (`git`, the decompiler JVM).
//!
//! Output is captured on reader threads and bounded per stream. A timeout is
//! optional; when it fires the whole process group is terminated so wrapper
//! processes cannot keep the pipes open.

use std::{
    ffi::OsString,
    fmt,
    io::{self, Read},
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

/// Captured stdout/stderr of a command, truncated to a maximum size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundedOutput {
    pub stdout: String,
    pub stderr: String,
    /// Set when either stream produced more bytes than were kept.
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Kill the process group if it is still running after this long.
    pub timeout: Option<Duration>,
    /// Maximum bytes kept per stream.
    pub max_bytes: usize,
    /// Delay between SIGTERM and SIGKILL when a timeout fires.
    pub kill_grace: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            max_bytes: 16 * 1024 * 1024,
            kill_grace: Duration::from_millis(250),
        }
    }
}

impl RunOptions {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A command line plus its working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub cwd: PathBuf,
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl CommandSpec {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            cwd: PathBuf::from("."),
            program: program.into(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn current_dir(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = cwd.as_ref().to_path_buf();
        self
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Human-readable only; not meant to be pasted into a shell.
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.contains([' ', '\t']) {
                write!(f, " \"{}\"", arg.replace('"', "\\\""))?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub status: ExitStatus,
    pub output: BoundedOutput,
    pub timed_out: bool,
    pub elapsed: Duration,
}

/// A non-zero exit or a timeout.
#[derive(Debug, Clone)]
pub struct CommandFailure {
    pub command: CommandSpec,
    pub status: ExitStatus,
    pub output: BoundedOutput,
    pub timed_out: bool,
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.timed_out {
            write!(f, "`{}` timed out ({})", self.command, self.status)?;
        } else {
            write!(f, "`{}` exited with {}", self.command, self.status)?;
        }
        if self.output.truncated {
            write!(f, " (output truncated)")?;
        }
        let stderr = self.output.stderr.trim_end();
        if !stderr.is_empty() {
            write!(f, "\nstderr:\n{stderr}")?;
        }
        let stdout = self.output.stdout.trim_end();
        if !stdout.is_empty() {
            write!(f, "\nstdout:\n{stdout}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CommandFailure {}

/// Error returned by [`run_checked`].
#[derive(Debug)]
pub enum RunCommandError {
    Io {
        command: CommandSpec,
        source: io::Error,
    },
    Failed(Box<CommandFailure>),
}

impl RunCommandError {
    /// The failed run, when the command could be started.
    pub fn failure(&self) -> Option<&CommandFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            Self::Io { .. } => None,
        }
    }
}

impl fmt::Display for RunCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { command, source } => write!(f, "failed to run `{command}`: {source}"),
            Self::Failed(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for RunCommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Failed(err) => Some(err.as_ref()),
        }
    }
}

/// Runs `command` to completion. The exit status is returned as data; only a
/// failure to spawn or wait is an error.
pub fn run(command: &CommandSpec, opts: &RunOptions) -> io::Result<CommandResult> {
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .current_dir(&command.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    // Own process group, so a timeout can signal every descendant.
    #[cfg(unix)]
    unsafe {
        use std::os::unix::process::CommandExt;

        cmd.pre_exec(|| {
            // SAFETY: `setpgid` is async-signal-safe and runs in the forked child.
            if libc::setpgid(0, 0) != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }

    tracing::debug!(
        target: "anvil.process",
        command = %command,
        cwd = %command.cwd.display(),
        "spawning"
    );
    let start = Instant::now();
    let mut child = cmd.spawn()?;

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return Err(io::Error::other("child output was not captured"));
    };
    let max_bytes = opts.max_bytes;
    let stdout_handle = thread::spawn(move || read_bounded(stdout, max_bytes));
    let stderr_handle = thread::spawn(move || read_bounded(stderr, max_bytes));

    let mut timed_out = false;
    let status = match opts.timeout {
        None => child.wait()?,
        Some(timeout) => loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if start.elapsed() >= timeout {
                timed_out = true;
                tracing::warn!(
                    target: "anvil.process",
                    command = %command,
                    timeout_ms = timeout.as_millis() as u64,
                    "command timed out; terminating process group"
                );
                break terminate_process_tree(&mut child, opts.kill_grace)?;
            }
            thread::sleep(Duration::from_millis(50).min(timeout.saturating_sub(start.elapsed())));
        },
    };

    let (stdout, stdout_truncated) = join_reader(stdout_handle)?;
    let (stderr, stderr_truncated) = join_reader(stderr_handle)?;
    let elapsed = start.elapsed();

    tracing::debug!(
        target: "anvil.process",
        command = %command,
        status = %status,
        elapsed_ms = elapsed.as_millis() as u64,
        "command finished"
    );

    Ok(CommandResult {
        status,
        output: BoundedOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            truncated: stdout_truncated || stderr_truncated,
        },
        timed_out,
        elapsed,
    })
}

/// Runs `command` and treats a non-zero exit or a timeout as an error.
pub fn run_checked(
    command: &CommandSpec,
    opts: &RunOptions,
) -> Result<CommandResult, RunCommandError> {
    let result = run(command, opts).map_err(|source| RunCommandError::Io {
        command: command.clone(),
        source,
    })?;

    if result.timed_out || !result.status.success() {
        return Err(RunCommandError::Failed(Box::new(CommandFailure {
            command: command.clone(),
            status: result.status,
            output: result.output,
            timed_out: result.timed_out,
        })));
    }
    Ok(result)
}

fn terminate_process_tree(
    child: &mut std::process::Child,
    grace: Duration,
) -> io::Result<ExitStatus> {
    #[cfg(unix)]
    {
        // negative pid: the group created by setpgid(0, 0)
        let group = -(child.id() as i32);
        unsafe {
            let _ = libc::kill(group, libc::SIGTERM);
        }

        let start = Instant::now();
        while start.elapsed() < grace {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            thread::sleep(Duration::from_millis(25));
        }

        unsafe {
            let _ = libc::kill(group, libc::SIGKILL);
        }
        child.wait()
    }

    #[cfg(windows)]
    {
        let _ = grace;
        // `Child::kill` would leave a JVM spawned by a wrapper script running.
        let pid = child.id().to_string();
        let _ = Command::new("taskkill")
            .args(["/PID", &pid, "/T", "/F"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        let _ = child.kill();
        child.wait()
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = grace;
        let _ = child.kill();
        child.wait()
    }
}

fn join_reader(handle: thread::JoinHandle<io::Result<(Vec<u8>, bool)>>) -> io::Result<(Vec<u8>, bool)> {
    handle
        .join()
        .map_err(|_| io::Error::other("output reader thread panicked"))?
}

fn read_bounded(mut reader: impl Read, max_bytes: usize) -> io::Result<(Vec<u8>, bool)> {
    let mut out = Vec::new();
    let mut truncated = false;
    let mut buf = [0u8; 8 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        let keep = max_bytes.saturating_sub(out.len()).min(n);
        out.extend_from_slice(&buf[..keep]);
        truncated |= keep < n;
    }
    Ok((out, truncated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_arguments_with_spaces() {
        let spec = CommandSpec::new("git")
            .args(["commit", "-m", "Added decompiled sources."])
            .current_dir("/tmp");
        assert_eq!(
            spec.to_string(),
            "git commit -m \"Added decompiled sources.\""
        );
    }

    #[test]
    fn read_bounded_truncates() {
        let data = vec![b'x'; 10_000];
        let (out, truncated) = read_bounded(data.as_slice(), 100).unwrap();
        assert_eq!(out.len(), 100);
        assert!(truncated);

        let (out, truncated) = read_bounded(&b"short"[..], 100).unwrap();
        assert_eq!(out, b"short");
        assert!(!truncated);
    }
}
