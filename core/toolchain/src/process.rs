//! External process execution.
//!
//! Every command the core runs (swiftly, `mdfind`, `xcode-select`, `mkfifo`,
//! `pkexec`) goes through the [`ProcessRunner`] trait so tests can substitute
//! a fake that records invocations instead of spawning anything.
//!
//! The contract is the same for every implementation:
//!
//! - exit code 0 yields the captured output;
//! - a non-zero exit yields [`ToolchainError::ProcessExit`] with stderr;
//! - a spawn failure yields [`ToolchainError::ProcessSpawn`];
//! - a fired [`CancelToken`] kills the child and yields
//!   [`ToolchainError::Cancelled`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::cancel::CancelToken;
use crate::errors::ToolchainError;

/// A single command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name or path.
    pub program: String,
    /// Arguments, not including the program.
    pub args: Vec<String>,
    /// Working directory, inherited when `None`.
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn current_dir(mut self, cwd: Option<&Path>) -> Self {
        self.cwd = cwd.map(Path::to_path_buf);
        self
    }

    /// Returns whether the arguments contain `arg`.
    #[must_use]
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Returns the argument following `flag`, if any.
    #[must_use]
    pub fn arg_after(&self, flag: &str) -> Option<&str> {
        let index = self.args.iter().position(|a| a == flag)?;
        self.args.get(index + 1).map(String::as_str)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured output of a successful process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Creates output with the given stdout and empty stderr.
    #[must_use]
    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

/// Runs external processes.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Runs `invocation` to completion, or until `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns `ProcessSpawn`, `ProcessExit` or `Cancelled` as described in
    /// the module documentation.
    async fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancelToken,
    ) -> Result<ProcessOutput, ToolchainError>;
}

/// [`ProcessRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessRunner;

#[async_trait]
impl ProcessRunner for SystemProcessRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancelToken,
    ) -> Result<ProcessOutput, ToolchainError> {
        if cancel.is_cancelled() {
            return Err(ToolchainError::Cancelled);
        }

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }

        tracing::trace!(command = %invocation, "spawning");
        let child = command
            .spawn()
            .map_err(|e| ToolchainError::process_spawn(&invocation.program, e))?;

        // Dropping the wait future drops the child, which kills it.
        let output = tokio::select! {
            output = child.wait_with_output() => output
                .map_err(|e| ToolchainError::process_spawn(&invocation.program, e))?,
            () = cancel.cancelled() => {
                tracing::debug!(command = %invocation, "killed on cancellation");
                return Err(ToolchainError::Cancelled);
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            Ok(ProcessOutput { stdout, stderr })
        } else {
            Err(ToolchainError::process_exit(
                &invocation.program,
                output.status.code(),
                &stderr,
            ))
        }
    }
}
