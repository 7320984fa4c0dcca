//! Toolchain installation pipeline.
//!
//! ## States
//!
//! ```text
//! Idle -> Spawning -> Executing | Streaming
//!      -> AwaitingPostInstallDecision -> ExecutingPostInstall
//!      -> Completed | Failed | Cancelled
//! ```
//!
//! Every transition is logged at debug level. The post-install states are
//! only entered on Linux when swiftly wrote a non-empty post-install script.
//!
//! ## Progress
//!
//! With a [`ProgressSink`], a FIFO is created with `mkfifo` before swiftly is
//! spawned and passed as `--progress-file`. A reader task consumes it while
//! the installer runs; events reach the sink in pipe order. Once the installer
//! exits the reader is released and joined, and a reader failure fails the
//! install.
//!
//! ## Temporary files
//!
//! The post-install file and the FIFO get fresh random names under the
//! configured temporary directory and are removed when the install ends,
//! whatever the outcome.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::cancel::CancelToken;
use crate::errors::ToolchainError;
use crate::manager::Swiftly;
use crate::post_install::{PostInstallExecutor, PostInstallOutcome};
use crate::process::{Invocation, ProcessRunner};
use crate::progress::{self, ProgressEvent, ProgressSink};
use crate::prompt::Prompter;

/// How often a stuck progress reader is poked after the installer exits.
const RELEASE_INTERVAL: Duration = Duration::from_millis(50);

/// How many times a stuck progress reader is poked before it is abandoned.
const RELEASE_ATTEMPTS: u32 = 100;

/// Per-install temporary paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPaths {
    /// Where swiftly writes the post-install script, if it needs one.
    pub post_install: PathBuf,
    /// The progress FIFO.
    pub progress_pipe: PathBuf,
}

impl InstallPaths {
    /// Generates a fresh pair of random paths under `temp_dir`.
    #[must_use]
    pub fn generate(temp_dir: &Path) -> Self {
        let id: u64 = rand::random();
        Self {
            post_install: temp_dir.join(format!("swtc-{id:016x}-post-install.sh")),
            progress_pipe: temp_dir.join(format!("swtc-{id:016x}-progress.pipe")),
        }
    }
}

/// One run of the installation pipeline.
pub struct InstallRequest<'a> {
    /// Toolchain to install, as swiftly names it (`6.0.3`, `main-snapshot`).
    pub version: String,
    pub sink: Option<&'a dyn ProgressSink>,
    pub cancel: CancelToken,
    /// Temporary paths; generated when `None`.
    pub paths: Option<InstallPaths>,
}

impl InstallRequest<'static> {
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            sink: None,
            cancel: CancelToken::never(),
            paths: None,
        }
    }
}

impl<'a> InstallRequest<'a> {
    /// Streams progress to `sink`.
    #[must_use]
    pub fn with_sink<'b>(self, sink: &'b dyn ProgressSink) -> InstallRequest<'b> {
        InstallRequest {
            version: self.version,
            sink: Some(sink),
            cancel: self.cancel,
            paths: self.paths,
        }
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn with_paths(mut self, paths: InstallPaths) -> Self {
        self.paths = Some(paths);
        self
    }
}

impl fmt::Debug for InstallRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallRequest")
            .field("version", &self.version)
            .field("sink", &self.sink.is_some())
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub version: String,
    pub post_install: PostInstallOutcome,
}

/// Pipeline state, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Idle,
    Spawning,
    Executing,
    Streaming,
    AwaitingPostInstallDecision,
    ExecutingPostInstall,
    Completed,
    Failed,
    Cancelled,
}

impl InstallState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Spawning => "spawning",
            Self::Executing => "executing",
            Self::Streaming => "streaming",
            Self::AwaitingPostInstallDecision => "awaiting-post-install-decision",
            Self::ExecutingPostInstall => "executing-post-install",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns whether no further transitions can happen.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct StateTracker<'a> {
    version: &'a str,
    state: InstallState,
}

impl<'a> StateTracker<'a> {
    fn new(version: &'a str) -> Self {
        Self {
            version,
            state: InstallState::Idle,
        }
    }

    fn enter(&mut self, next: InstallState) {
        tracing::debug!(
            version = self.version,
            from = %self.state,
            to = %next,
            "install state"
        );
        self.state = next;
    }
}

impl Swiftly {
    /// Installs a toolchain with `swiftly install`.
    ///
    /// Runs `swiftly install <version> --use --assume-yes --post-install-file
    /// <file>`, streaming progress when the request has a sink, then handles
    /// any post-install script (see [`crate::post_install`]).
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedPlatform` before spawning anything on platforms
    /// swiftly does not support, `Cancelled` when the request's token fires,
    /// and otherwise a failure whose message names the version.
    pub async fn install_toolchain(
        &self,
        request: InstallRequest<'_>,
        prompter: &dyn Prompter,
    ) -> Result<InstallOutcome, ToolchainError> {
        if !self.platform().supports_manager() {
            return Err(ToolchainError::unsupported_platform(self.platform()));
        }

        let InstallRequest {
            version,
            sink,
            cancel,
            paths,
        } = request;
        let paths = paths.unwrap_or_else(|| InstallPaths::generate(self.temp_dir()));
        let mut state = StateTracker::new(&version);

        tracing::info!(version = %version, "installing toolchain");
        let result = self
            .run_install(&version, sink, &cancel, &paths, prompter, &mut state)
            .await;
        self.remove_temp_files(&paths).await;

        match result {
            Ok(post_install) => {
                state.enter(InstallState::Completed);
                tracing::info!(version = %version, "toolchain installed");
                Ok(InstallOutcome {
                    version: version.clone(),
                    post_install,
                })
            }
            Err(e) if e.is_cancelled() => {
                state.enter(InstallState::Cancelled);
                Err(ToolchainError::Cancelled)
            }
            Err(e) => {
                state.enter(InstallState::Failed);
                Err(ToolchainError::install_failed(version.clone(), e))
            }
        }
    }

    async fn run_install(
        &self,
        version: &str,
        sink: Option<&dyn ProgressSink>,
        cancel: &CancelToken,
        paths: &InstallPaths,
        prompter: &dyn Prompter,
        state: &mut StateTracker<'_>,
    ) -> Result<PostInstallOutcome, ToolchainError> {
        state.enter(InstallState::Spawning);
        if cancel.is_cancelled() {
            return Err(ToolchainError::Cancelled);
        }

        let invocation = self
            .command()
            .args(["install", version, "--use", "--assume-yes", "--post-install-file"])
            .arg(path_arg(&paths.post_install));

        match sink {
            None => {
                state.enter(InstallState::Executing);
                self.runner().run(&invocation, cancel).await?;
            }
            Some(sink) => {
                let pipe = &paths.progress_pipe;
                self.runner()
                    .run(&Invocation::new("mkfifo").arg(path_arg(pipe)), cancel)
                    .await?;
                let invocation = invocation.arg("--progress-file").arg(path_arg(pipe));
                state.enter(InstallState::Streaming);
                stream_install(self.runner(), &invocation, pipe, sink, cancel).await?;
            }
        }

        if !self.fs().exists(&paths.post_install).await {
            return Ok(PostInstallOutcome::NotRequired);
        }
        if !self.platform().requires_privileged_post_install() {
            tracing::info!(version, "ignoring post-install script on this platform");
            return Ok(PostInstallOutcome::Skipped);
        }

        let executor = PostInstallExecutor {
            runner: self.runner(),
            fs: self.fs(),
            prompter,
            allow_list: self.allow_list(),
        };
        let script = executor.review(version, &paths.post_install).await?;
        if script.lines().is_empty() {
            return Ok(PostInstallOutcome::NotRequired);
        }

        state.enter(InstallState::AwaitingPostInstallDecision);
        if !executor.ask(version, cancel).await? {
            executor.warn_declined(version);
            return Ok(PostInstallOutcome::Declined);
        }

        state.enter(InstallState::ExecutingPostInstall);
        executor
            .execute(version, &paths.post_install, cancel)
            .await?;
        Ok(PostInstallOutcome::Executed)
    }

    async fn remove_temp_files(&self, paths: &InstallPaths) {
        for path in [&paths.post_install, &paths.progress_pipe] {
            match self.fs().remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "failed to remove temp file");
                }
            }
        }
    }
}

/// Runs the installer while a reader task drains the progress pipe.
async fn stream_install(
    runner: &dyn ProcessRunner,
    invocation: &Invocation,
    pipe: &Path,
    sink: &dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<(), ToolchainError> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let reader_pipe = pipe.to_path_buf();
    let reader = tokio::spawn(async move { progress::read_progress(&reader_pipe, tx).await });

    let installer = runner.run(invocation, cancel);
    tokio::pin!(installer);

    let mut receiving = true;
    let outcome = loop {
        tokio::select! {
            biased;
            result = &mut installer => break result,
            event = rx.recv(), if receiving => match event {
                Some(event) => deliver(sink, cancel, &event),
                None => receiving = false,
            },
        }
    };

    release_reader(pipe, &reader).await;
    let read_result = reader.await;

    if outcome.is_ok() {
        while let Ok(event) = rx.try_recv() {
            deliver(sink, cancel, &event);
        }
    }
    outcome?;

    match read_result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ToolchainError::io("failed to read install progress", e)),
        Err(e) => Err(ToolchainError::io(
            "install progress reader did not finish",
            io::Error::other(e),
        )),
    }
}

fn deliver(sink: &dyn ProgressSink, cancel: &CancelToken, event: &ProgressEvent) {
    if !cancel.is_cancelled() {
        sink.on_event(event);
    }
}

/// Lets a reader still blocked opening the FIFO run to completion.
///
/// Opening a FIFO for reading blocks until a writer appears. If the installer
/// exited without opening it, a throwaway writer is opened and dropped so the
/// reader gets past `open` and sees EOF.
#[cfg(unix)]
async fn release_reader(pipe: &Path, reader: &JoinHandle<io::Result<()>>) {
    for _ in 0..RELEASE_ATTEMPTS {
        if reader.is_finished() {
            return;
        }
        drop(tokio::net::unix::pipe::OpenOptions::new().open_sender(pipe));
        tokio::time::sleep(RELEASE_INTERVAL).await;
    }
    if !reader.is_finished() {
        tracing::warn!(pipe = %pipe.display(), "abandoning stuck progress reader");
        reader.abort();
    }
}

#[cfg(not(unix))]
async fn release_reader(pipe: &Path, reader: &JoinHandle<io::Result<()>>) {
    for _ in 0..RELEASE_ATTEMPTS {
        if reader.is_finished() {
            return;
        }
        tokio::time::sleep(RELEASE_INTERVAL).await;
    }
    tracing::warn!(pipe = %pipe.display(), "abandoning stuck progress reader");
    reader.abort();
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_paths_are_distinct_and_inside_temp_dir() {
        let temp = std::env::temp_dir().join("swtc_test_install_paths");
        let a = InstallPaths::generate(&temp);
        let b = InstallPaths::generate(&temp);
        assert_ne!(a, b);
        assert_ne!(a.post_install, a.progress_pipe);
        assert!(a.post_install.starts_with(&temp));
        assert!(a.progress_pipe.starts_with(&temp));
    }

    #[test]
    fn request_builder_keeps_fields() {
        let sink = |_: &ProgressEvent| {};
        let paths = InstallPaths::generate(Path::new("/tmp"));
        let request = InstallRequest::new("6.0.3")
            .with_paths(paths.clone())
            .with_sink(&sink);
        assert_eq!(request.version, "6.0.3");
        assert!(request.sink.is_some());
        assert_eq!(request.paths, Some(paths));
        assert!(!request.cancel.is_cancelled());
    }

    #[test]
    fn terminal_states() {
        assert!(InstallState::Completed.is_terminal());
        assert!(InstallState::Cancelled.is_terminal());
        assert!(InstallState::Failed.is_terminal());
        assert!(!InstallState::Streaming.is_terminal());
        assert_eq!(
            InstallState::AwaitingPostInstallDecision.to_string(),
            "awaiting-post-install-decision"
        );
    }
}
