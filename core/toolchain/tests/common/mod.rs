//! Shared fakes for the integration tests.
//!
//! - [`FakeRunner`] records every invocation and answers through a handler.
//! - [`MemoryFilesystem`] is an in-memory tree.
//! - [`ScriptedPrompter`] answers confirmations from a queue and records
//!   everything it was shown.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use swift_toolchain::{
    CancelToken, Filesystem, Invocation, ManagerPaths, Platform, ProcessOutput, ProcessRunner,
    Prompter, Swiftly, SystemProcessRunner, ToolchainError,
};

/// Home directory used by [`swiftly`].
pub const SWIFTLY_HOME: &str = "/home/dev/.local/share/swiftly";

/// What a [`FakeRunner`] does with an invocation.
pub enum Reply {
    /// Exit 0 with this stdout.
    Stdout(String),
    /// Exit with a non-zero code and stderr.
    Exit { code: i32, stderr: String },
    /// Fail to spawn, as if the binary were missing.
    NotFound,
    /// Run until the cancel token fires.
    HangUntilCancelled,
    /// Run the invocation for real.
    System,
}

impl Reply {
    pub fn stdout(text: &str) -> Self {
        Self::Stdout(text.to_string())
    }

    pub fn ok() -> Self {
        Self::Stdout(String::new())
    }

    pub fn exit(code: i32, stderr: &str) -> Self {
        Self::Exit {
            code,
            stderr: stderr.to_string(),
        }
    }
}

type Handler = dyn Fn(&Invocation) -> Reply + Send + Sync;

/// [`ProcessRunner`] that records invocations instead of spawning them.
pub struct FakeRunner {
    calls: Mutex<Vec<Invocation>>,
    killed: AtomicUsize,
    handler: Box<Handler>,
}

impl FakeRunner {
    pub fn new(handler: impl Fn(&Invocation) -> Reply + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            killed: AtomicUsize::new(0),
            handler: Box::new(handler),
        })
    }

    /// A runner that fails every invocation as if nothing were installed.
    pub fn missing() -> Arc<Self> {
        Self::new(|_| Reply::NotFound)
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().expect("Should lock calls").clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().expect("Should lock calls").len()
    }

    /// Invocations whose first argument is `subcommand`.
    pub fn calls_with(&self, subcommand: &str) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|call| call.args.first().map(String::as_str) == Some(subcommand))
            .collect()
    }

    pub fn calls_to(&self, program: &str) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|call| call.program == program)
            .collect()
    }

    /// How many hanging invocations were stopped by cancellation.
    pub fn killed(&self) -> usize {
        self.killed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancelToken,
    ) -> Result<ProcessOutput, ToolchainError> {
        if cancel.is_cancelled() {
            return Err(ToolchainError::Cancelled);
        }
        self.calls
            .lock()
            .expect("Should lock calls")
            .push(invocation.clone());

        match (self.handler)(invocation) {
            Reply::Stdout(stdout) => Ok(ProcessOutput::stdout(stdout)),
            Reply::Exit { code, stderr } => Err(ToolchainError::process_exit(
                &invocation.program,
                Some(code),
                &stderr,
            )),
            Reply::NotFound => Err(ToolchainError::process_spawn(
                &invocation.program,
                io::Error::from(io::ErrorKind::NotFound),
            )),
            Reply::HangUntilCancelled => {
                cancel.cancelled().await;
                self.killed.fetch_add(1, Ordering::SeqCst);
                Err(ToolchainError::Cancelled)
            }
            Reply::System => SystemProcessRunner.run(invocation, cancel).await,
        }
    }
}

/// In-memory [`Filesystem`].
#[derive(Default)]
pub struct MemoryFilesystem {
    files: Mutex<HashMap<PathBuf, String>>,
    dirs: Mutex<HashMap<PathBuf, Vec<String>>>,
    executable: Mutex<HashSet<PathBuf>>,
    removed: Mutex<Vec<PathBuf>>,
}

impl MemoryFilesystem {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_file(&self, path: impl Into<PathBuf>, contents: &str) {
        self.files
            .lock()
            .expect("Should lock files")
            .insert(path.into(), contents.to_string());
    }

    pub fn add_dir(&self, path: impl Into<PathBuf>, entries: &[&str]) {
        self.dirs
            .lock()
            .expect("Should lock dirs")
            .insert(path.into(), entries.iter().map(ToString::to_string).collect());
    }

    pub fn has_file(&self, path: &Path) -> bool {
        self.files.lock().expect("Should lock files").contains_key(path)
    }

    pub fn is_executable(&self, path: &Path) -> bool {
        self.executable
            .lock()
            .expect("Should lock executable")
            .contains(path)
    }

    pub fn removed(&self) -> Vec<PathBuf> {
        self.removed.lock().expect("Should lock removed").clone()
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, path.display().to_string())
}

#[async_trait]
impl Filesystem for MemoryFilesystem {
    async fn exists(&self, path: &Path) -> bool {
        self.has_file(path) || self.dirs.lock().expect("Should lock dirs").contains_key(path)
    }

    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .lock()
            .expect("Should lock files")
            .get(path)
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    async fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        self.dirs
            .lock()
            .expect("Should lock dirs")
            .get(path)
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    async fn set_executable(&self, path: &Path) -> io::Result<()> {
        if !self.has_file(path) {
            return Err(not_found(path));
        }
        self.executable
            .lock()
            .expect("Should lock executable")
            .insert(path.to_path_buf());
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        let existed = self
            .files
            .lock()
            .expect("Should lock files")
            .remove(path)
            .is_some();
        if existed {
            self.removed
                .lock()
                .expect("Should lock removed")
                .push(path.to_path_buf());
            Ok(())
        } else {
            Err(not_found(path))
        }
    }
}

/// [`Prompter`] with queued answers.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<bool>>,
    hang: bool,
    questions: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    /// Answers every confirmation with `answer`.
    pub fn answering(answer: bool) -> Self {
        Self {
            answers: Mutex::new(VecDeque::from([answer])),
            ..Self::default()
        }
    }

    /// Never answers; only cancellation ends a confirmation.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().expect("Should lock questions").clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().expect("Should lock warnings").clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().expect("Should lock errors").clone()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn confirm(&self, message: &str) -> bool {
        self.questions
            .lock()
            .expect("Should lock questions")
            .push(message.to_string());
        if self.hang {
            return std::future::pending().await;
        }
        let mut answers = self.answers.lock().expect("Should lock answers");
        if answers.len() > 1 {
            answers.pop_front().unwrap_or(false)
        } else {
            answers.front().copied().unwrap_or(false)
        }
    }

    fn warn(&self, message: &str) {
        self.warnings
            .lock()
            .expect("Should lock warnings")
            .push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors
            .lock()
            .expect("Should lock errors")
            .push(message.to_string());
    }
}

/// A swiftly client on `platform` backed by the given fakes.
pub fn swiftly(
    platform: Platform,
    runner: &Arc<FakeRunner>,
    fs: &Arc<MemoryFilesystem>,
) -> Swiftly {
    Swiftly::new(
        platform,
        "swiftly",
        ManagerPaths::with_root(PathBuf::from(SWIFTLY_HOME)),
        runner.clone(),
        fs.clone(),
    )
    .with_temp_dir(PathBuf::from("/tmp/swtc-tests"))
}

/// `swiftly --version` reply for a JSON-capable release.
pub const JSON_VERSION: &str = "1.1.0\n";

/// `swiftly --version` reply for a release without JSON output.
pub const LEGACY_VERSION: &str = "1.0.0\n";
