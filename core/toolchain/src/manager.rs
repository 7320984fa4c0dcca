//! swiftly client.
//!
//! [`Swiftly`] wraps every swiftly command the core issues. It is the only
//! type that knows swiftly's command line; discovery and the front end talk to
//! it through the [`ToolchainManager`] trait.
//!
//! ## Degradation
//!
//! Read operations (`version`, `list`, `list_available`, `in_use_*`,
//! `is_installed`) never fail. A missing binary, a non-zero exit or an
//! unparseable payload is logged and turned into an empty result, since an
//! incomplete toolchain list is less harmful than blocking the caller.
//!
//! On platforms swiftly does not support, every operation returns without
//! spawning a process.
//!
//! ## Version gating
//!
//! swiftly 1.1.0 introduced `--format=json`. Older releases are listed from
//! their on-disk `config.json` instead, see [`crate::config`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::cancel::CancelToken;
use crate::config::LegacyConfig;
use crate::discovery::{ToolchainRecord, ToolchainSource};
use crate::errors::ToolchainError;
use crate::fs::{Filesystem, LocalFilesystem};
use crate::install::{InstallOutcome, InstallRequest};
use crate::listing::{self, AvailableToolchain, ListedToolchain};
use crate::paths::ManagerPaths;
use crate::platform::Platform;
use crate::post_install::AllowList;
use crate::process::{Invocation, ProcessOutput, ProcessRunner, SystemProcessRunner};
use crate::prompt::Prompter;
use crate::settings::Settings;
use crate::version::{self, ToolchainVersion, WireVersion};

/// Operations on a toolchain manager.
#[async_trait]
pub trait ToolchainManager: Send + Sync {
    /// Returns the manager's own version, `None` if it cannot be determined.
    async fn version(&self) -> Option<semver::Version>;

    /// Returns whether the manager can list toolchains as JSON.
    async fn supports_json_output(&self) -> bool;

    /// Lists installed toolchains.
    async fn list(&self) -> Vec<ToolchainRecord>;

    /// Lists toolchains available for download, optionally filtered.
    async fn list_available(&self, filter: Option<&str>) -> Vec<AvailableToolchain>;

    /// Returns the location of the active toolchain.
    async fn in_use_location(&self, cwd: Option<&Path>) -> Option<PathBuf>;

    /// Returns the name of the active toolchain.
    async fn in_use_version(&self, cwd: Option<&Path>) -> Option<String>;

    /// Returns whether a toolchain named `version` is installed.
    async fn is_installed(&self, version: &str) -> bool;

    /// Makes `version` the active toolchain.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedPlatform` or the manager's failure.
    async fn use_toolchain(&self, version: &str, cwd: Option<&Path>)
    -> Result<(), ToolchainError>;

    /// Installs a toolchain, see [`crate::install`].
    ///
    /// # Errors
    ///
    /// Returns a typed failure naming the version, or `Cancelled`.
    async fn install_toolchain(
        &self,
        request: InstallRequest<'_>,
        prompter: &dyn Prompter,
    ) -> Result<InstallOutcome, ToolchainError>;
}

/// Client for the swiftly CLI.
#[derive(Clone)]
pub struct Swiftly {
    platform: Platform,
    program: String,
    paths: ManagerPaths,
    temp_dir: PathBuf,
    allow_list: AllowList,
    runner: Arc<dyn ProcessRunner>,
    fs: Arc<dyn Filesystem>,
}

impl std::fmt::Debug for Swiftly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Swiftly")
            .field("platform", &self.platform)
            .field("program", &self.program)
            .field("paths", &self.paths)
            .field("temp_dir", &self.temp_dir)
            .finish_non_exhaustive()
    }
}

impl Swiftly {
    /// Creates a client with explicit collaborators.
    #[must_use]
    pub fn new(
        platform: Platform,
        program: impl Into<String>,
        paths: ManagerPaths,
        runner: Arc<dyn ProcessRunner>,
        fs: Arc<dyn Filesystem>,
    ) -> Self {
        Self {
            platform,
            program: program.into(),
            paths,
            temp_dir: std::env::temp_dir(),
            allow_list: AllowList::default(),
            runner,
            fs,
        }
    }

    /// Creates a client that runs real processes against the local filesystem.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.platform,
            settings.manager_program.clone(),
            settings.paths.clone(),
            Arc::new(SystemProcessRunner),
            Arc::new(LocalFilesystem),
        )
        .with_temp_dir(settings.temp_dir.clone())
        .with_allow_list(settings.allow_list.clone())
    }

    /// Sets the directory for per-install temporary files.
    #[must_use]
    pub fn with_temp_dir(mut self, temp_dir: PathBuf) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    /// Sets the post-install allow-list.
    #[must_use]
    pub fn with_allow_list(mut self, allow_list: AllowList) -> Self {
        self.allow_list = allow_list;
        self
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn paths(&self) -> &ManagerPaths {
        &self.paths
    }

    #[must_use]
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    #[must_use]
    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    pub(crate) fn runner(&self) -> &dyn ProcessRunner {
        self.runner.as_ref()
    }

    pub(crate) fn fs(&self) -> &dyn Filesystem {
        self.fs.as_ref()
    }

    pub(crate) fn command(&self) -> Invocation {
        Invocation::new(&self.program)
    }

    async fn run(&self, invocation: Invocation) -> Result<ProcessOutput, ToolchainError> {
        self.runner.run(&invocation, &CancelToken::never()).await
    }

    /// Runs `swiftly --version`.
    pub async fn version(&self) -> Option<semver::Version> {
        if !self.platform.supports_manager() {
            return None;
        }
        match self.run(self.command().arg("--version")).await {
            Ok(output) => {
                let parsed = version::parse_manager_version(&output.stdout);
                if parsed.is_none() {
                    tracing::warn!(output = %output.stdout.trim(), "unrecognised swiftly version");
                }
                parsed
            }
            Err(e) => {
                tracing::debug!(error = %e, "swiftly --version failed");
                None
            }
        }
    }

    /// Returns whether the installed swiftly supports `--format=json`.
    pub async fn supports_json_output(&self) -> bool {
        self.version()
            .await
            .is_some_and(|v| version::supports_json_output(&v))
    }

    /// Lists installed toolchains, newest swiftly first, legacy config otherwise.
    pub async fn list(&self) -> Vec<ToolchainRecord> {
        if !self.platform.supports_manager() {
            return Vec::new();
        }

        if self.supports_json_output().await {
            return match self.list_json().await {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to list swiftly toolchains");
                    Vec::new()
                }
            };
        }

        match self.legacy_installed_toolchains().await {
            Ok(records) => records,
            Err(ToolchainError::ConfigNotFound { path }) => {
                tracing::debug!(path = %path.display(), "no swiftly config, nothing installed");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read swiftly config");
                Vec::new()
            }
        }
    }

    async fn list_json(&self) -> Result<Vec<ToolchainRecord>, ToolchainError> {
        let output = self
            .run(self.command().args(["list", "--format=json"]))
            .await?;
        let listed = listing::parse_installed(&output.stdout)?;
        Ok(listed
            .into_iter()
            .map(|toolchain| self.managed_record(toolchain))
            .collect())
    }

    fn managed_record(&self, toolchain: ListedToolchain) -> ToolchainRecord {
        let name = toolchain.version.name().to_string();
        let path = match toolchain.version {
            ToolchainVersion::System { .. } => None,
            _ => Some(self.paths.toolchain_dir(&name)),
        };
        ToolchainRecord {
            name,
            version: toolchain.version,
            installed: true,
            in_use: toolchain.in_use,
            is_default: toolchain.is_default,
            source: ToolchainSource::Managed,
            path,
        }
    }

    /// Lists installed toolchains from swiftly's legacy `config.json`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigNotFound` if the file does not exist, and `Io` or
    /// `Parse` if it cannot be read.
    pub async fn legacy_installed_toolchains(&self) -> Result<Vec<ToolchainRecord>, ToolchainError> {
        if !self.platform.supports_manager() {
            return Ok(Vec::new());
        }

        let config = LegacyConfig::load(self.fs.as_ref(), &self.paths.config_file()).await?;
        let in_use = config.in_use.as_deref();
        Ok(config
            .installed_toolchains
            .iter()
            .map(|name| {
                let active = in_use == Some(name.as_str());
                ToolchainRecord {
                    name: name.clone(),
                    version: ToolchainVersion::parse_identifier(name),
                    installed: true,
                    in_use: active,
                    is_default: active,
                    source: ToolchainSource::Managed,
                    path: Some(self.paths.toolchain_dir(name)),
                }
            })
            .collect())
    }

    /// Lists toolchains available for download.
    ///
    /// Empty when swiftly predates JSON output, as there is no other source.
    pub async fn list_available(&self, filter: Option<&str>) -> Vec<AvailableToolchain> {
        if !self.platform.supports_manager() || !self.supports_json_output().await {
            return Vec::new();
        }

        let mut invocation = self.command().args(["list-available", "--format=json"]);
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            invocation = invocation.arg(filter);
        }

        let result = match self.run(invocation).await {
            Ok(output) => listing::parse_available(&output.stdout),
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to list available toolchains");
            Vec::new()
        })
    }

    /// Runs `swiftly use --print-location`.
    pub async fn in_use_location(&self, cwd: Option<&Path>) -> Option<PathBuf> {
        if !self.platform.supports_manager() {
            return None;
        }
        let invocation = self
            .command()
            .args(["use", "--print-location"])
            .current_dir(cwd);
        match self.run(invocation).await {
            Ok(output) => {
                let location = output.stdout.trim();
                (!location.is_empty()).then(|| PathBuf::from(location))
            }
            Err(e) => {
                tracing::debug!(error = %e, "swiftly use --print-location failed");
                None
            }
        }
    }

    /// Returns the name of the toolchain swiftly considers active in `cwd`.
    pub async fn in_use_version(&self, cwd: Option<&Path>) -> Option<String> {
        if !self.platform.supports_manager() {
            return None;
        }

        let json = self.supports_json_output().await;
        let mut invocation = self.command().arg("use");
        if json {
            invocation = invocation.arg("--format=json");
        }
        let output = match self.run(invocation.current_dir(cwd)).await {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!(error = %e, "swiftly use failed");
                return None;
            }
        };

        if json {
            parse_in_use_json(&output.stdout)
        } else {
            output
                .stdout
                .split_whitespace()
                .next()
                .map(ToString::to_string)
        }
    }

    /// Runs `swiftly use <version>`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedPlatform`, `ProcessSpawn` or `ProcessExit`.
    pub async fn use_toolchain(
        &self,
        version: &str,
        cwd: Option<&Path>,
    ) -> Result<(), ToolchainError> {
        if !self.platform.supports_manager() {
            return Err(ToolchainError::unsupported_platform(self.platform));
        }
        self.run(self.command().args(["use", version]).current_dir(cwd))
            .await?;
        tracing::info!(version, "switched active toolchain");
        Ok(())
    }

    /// Returns whether `version` names an installed toolchain.
    pub async fn is_installed(&self, version: &str) -> bool {
        self.list().await.iter().any(|record| record.name == version)
    }
}

fn parse_in_use_json(text: &str) -> Option<String> {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "unexpected swiftly use output");
            return None;
        }
    };
    match value.get("version")? {
        Value::String(name) => Some(name.clone()),
        object @ Value::Object(_) => serde_json::from_value::<WireVersion>(object.clone())
            .ok()?
            .into_version()
            .map(|v| v.name().to_string()),
        _ => None,
    }
}

#[async_trait]
impl ToolchainManager for Swiftly {
    async fn version(&self) -> Option<semver::Version> {
        Swiftly::version(self).await
    }

    async fn supports_json_output(&self) -> bool {
        Swiftly::supports_json_output(self).await
    }

    async fn list(&self) -> Vec<ToolchainRecord> {
        Swiftly::list(self).await
    }

    async fn list_available(&self, filter: Option<&str>) -> Vec<AvailableToolchain> {
        Swiftly::list_available(self, filter).await
    }

    async fn in_use_location(&self, cwd: Option<&Path>) -> Option<PathBuf> {
        Swiftly::in_use_location(self, cwd).await
    }

    async fn in_use_version(&self, cwd: Option<&Path>) -> Option<String> {
        Swiftly::in_use_version(self, cwd).await
    }

    async fn is_installed(&self, version: &str) -> bool {
        Swiftly::is_installed(self, version).await
    }

    async fn use_toolchain(
        &self,
        version: &str,
        cwd: Option<&Path>,
    ) -> Result<(), ToolchainError> {
        Swiftly::use_toolchain(self, version, cwd).await
    }

    async fn install_toolchain(
        &self,
        request: InstallRequest<'_>,
        prompter: &dyn Prompter,
    ) -> Result<InstallOutcome, ToolchainError> {
        Swiftly::install_toolchain(self, request, prompter).await
    }
}
