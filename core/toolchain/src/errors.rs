//! Error types for the toolchain core.
//!
//! This module defines the `ToolchainError` enum which consolidates every failure
//! the core can surface to a caller. Read paths (discovery, listing) mostly
//! swallow these and degrade to empty results; install and post-install paths
//! always propagate them so the caller can render an accurate status.
//!
//! Cancellation is modelled as its own variant rather than a failure. Callers
//! should check [`ToolchainError::is_cancelled`] before showing error UI.

use std::path::PathBuf;
use thiserror::Error;

use crate::platform::Platform;

/// Message carried by [`ToolchainError::Cancelled`].
///
/// Front ends compare against the variant, not this string, but the text is
/// stable so log scrapers can rely on it as well.
pub const CANCELLED_MESSAGE: &str = "installation cancelled";

/// Consolidated error type for toolchain operations.
#[derive(Debug, Error)]
pub enum ToolchainError {
    /// The current platform cannot run the toolchain manager.
    #[error("toolchain management is not supported on this platform ({platform})")]
    UnsupportedPlatform {
        /// The detected platform.
        platform: Platform,
    },

    /// An external process could not be started.
    #[error("failed to run '{program}': {source}")]
    ProcessSpawn {
        /// The program that failed to start.
        program: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An external process exited unsuccessfully.
    #[error("'{program}' exited with {}{}", exit_code_text(*.code), stderr_suffix(.stderr))]
    ProcessExit {
        /// The program that failed.
        program: String,
        /// Exit code, `None` when the process was killed by a signal.
        code: Option<i32>,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// A payload produced by the manager could not be understood at all.
    #[error("parse error: {message}")]
    Parse {
        /// Description of the parse failure.
        message: String,
    },

    /// The post-install script contains commands that could not be verified safe.
    #[error(
        "installation of Swift {version} requires additional system packages, but the \
         post-install script contains commands that could not be verified as safe ({reason})"
    )]
    ScriptValidationRejected {
        /// The toolchain version being installed.
        version: String,
        /// Which rule rejected the script. Never contains script text.
        reason: String,
    },

    /// The privileged post-install run failed.
    #[error("failed to install additional system packages for Swift {version}: {message}")]
    PostInstallFailed {
        /// The toolchain version being installed.
        version: String,
        /// Description of the failure.
        message: String,
    },

    /// The operation was cancelled by the user.
    #[error("{}", CANCELLED_MESSAGE)]
    Cancelled,

    /// The manager configuration file does not exist.
    #[error("manager configuration not found at {path}")]
    ConfigNotFound {
        /// The expected location of the configuration file.
        path: PathBuf,
    },

    /// A default location could not be derived from the user's home directory.
    #[error("cannot determine home directory; set the {variable} environment variable")]
    HomeDirUnavailable {
        /// The environment variable that overrides the default.
        variable: &'static str,
    },

    /// Error reading or writing files.
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O operation that failed.
        message: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Installation of a specific toolchain version failed.
    #[error("failed to install Swift {version}: {source}")]
    InstallFailed {
        /// The toolchain version being installed.
        version: String,
        /// The failure that stopped the installation.
        #[source]
        source: Box<ToolchainError>,
    },
}

fn exit_code_text(code: Option<i32>) -> String {
    code.map_or_else(|| "a signal".to_string(), |code| format!("code {code}"))
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

impl ToolchainError {
    /// Creates a new `UnsupportedPlatform` error.
    #[must_use]
    pub const fn unsupported_platform(platform: Platform) -> Self {
        Self::UnsupportedPlatform { platform }
    }

    /// Creates a new `ProcessSpawn` error.
    #[must_use]
    pub fn process_spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::ProcessSpawn {
            program: program.into(),
            source,
        }
    }

    /// Creates a new `ProcessExit` error.
    #[must_use]
    pub fn process_exit(program: impl Into<String>, code: Option<i32>, stderr: &str) -> Self {
        Self::ProcessExit {
            program: program.into(),
            code,
            stderr: stderr.trim().to_string(),
        }
    }

    /// Creates a new `Parse` error.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Creates a new `ScriptValidationRejected` error.
    #[must_use]
    pub fn script_rejected(version: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ScriptValidationRejected {
            version: version.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `PostInstallFailed` error.
    #[must_use]
    pub fn post_install_failed(version: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PostInstallFailed {
            version: version.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigNotFound` error.
    #[must_use]
    pub fn config_not_found(path: PathBuf) -> Self {
        Self::ConfigNotFound { path }
    }

    /// Creates a new `HomeDirUnavailable` error.
    #[must_use]
    pub const fn home_dir_unavailable(variable: &'static str) -> Self {
        Self::HomeDirUnavailable { variable }
    }

    /// Creates a new `Io` error from an I/O error with context.
    #[must_use]
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Wraps an error raised while installing `version`.
    ///
    /// Cancellation, rejected scripts and post-install failures already name
    /// the version (or must stay recognisable) and are returned unchanged.
    #[must_use]
    pub fn install_failed(version: impl Into<String>, source: Self) -> Self {
        match source {
            Self::Cancelled
            | Self::ScriptValidationRejected { .. }
            | Self::PostInstallFailed { .. }
            | Self::InstallFailed { .. }
            | Self::UnsupportedPlatform { .. } => source,
            other => Self::InstallFailed {
                version: version.into(),
                source: Box::new(other),
            },
        }
    }

    /// Returns `true` for user-initiated cancellation.
    ///
    /// Callers must not show error UI when this returns `true`.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::InstallFailed { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}
