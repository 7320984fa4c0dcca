//! Environment-driven configuration.
//!
//! Everything the core needs to know about its surroundings is collected once
//! into [`Settings`] by the front end and handed down explicitly.
//!
//! | Variable                 | Meaning                                    |
//! |--------------------------|--------------------------------------------|
//! | `SWTC_MANAGER_PATH`      | swiftly binary (else `which swiftly`)      |
//! | `SWIFTLY_HOME_DIR`       | swiftly home, see [`ManagerPaths::new`]    |
//! | `SWIFTLY_TOOLCHAINS_DIR` | managed toolchain root                     |
//! | `SWTC_ALLOWLIST`         | JSON post-install allow-list file          |
//! | `SWTC_TMPDIR`            | directory for per-install temporary files  |
//! | `SWTC_LOG`               | log level (`error` ... `trace`)            |

use std::path::{Path, PathBuf};

use crate::errors::ToolchainError;
use crate::paths::{ManagerPaths, public_toolchain_roots};
use crate::platform::Platform;
use crate::post_install::AllowList;

/// Environment variable naming the swiftly binary.
pub const MANAGER_PATH_ENV: &str = "SWTC_MANAGER_PATH";

/// Environment variable naming a JSON allow-list file.
pub const ALLOWLIST_ENV: &str = "SWTC_ALLOWLIST";

/// Environment variable naming the temporary directory for installs.
pub const TMPDIR_ENV: &str = "SWTC_TMPDIR";

/// Environment variable selecting the log level.
pub const LOG_ENV: &str = "SWTC_LOG";

/// Binary name looked up on `PATH` when no explicit path is configured.
pub const DEFAULT_MANAGER_PROGRAM: &str = "swiftly";

/// Resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub platform: Platform,
    /// Program used to invoke swiftly.
    pub manager_program: String,
    pub paths: ManagerPaths,
    /// Directories scanned for standalone toolchain bundles.
    pub public_roots: Vec<PathBuf>,
    /// Where per-install temporary files are created.
    pub temp_dir: PathBuf,
    pub allow_list: AllowList,
    /// Log level from `SWTC_LOG`, if set and valid.
    pub log_level: Option<tracing::Level>,
}

impl Settings {
    /// Reads settings for the detected platform from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if swiftly's directories cannot be resolved or the
    /// configured allow-list cannot be read.
    pub fn from_env() -> Result<Self, ToolchainError> {
        Self::for_platform(Platform::detect())
    }

    /// Reads settings from the environment for an explicit platform.
    ///
    /// # Errors
    ///
    /// See [`Settings::from_env`].
    pub fn for_platform(platform: Platform) -> Result<Self, ToolchainError> {
        let allow_list = match env_value(ALLOWLIST_ENV) {
            Some(path) => load_allow_list(Path::new(&path))?,
            None => AllowList::default(),
        };

        Ok(Self {
            platform,
            manager_program: resolve_manager_program(env_value(MANAGER_PATH_ENV)),
            paths: ManagerPaths::new(platform)?,
            public_roots: public_toolchain_roots(platform, dirs::home_dir().as_deref()),
            temp_dir: env_value(TMPDIR_ENV).map_or_else(std::env::temp_dir, PathBuf::from),
            allow_list,
            log_level: env_value(LOG_ENV).and_then(|level| parse_log_level(&level)),
        })
    }
}

/// Loads a JSON allow-list file.
///
/// # Errors
///
/// Returns `Io` if the file cannot be read and `Parse` if it is malformed.
pub fn load_allow_list(path: &Path) -> Result<AllowList, ToolchainError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        ToolchainError::io(format!("failed to read allow-list {}", path.display()), e)
    })?;
    AllowList::from_json(&text)
}

/// Parses a log level name, case-insensitively.
#[must_use]
pub fn parse_log_level(text: &str) -> Option<tracing::Level> {
    text.trim().parse().ok()
}

fn resolve_manager_program(explicit: Option<String>) -> String {
    if let Some(program) = explicit {
        return program;
    }
    which::which(DEFAULT_MANAGER_PROGRAM).map_or_else(
        |_| DEFAULT_MANAGER_PROGRAM.to_string(),
        |path| path.to_string_lossy().into_owned(),
    )
}

fn env_value(variable: &str) -> Option<String> {
    std::env::var(variable).ok().filter(|value| !value.is_empty())
}
