//! Path management for swiftly and standalone toolchains.
//!
//! swiftly keeps its state in a home directory and installs toolchains into
//! a toolchains directory. Both default per platform and can be overridden
//! with the same environment variables swiftly itself honours.
//!
//! ## Directory Structure
//!
//! ```text
//! Linux                                   macOS
//! ~/.local/share/swiftly/                 ~/.swiftly/                 # SWIFTLY_HOME_DIR
//!   config.json                             config.json               # legacy config
//!   toolchains/                           ~/Library/Developer/Toolchains/  # SWIFTLY_TOOLCHAINS_DIR
//!     6.0.3/                                6.0.3/
//! ```
//!
//! Standalone toolchain bundles (`swift-*.xctoolchain`) live in the system and
//! per-user `Library/Developer/Toolchains` directories on macOS, see
//! [`public_toolchain_roots`].

use std::path::{Path, PathBuf};

use crate::errors::ToolchainError;
use crate::platform::Platform;

/// Environment variable overriding the swiftly home directory.
pub const SWIFTLY_HOME_ENV: &str = "SWIFTLY_HOME_DIR";

/// Environment variable overriding the managed toolchains directory.
pub const SWIFTLY_TOOLCHAINS_ENV: &str = "SWIFTLY_TOOLCHAINS_DIR";

/// Name of swiftly's legacy configuration file inside the home directory.
pub const CONFIG_FILE: &str = "config.json";

/// System-wide standalone toolchain directory on macOS.
pub const SYSTEM_TOOLCHAINS_DIR: &str = "/Library/Developer/Toolchains";

/// Locations of swiftly's state on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerPaths {
    /// swiftly home (`SWIFTLY_HOME_DIR`).
    pub home: PathBuf,
    /// Managed toolchain root (`SWIFTLY_TOOLCHAINS_DIR`).
    pub toolchains: PathBuf,
}

impl ManagerPaths {
    /// Resolves swiftly's directories for `platform`.
    ///
    /// The home directory is determined by:
    /// 1. The `SWIFTLY_HOME_DIR` environment variable if set
    /// 2. On macOS: `~/.swiftly`
    /// 3. Elsewhere: `~/.local/share/swiftly`
    ///
    /// The toolchains directory is `SWIFTLY_TOOLCHAINS_DIR` if set, else
    /// `~/Library/Developer/Toolchains` on macOS and `<home>/toolchains`
    /// elsewhere.
    ///
    /// # Errors
    ///
    /// Returns an error if a default is needed and the user's home directory
    /// cannot be determined.
    pub fn new(platform: Platform) -> Result<Self, ToolchainError> {
        Self::resolve(
            platform,
            env_path(SWIFTLY_HOME_ENV),
            env_path(SWIFTLY_TOOLCHAINS_ENV),
            dirs::home_dir(),
        )
    }

    /// Creates paths rooted at `home`, with toolchains under `home/toolchains`.
    ///
    /// This is useful for testing or when the home directory is known in advance.
    #[must_use = "returns new paths instance without side effects"]
    pub fn with_root(home: PathBuf) -> Self {
        Self {
            toolchains: home.join("toolchains"),
            home,
        }
    }

    fn resolve(
        platform: Platform,
        home_override: Option<PathBuf>,
        toolchains_override: Option<PathBuf>,
        user_home: Option<PathBuf>,
    ) -> Result<Self, ToolchainError> {
        let home = match home_override {
            Some(home) => home,
            None => {
                let user_home = user_home
                    .as_deref()
                    .ok_or(ToolchainError::home_dir_unavailable(SWIFTLY_HOME_ENV))?;
                if platform == Platform::MacOs {
                    user_home.join(".swiftly")
                } else {
                    user_home.join(".local").join("share").join("swiftly")
                }
            }
        };

        let toolchains = match toolchains_override {
            Some(toolchains) => toolchains,
            None if platform == Platform::MacOs => user_home
                .ok_or(ToolchainError::home_dir_unavailable(SWIFTLY_TOOLCHAINS_ENV))?
                .join("Library")
                .join("Developer")
                .join("Toolchains"),
            None => home.join("toolchains"),
        };

        Ok(Self { home, toolchains })
    }

    /// Returns the path to swiftly's legacy configuration file.
    #[must_use = "returns the path without side effects"]
    pub fn config_file(&self) -> PathBuf {
        self.home.join(CONFIG_FILE)
    }

    /// Returns the installation directory of a managed toolchain.
    #[must_use = "returns the path without side effects"]
    pub fn toolchain_dir(&self, name: &str) -> PathBuf {
        self.toolchains.join(name)
    }
}

/// Returns the directories scanned for standalone `.xctoolchain` bundles.
///
/// Empty on platforms without standalone bundles.
#[must_use]
pub fn public_toolchain_roots(platform: Platform, user_home: Option<&Path>) -> Vec<PathBuf> {
    if !platform.supports_vendor_toolchains() {
        return Vec::new();
    }
    let mut roots = vec![PathBuf::from(SYSTEM_TOOLCHAINS_DIR)];
    if let Some(home) = user_home {
        roots.push(home.join("Library").join("Developer").join("Toolchains"));
    }
    roots
}

fn env_path(variable: &str) -> Option<PathBuf> {
    std::env::var_os(variable)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
