//! Platform detection and capability gating.
//!
//! Every component of the core asks the [`Platform`] what it is allowed to do
//! before touching the system. The platform is detected once by the front end
//! and injected everywhere else, so tests can exercise Linux-only and
//! macOS-only branches on any host.
//!
//! ## Capabilities
//!
//! | Platform | swiftly | vendor toolchains | privileged post-install | mixed toolchains |
//! |----------|---------|-------------------|-------------------------|------------------|
//! | Linux    | yes     | no                | yes                     | no               |
//! | macOS    | yes     | yes (Xcode)       | no                      | yes              |
//! | Windows  | no      | no                | no                      | no               |
//! | Other    | no      | no                | no                      | no               |

use std::fmt;

/// Operating system family the core is running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Any Linux distribution.
    Linux,
    /// macOS.
    MacOs,
    /// Windows.
    Windows,
    /// Anything else (BSDs, illumos, ...).
    Other,
}

impl Platform {
    /// Detects the current platform based on compile-time configuration.
    #[must_use]
    pub fn detect() -> Self {
        #[cfg(target_os = "linux")]
        {
            return Self::Linux;
        }

        #[cfg(target_os = "macos")]
        {
            return Self::MacOs;
        }

        #[cfg(target_os = "windows")]
        {
            return Self::Windows;
        }

        #[allow(unreachable_code)]
        {
            Self::Other
        }
    }

    /// Returns the platform identifier string.
    #[must_use = "returns the platform string without side effects"]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::MacOs => "macos",
            Self::Windows => "windows",
            Self::Other => "other",
        }
    }

    /// Returns whether swiftly runs on this platform.
    ///
    /// Every manager operation short-circuits to an empty result when this is
    /// `false`, without spawning a process.
    #[must_use]
    pub fn supports_manager(self) -> bool {
        matches!(self, Self::Linux | Self::MacOs)
    }

    /// Returns whether Xcode-bundled toolchains can exist on this platform.
    #[must_use]
    pub fn supports_vendor_toolchains(self) -> bool {
        matches!(self, Self::MacOs)
    }

    /// Returns whether toolchain installs may need extra system packages
    /// installed with elevated privileges.
    #[must_use]
    pub fn requires_privileged_post_install(self) -> bool {
        matches!(self, Self::Linux)
    }

    /// Returns whether a swiftly toolchain can be mixed with a vendor one.
    #[must_use]
    pub fn allows_mixed_toolchains(self) -> bool {
        matches!(self, Self::MacOs)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
