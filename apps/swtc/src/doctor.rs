//! Health checks for the swiftly setup.
//!
//! Each check is a plain function over values gathered up front, so the
//! `doctor` command does all the process spawning and the checks stay
//! testable.
//!
//! ## Checks Performed
//!
//! - Platform support
//! - swiftly binary and version
//! - JSON listing support
//! - swiftly configuration file
//! - Active toolchain
//! - swiftly/Xcode toolchain mix (macOS only)

use std::fmt;
use std::path::Path;

use swift_toolchain::{Platform, ToolchainRecord};

/// Severity of one check, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Pass,
    Warn,
    Fail,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pass => "[OK]",
            Self::Warn => "[WARN]",
            Self::Fail => "[FAIL]",
        })
    }
}

/// One line of the doctor report, with an optional next step.
#[derive(Debug, Clone)]
pub struct Finding {
    pub subject: &'static str,
    pub severity: Severity,
    pub detail: String,
    pub hint: Option<&'static str>,
}

impl Finding {
    fn new(subject: &'static str, severity: Severity, detail: impl Into<String>) -> Self {
        Self {
            subject,
            severity,
            detail: detail.into(),
            hint: None,
        }
    }

    fn with_hint(mut self, hint: &'static str) -> Self {
        self.hint = Some(hint);
        self
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.severity, self.subject, self.detail)?;
        if let Some(hint) = self.hint {
            write!(f, "\n       {hint}")?;
        }
        Ok(())
    }
}

/// Worst severity among `findings`, or `Pass` when there are none.
#[must_use]
pub fn overall(findings: &[Finding]) -> Severity {
    findings
        .iter()
        .map(|finding| finding.severity)
        .max()
        .unwrap_or(Severity::Pass)
}

#[must_use]
pub fn check_platform(platform: Platform) -> Finding {
    if platform.supports_manager() {
        Finding::new("Platform", Severity::Pass, platform.as_str())
    } else {
        Finding::new(
            "Platform",
            Severity::Fail,
            format!("{platform} is not supported by swiftly"),
        )
    }
}

/// Checks that swiftly ran and reported a version.
#[must_use]
pub fn check_manager(program: &str, version: Option<&semver::Version>) -> Finding {
    match version {
        Some(version) => Finding::new("swiftly", Severity::Pass, format!("{program} {version}")),
        None => Finding::new("swiftly", Severity::Fail, format!("Could not run '{program}'"))
            .with_hint("Install swiftly or set SWTC_MANAGER_PATH."),
    }
}

#[must_use]
pub fn check_json_output(version: Option<&semver::Version>) -> Finding {
    match version {
        Some(version) if swift_toolchain::version::supports_json_output(version) => {
            Finding::new("JSON output", Severity::Pass, "supported")
        }
        Some(_) => Finding::new(
            "JSON output",
            Severity::Warn,
            "Not supported by this swiftly. Toolchains are read from its config file \
             and 'swtc available' is empty.",
        )
        .with_hint("Update swiftly to 1.1.0 or newer."),
        None => Finding::new("JSON output", Severity::Warn, "Unknown without a working swiftly"),
    }
}

#[must_use]
pub fn check_config(path: &Path, exists: bool) -> Finding {
    if exists {
        Finding::new("Config", Severity::Pass, path.display().to_string())
    } else {
        Finding::new(
            "Config",
            Severity::Warn,
            format!("Not found at {}", path.display()),
        )
        .with_hint("Set SWIFTLY_HOME_DIR if swiftly lives elsewhere.")
    }
}

#[must_use]
pub fn check_active_toolchain(active: Option<&str>) -> Finding {
    match active {
        Some(name) => Finding::new("Active toolchain", Severity::Pass, name),
        None => Finding::new("Active toolchain", Severity::Warn, "None")
            .with_hint("Run 'swtc use <version>' to select one."),
    }
}

/// Warns when a swiftly toolchain is active next to an Xcode install.
///
/// Returns `None` where toolchains cannot be mixed.
#[must_use]
pub fn check_mixed_toolchains(
    platform: Platform,
    active_managed: Option<&ToolchainRecord>,
    vendor: &[ToolchainRecord],
) -> Option<Finding> {
    if !platform.allows_mixed_toolchains() {
        return None;
    }
    let finding = match (active_managed, vendor.is_empty()) {
        (Some(active), false) => Finding::new(
            "Toolchain mix",
            Severity::Warn,
            format!("swiftly toolchain {} is active while Xcode is installed", active.name),
        )
        .with_hint(
            "If a build fails with module or compiler version errors, run 'swtc diagnose' on its output.",
        ),
        _ => Finding::new(
            "Toolchain mix",
            Severity::Pass,
            "No swiftly toolchain active next to Xcode",
        ),
    };
    Some(finding)
}
