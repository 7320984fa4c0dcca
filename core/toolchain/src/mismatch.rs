//! Mixed-toolchain failure detection.
//!
//! On macOS a swiftly toolchain can end up building against modules or
//! tools that came with Xcode. The result is a family of confusing failures:
//! modules "compiled with a different version of the compiler", two compiler
//! banners in one log, or a frontend crash. [`detect_mismatch`] recognises
//! them in raw build output so the front end can suggest switching
//! toolchains instead of showing the bare error.
//!
//! A mismatch is reported only when all of these hold:
//!
//! 1. the platform allows mixed toolchains (macOS);
//! 2. both a swiftly path and an Xcode path appear in the output, or the
//!    caller already knows the active toolchain is swiftly-managed;
//! 3. at least one [`SignalKind`] is present.
//!
//! The detector is a pure function and keeps no state between calls.

use std::collections::BTreeSet;
use std::fmt;

use crate::platform::Platform;

const MANAGED_PATH_MARKERS: &[&str] = &["/.swiftly/", "/swiftly/toolchains/", "/.local/share/swiftly/"];

const VENDOR_PATH_MARKERS: &[&str] = &[
    "Xcode.app/",
    "Xcode-beta.app/",
    "/Library/Developer/CommandLineTools/",
];

// Matched against lowercased output. Covers "was built with", "was created by"
// and "compiled module was created by" phrasings of the same diagnostic.
const DIFFERENT_COMPILER_MARKERS: &[&str] = &[
    "different version of the compiler",
    "newer version of the compiler",
    "older version of the compiler",
    "built with a different compiler",
    "compiled with a different compiler",
];

const FRONTEND_CRASH_MARKERS: &[&str] = &[
    "compile command failed due to signal",
    "frontend command failed",
    "stack dump:",
];

const VERSION_BANNER: &str = "Swift version ";

/// Who installed the active toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ToolchainAuthority {
    /// Installed by swiftly.
    Managed,
    /// Bundled with Xcode or the Command Line Tools.
    Vendor,
    #[default]
    Unknown,
}

/// Input describing where the output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MismatchContext {
    pub platform: Platform,
    pub authority: ToolchainAuthority,
}

/// A compatibility failure recognised in compiler output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SignalKind {
    /// A module built by one compiler was imported by another.
    ModuleCompiledWithDifferentCompiler,
    /// Two different `Swift version` banners in the same output.
    MultipleCompilerVersions,
    /// The compiler frontend crashed.
    FrontendCrash,
}

impl SignalKind {
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::ModuleCompiledWithDifferentCompiler => {
                "a module was built with a different compiler version"
            }
            Self::MultipleCompilerVersions => "more than one compiler version took part in the build",
            Self::FrontendCrash => "the compiler frontend crashed",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// An action the caller can offer when a mismatch is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Remediation {
    /// Select a different active toolchain.
    SwitchToolchain,
    /// Open documentation about mixing toolchains.
    OpenDocumentation,
}

impl Remediation {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::SwitchToolchain => "Switch toolchain",
            Self::OpenDocumentation => "Open documentation",
        }
    }
}

/// Result of [`detect_mismatch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MismatchVerdict {
    pub detected: bool,
    /// Every signal found in the text, whether or not a mismatch was detected.
    pub signals: BTreeSet<SignalKind>,
}

impl MismatchVerdict {
    /// Actions to offer the user. Empty unless a mismatch was detected.
    #[must_use]
    pub fn remediations(&self) -> &'static [Remediation] {
        if self.detected {
            &[Remediation::SwitchToolchain, Remediation::OpenDocumentation]
        } else {
            &[]
        }
    }
}

/// Looks for a swiftly/Xcode toolchain mix in compiler output.
#[must_use]
pub fn detect_mismatch(text: &str, context: &MismatchContext) -> MismatchVerdict {
    let signals = find_signals(text);

    let mixed_authorities = context.authority == ToolchainAuthority::Managed
        || (contains_any(text, MANAGED_PATH_MARKERS) && contains_any(text, VENDOR_PATH_MARKERS));

    let detected =
        context.platform.allows_mixed_toolchains() && mixed_authorities && !signals.is_empty();

    if detected {
        tracing::debug!(?signals, "toolchain mismatch detected");
    }
    MismatchVerdict { detected, signals }
}

fn find_signals(text: &str) -> BTreeSet<SignalKind> {
    let lower = text.to_lowercase();
    let mut signals = BTreeSet::new();

    if lower.lines().any(is_cross_version_import) || contains_any(&lower, DIFFERENT_COMPILER_MARKERS)
    {
        signals.insert(SignalKind::ModuleCompiledWithDifferentCompiler);
    }
    if compiler_versions(text).len() > 1 {
        signals.insert(SignalKind::MultipleCompilerVersions);
    }
    if contains_any(&lower, FRONTEND_CRASH_MARKERS) {
        signals.insert(SignalKind::FrontendCrash);
    }
    signals
}

/// Matches "module compiled with Swift X cannot be imported by the Swift Y compiler".
fn is_cross_version_import(line: &str) -> bool {
    let Some(start) = line.find("module compiled with swift ") else {
        return false;
    };
    let rest = &line[start..];
    rest.find("cannot be imported by the swift ")
        .is_some_and(|at| rest[at..].contains("compiler"))
}

fn compiler_versions(text: &str) -> BTreeSet<&str> {
    text.match_indices(VERSION_BANNER)
        .filter_map(|(at, _)| {
            text[at + VERSION_BANNER.len()..]
                .split_whitespace()
                .next()
                .filter(|version| version.starts_with(|c: char| c.is_ascii_digit()))
        })
        .collect()
}

fn contains_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| text.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOTH_PATHS: &str = "\
        /Users/dev/.swiftly/toolchains/6.0.3/usr/bin/swiftc -frontend ...\n\
        note: while importing /Applications/Xcode.app/Contents/Developer/Platforms/MacOSX.platform/Foo.swiftmodule\n";

    fn macos(authority: ToolchainAuthority) -> MismatchContext {
        MismatchContext {
            platform: Platform::MacOs,
            authority,
        }
    }

    #[test]
    fn detects_different_compiler_with_both_paths_on_macos() {
        let text = format!(
            "{BOTH_PATHS}error: compiled module was created by a different version of the compiler; rebuild Foo"
        );
        let verdict = detect_mismatch(&text, &macos(ToolchainAuthority::Unknown));
        assert!(verdict.detected);
        assert!(
            verdict
                .signals
                .contains(&SignalKind::ModuleCompiledWithDifferentCompiler)
        );
        assert_eq!(
            verdict.remediations(),
            &[Remediation::SwitchToolchain, Remediation::OpenDocumentation]
        );
    }

    #[test]
    fn same_text_on_linux_is_not_a_mismatch() {
        let text = format!(
            "{BOTH_PATHS}error: compiled module was created by a different version of the compiler"
        );
        let context = MismatchContext {
            platform: Platform::Linux,
            authority: ToolchainAuthority::Managed,
        };
        let verdict = detect_mismatch(&text, &context);
        assert!(!verdict.detected);
        assert!(verdict.remediations().is_empty());
        assert!(!verdict.signals.is_empty());
    }

    #[test]
    fn both_paths_without_signal_is_not_a_mismatch() {
        let verdict = detect_mismatch(BOTH_PATHS, &macos(ToolchainAuthority::Unknown));
        assert!(!verdict.detected);
        assert!(verdict.signals.is_empty());
    }

    #[test]
    fn managed_authority_stands_in_for_path_evidence() {
        let text = "error: module compiled with Swift 5.9 cannot be imported by the Swift 6.0.3 compiler: Foo.swiftmodule";
        assert!(!detect_mismatch(text, &macos(ToolchainAuthority::Unknown)).detected);
        assert!(!detect_mismatch(text, &macos(ToolchainAuthority::Vendor)).detected);
        let verdict = detect_mismatch(text, &macos(ToolchainAuthority::Managed));
        assert!(verdict.detected);
        assert_eq!(
            verdict.signals.iter().copied().collect::<Vec<_>>(),
            vec![SignalKind::ModuleCompiledWithDifferentCompiler]
        );
    }

    #[test]
    fn two_distinct_banners_are_a_signal() {
        let text = "Apple Swift version 5.10 (swiftlang-5.10.0.13)\nSwift version 6.0.3 (swift-6.0.3-RELEASE)\n";
        let verdict = detect_mismatch(text, &macos(ToolchainAuthority::Managed));
        assert!(verdict.detected);
        assert!(verdict.signals.contains(&SignalKind::MultipleCompilerVersions));

        let same = "Swift version 6.0.3 (a)\nSwift version 6.0.3 (b)\n";
        assert!(detect_mismatch(same, &macos(ToolchainAuthority::Managed)).signals.is_empty());
    }

    #[test]
    fn frontend_crash_is_a_signal() {
        let text = format!("{BOTH_PATHS}Stack dump:\n0. Program arguments: swift-frontend ...\n");
        let verdict = detect_mismatch(&text, &macos(ToolchainAuthority::Unknown));
        assert!(verdict.detected);
        assert!(verdict.signals.contains(&SignalKind::FrontendCrash));

        let text = "error: compile command failed due to signal 11 (use -v to see invocation)";
        assert!(
            detect_mismatch(text, &macos(ToolchainAuthority::Managed))
                .signals
                .contains(&SignalKind::FrontendCrash)
        );
    }

    #[test]
    fn only_one_authority_path_is_not_enough() {
        let text = "/Users/dev/.swiftly/toolchains/6.0.3/usr/bin/swiftc\nStack dump:\n";
        assert!(!detect_mismatch(text, &macos(ToolchainAuthority::Unknown)).detected);
    }

    #[test]
    fn different_compiler_phrasings_are_all_recognised() {
        for diagnostic in [
            "error: compiled module was created by a different version of the compiler; rebuild 'Foo'",
            "error: module 'Foundation' was built with a different version of the compiler",
            "error: module file was created by a different version of the compiler",
            "error: module file was created by a newer version of the compiler: Foo.swiftmodule",
            "error: module 'Dispatch' was built with a different compiler version",
        ] {
            let text = format!("{BOTH_PATHS}{diagnostic}\n");
            let verdict = detect_mismatch(&text, &macos(ToolchainAuthority::Unknown));
            assert!(verdict.detected, "{diagnostic}");
            assert_eq!(
                verdict.signals.iter().copied().collect::<Vec<_>>(),
                vec![SignalKind::ModuleCompiledWithDifferentCompiler],
                "{diagnostic}"
            );
        }
    }

    #[test]
    fn unrelated_compiler_errors_are_not_a_signal() {
        let text = format!("{BOTH_PATHS}error: cannot find 'foo' in scope\n");
        let verdict = detect_mismatch(&text, &macos(ToolchainAuthority::Unknown));
        assert!(!verdict.detected);
        assert!(verdict.signals.is_empty());
    }

    #[test]
    fn cross_version_import_requires_full_phrase() {
        assert!(is_cross_version_import(
            "module compiled with swift 5.9 cannot be imported by the swift 6.0 compiler"
        ));
        assert!(!is_cross_version_import("module compiled with swift 5.9"));
    }
}
