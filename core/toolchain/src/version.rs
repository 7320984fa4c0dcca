//! Toolchain version model.
//!
//! Two kinds of version show up when talking to swiftly:
//!
//! - the version of swiftly itself (`swiftly --version`), a plain semver used
//!   to gate features such as JSON output, see [`parse_manager_version`];
//! - toolchain versions, modelled by [`ToolchainVersion`]: a stable release,
//!   a development snapshot, or a system toolchain.
//!
//! ## Wire format
//!
//! swiftly describes toolchain versions as internally tagged JSON objects:
//!
//! ```json
//! { "type": "stable", "major": 6, "minor": 0, "patch": 3, "name": "6.0.3" }
//! { "type": "snapshot", "branch": "main", "date": "2025-01-10", "name": "main-snapshot-2025-01-10" }
//! { "type": "system", "name": "xcode" }
//! ```
//!
//! swiftly evolves independently of this crate, so unknown keys are ignored
//! and an unknown `type` parses to [`WireVersion::Unknown`] instead of failing.
//!
//! ## Ordering
//!
//! [`Ord`] sorts ascending: system toolchains, then snapshots by date, then
//! stable releases by `(major, minor, patch)`. Listings that show the latest
//! toolchain first use [`ToolchainVersion::latest_first`].

use std::cmp::Ordering;
use std::fmt;

use serde::Deserialize;

/// First swiftly release whose `list` commands accept `--format=json`.
pub const JSON_OUTPUT_MIN_VERSION: semver::Version = semver::Version::new(1, 1, 0);

/// Branch name swiftly uses for snapshots of the main development branch.
pub const MAIN_BRANCH: &str = "main";

/// Extracts swiftly's own version from its `--version` output.
///
/// The first whitespace-separated token that parses as semver wins, so both
/// `1.1.0` and `swiftly 1.1.0` are accepted. A leading `v` is tolerated.
#[must_use]
pub fn parse_manager_version(output: &str) -> Option<semver::Version> {
    output.split_whitespace().find_map(|token| {
        let token = token.strip_prefix('v').unwrap_or(token);
        semver::Version::parse(token).ok()
    })
}

/// Returns whether a swiftly release supports `--format=json` listings.
#[must_use]
pub fn supports_json_output(version: &semver::Version) -> bool {
    *version >= JSON_OUTPUT_MIN_VERSION
}

/// A toolchain version as reported by swiftly or derived from a bundle name.
#[derive(Debug, Clone)]
pub enum ToolchainVersion {
    /// A stable release such as `6.0.3`.
    Stable {
        major: u64,
        minor: u64,
        patch: u64,
        /// Display name, e.g. `6.0.3`.
        name: String,
    },
    /// A development snapshot of a branch.
    Snapshot {
        /// `main` or a release branch such as `6.1`.
        branch: String,
        /// Snapshot date, `YYYY-MM-DD`.
        date: String,
        /// Display name, e.g. `main-snapshot-2025-01-10`.
        name: String,
    },
    /// A toolchain swiftly did not install, or one we could not classify.
    System {
        name: String,
    },
}

impl ToolchainVersion {
    /// Creates a stable version with its canonical `X.Y.Z` name.
    #[must_use]
    pub fn stable(major: u64, minor: u64, patch: u64) -> Self {
        Self::Stable {
            major,
            minor,
            patch,
            name: format!("{major}.{minor}.{patch}"),
        }
    }

    /// Creates a snapshot version with its canonical swiftly name.
    #[must_use]
    pub fn snapshot(branch: impl Into<String>, date: impl Into<String>) -> Self {
        let branch = branch.into();
        let date = date.into();
        let name = format!("{branch}-snapshot-{date}");
        Self::Snapshot { branch, date, name }
    }

    /// Creates a system version.
    #[must_use]
    pub fn system(name: impl Into<String>) -> Self {
        Self::System { name: name.into() }
    }

    /// Returns the display name of this version.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Stable { name, .. } | Self::Snapshot { name, .. } | Self::System { name } => name,
        }
    }

    /// Returns the lowercase variant tag used on the wire.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Stable { .. } => "stable",
            Self::Snapshot { .. } => "snapshot",
            Self::System { .. } => "system",
        }
    }

    /// Parses a raw toolchain identifier.
    ///
    /// Accepts swiftly names (`6.0.3`, `6.0`, `main-snapshot-2025-01-10`,
    /// `6.1-snapshot-2025-01-10`) and toolchain bundle names
    /// (`swift-6.0.3-RELEASE.xctoolchain`,
    /// `swift-DEVELOPMENT-SNAPSHOT-2025-01-10-a.xctoolchain`). Anything else
    /// becomes [`ToolchainVersion::System`] named after the input, so an
    /// identifier format this crate does not know yet is still listed.
    #[must_use]
    pub fn parse_identifier(identifier: &str) -> Self {
        let raw = identifier.trim();
        let core = strip_bundle_decorations(raw);

        if let Some((major, minor, patch)) = parse_release_triple(core) {
            return Self::Stable {
                major,
                minor,
                patch,
                name: raw.to_string(),
            };
        }

        if let Some((branch, date)) = parse_snapshot(core) {
            return Self::Snapshot {
                branch,
                date,
                name: raw.to_string(),
            };
        }

        Self::system(raw)
    }

    /// Compares two versions so that the latest sorts first.
    ///
    /// Use with `sort_by` for display listings.
    #[must_use]
    pub fn latest_first(a: &Self, b: &Self) -> Ordering {
        b.cmp(a)
    }

    fn rank(&self) -> u8 {
        match self {
            Self::System { .. } => 0,
            Self::Snapshot { .. } => 1,
            Self::Stable { .. } => 2,
        }
    }
}

impl PartialEq for ToolchainVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ToolchainVersion {}

impl PartialOrd for ToolchainVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ToolchainVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (
                Self::Stable {
                    major: a_major,
                    minor: a_minor,
                    patch: a_patch,
                    ..
                },
                Self::Stable {
                    major: b_major,
                    minor: b_minor,
                    patch: b_patch,
                    ..
                },
            ) => (a_major, a_minor, a_patch).cmp(&(b_major, b_minor, b_patch)),
            (
                Self::Snapshot {
                    branch: a_branch,
                    date: a_date,
                    ..
                },
                Self::Snapshot {
                    branch: b_branch,
                    date: b_date,
                    ..
                },
            ) => a_date.cmp(b_date).then_with(|| a_branch.cmp(b_branch)),
            (Self::System { name: a }, Self::System { name: b }) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for ToolchainVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A toolchain version object exactly as swiftly emits it.
///
/// Unknown keys are ignored by serde's default behaviour for struct variants;
/// unknown `type` tags land in [`WireVersion::Unknown`].
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireVersion {
    Stable {
        major: u64,
        minor: u64,
        patch: u64,
        #[serde(default)]
        name: Option<String>,
    },
    Snapshot {
        branch: String,
        date: String,
        #[serde(default)]
        name: Option<String>,
    },
    System {
        name: String,
    },
    #[serde(other)]
    Unknown,
}

impl WireVersion {
    /// Converts to the domain model, `None` for unknown variants.
    #[must_use]
    pub fn into_version(self) -> Option<ToolchainVersion> {
        match self {
            Self::Stable {
                major,
                minor,
                patch,
                name,
            } => Some(ToolchainVersion::Stable {
                major,
                minor,
                patch,
                name: name.unwrap_or_else(|| format!("{major}.{minor}.{patch}")),
            }),
            Self::Snapshot { branch, date, name } => Some(match name {
                Some(name) => ToolchainVersion::Snapshot { branch, date, name },
                None => ToolchainVersion::snapshot(branch, date),
            }),
            Self::System { name } => Some(ToolchainVersion::System { name }),
            Self::Unknown => None,
        }
    }
}

fn strip_bundle_decorations(raw: &str) -> &str {
    let mut core = raw;
    core = core.strip_suffix(".xctoolchain").unwrap_or(core);
    core = core.strip_prefix("swift-").unwrap_or(core);
    core = core.strip_suffix("-RELEASE").unwrap_or(core);
    core
}

/// Parses `X.Y.Z` or `X.Y` (patch defaults to 0).
fn parse_release_triple(text: &str) -> Option<(u64, u64, u64)> {
    let parts: Vec<&str> = text.split('.').collect();
    if !(2..=3).contains(&parts.len()) {
        return None;
    }
    let mut numbers = [0u64; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *slot = part.parse().ok()?;
    }
    Some((numbers[0], numbers[1], numbers[2]))
}

/// Parses the snapshot forms, returning `(branch, date)`.
fn parse_snapshot(text: &str) -> Option<(String, String)> {
    let lower = text.to_ascii_lowercase();
    let marker = lower.find("snapshot-")?;
    let date_start = marker + "snapshot-".len();
    let date = lower.get(date_start..date_start + 10)?;
    if !is_iso_date(date) {
        return None;
    }

    let prefix = lower[..marker].trim_end_matches('-');
    let prefix = prefix.strip_suffix("development").unwrap_or(prefix);
    let prefix = prefix.trim_end_matches('-');
    let branch = if prefix.is_empty() {
        MAIN_BRANCH.to_string()
    } else {
        prefix.to_string()
    };

    Some((branch, date.to_string()))
}

fn is_iso_date(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
}
