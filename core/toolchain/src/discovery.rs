//! Toolchain discovery across all sources.
//!
//! A Swift toolchain can come from three places:
//!
//! - **Vendor**: Xcode or the Command Line Tools (macOS only), found through
//!   Spotlight (`mdfind`) and `xcode-select -p`;
//! - **Public**: standalone `swift-*.xctoolchain` bundles in the
//!   `Library/Developer/Toolchains` directories;
//! - **Managed**: toolchains installed by swiftly.
//!
//! Results are recomputed on every call. Each source degrades independently:
//! a failing `mdfind` or a missing directory only removes that source's
//! entries.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::fs::Filesystem;
use crate::manager::ToolchainManager;
use crate::platform::Platform;
use crate::process::{Invocation, ProcessRunner};
use crate::version::ToolchainVersion;

/// Spotlight query matching Xcode bundles.
const XCODE_SPOTLIGHT_QUERY: &str = "kMDItemCFBundleIdentifier == 'com.apple.dt.Xcode'";

/// Suffix `xcode-select -p` appends to the selected Xcode bundle.
const DEVELOPER_DIR_SUFFIX: &str = "/Contents/Developer";

/// Bundle name of the "latest installed" alias.
pub const LATEST_ALIAS: &str = "swift-latest.xctoolchain";

/// Where a toolchain came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolchainSource {
    Vendor,
    Public,
    Managed,
}

impl ToolchainSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vendor => "vendor",
            Self::Public => "public",
            Self::Managed => "managed",
        }
    }
}

impl fmt::Display for ToolchainSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discovered toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainRecord {
    /// Display name (`6.0.3`, `Xcode`, `swift-6.0.3-RELEASE.xctoolchain`).
    pub name: String,
    pub version: ToolchainVersion,
    pub installed: bool,
    pub in_use: bool,
    pub is_default: bool,
    pub source: ToolchainSource,
    /// Install location, when known.
    pub path: Option<PathBuf>,
}

impl ToolchainRecord {
    /// Returns whether this is the `swift-latest.xctoolchain` alias.
    #[must_use]
    pub fn is_latest_alias(&self) -> bool {
        self.source == ToolchainSource::Public && self.name == LATEST_ALIAS
    }
}

/// Toolchains grouped by source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredToolchains {
    /// Sorted by path.
    pub vendor: Vec<ToolchainRecord>,
    /// Latest alias first, then newest first.
    pub public: Vec<ToolchainRecord>,
    /// Newest first.
    pub managed: Vec<ToolchainRecord>,
}

impl DiscoveredToolchains {
    /// Returns every record: vendor, then public, then managed.
    pub fn all(&self) -> impl Iterator<Item = &ToolchainRecord> {
        self.vendor
            .iter()
            .chain(self.public.iter())
            .chain(self.managed.iter())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vendor.is_empty() && self.public.is_empty() && self.managed.is_empty()
    }

    /// Returns the managed toolchain swiftly reports as active.
    #[must_use]
    pub fn active_managed(&self) -> Option<&ToolchainRecord> {
        self.managed.iter().find(|record| record.in_use)
    }
}

/// Finds toolchains from every source.
pub struct Discovery<'a> {
    pub platform: Platform,
    pub runner: &'a dyn ProcessRunner,
    pub fs: &'a dyn Filesystem,
    pub manager: &'a dyn ToolchainManager,
    /// Directories scanned for standalone bundles.
    pub public_roots: &'a [PathBuf],
}

impl Discovery<'_> {
    /// Discovers all toolchains.
    pub async fn discover(&self) -> DiscoveredToolchains {
        let (vendor, public, managed) = tokio::join!(
            self.vendor_toolchains(),
            self.public_toolchains(),
            self.managed_toolchains(),
        );
        DiscoveredToolchains {
            vendor,
            public,
            managed,
        }
    }

    /// Finds Xcode installs. Empty without invoking anything off macOS.
    pub async fn vendor_toolchains(&self) -> Vec<ToolchainRecord> {
        if !self.platform.supports_vendor_toolchains() {
            return Vec::new();
        }

        let cancel = CancelToken::never();
        let mut paths: Vec<PathBuf> = match self
            .runner
            .run(&Invocation::new("mdfind").arg(XCODE_SPOTLIGHT_QUERY), &cancel)
            .await
        {
            Ok(output) => output
                .stdout
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(PathBuf::from)
                .collect(),
            Err(e) => {
                tracing::debug!(error = %e, "mdfind failed");
                Vec::new()
            }
        };

        let selected = match self
            .runner
            .run(&Invocation::new("xcode-select").arg("-p"), &cancel)
            .await
        {
            Ok(output) => selected_developer_install(&output.stdout),
            Err(e) => {
                tracing::debug!(error = %e, "xcode-select -p failed");
                None
            }
        };

        if let Some(selected) = &selected
            && !paths.contains(selected)
        {
            paths.push(selected.clone());
        }

        paths.sort();
        paths.dedup();
        paths
            .into_iter()
            .map(|path| {
                let name = vendor_name(&path);
                let active = selected.as_ref() == Some(&path);
                ToolchainRecord {
                    version: ToolchainVersion::system(name.clone()),
                    name,
                    installed: true,
                    in_use: active,
                    is_default: active,
                    source: ToolchainSource::Vendor,
                    path: Some(path),
                }
            })
            .collect()
    }

    /// Scans the public roots for `swift-*.xctoolchain` bundles.
    pub async fn public_toolchains(&self) -> Vec<ToolchainRecord> {
        let mut records = Vec::new();
        for root in self.public_roots {
            let entries = match self.fs.list_dir(root).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::debug!(root = %root.display(), error = %e, "skipping toolchain root");
                    continue;
                }
            };
            records.extend(
                entries
                    .into_iter()
                    .filter(|name| is_public_bundle(name))
                    .map(|name| public_record(root, name)),
            );
        }
        sort_public(&mut records);
        records
    }

    /// Lists swiftly's toolchains, newest first.
    pub async fn managed_toolchains(&self) -> Vec<ToolchainRecord> {
        let mut records = self.manager.list().await;
        records.sort_by(|a, b| ToolchainVersion::latest_first(&a.version, &b.version));
        records
    }
}

/// Maps `xcode-select -p` output to the install it selects.
///
/// `/Applications/Xcode.app/Contents/Developer` becomes
/// `/Applications/Xcode.app`; a Command Line Tools directory is kept as is.
fn selected_developer_install(output: &str) -> Option<PathBuf> {
    let dir = output.trim().trim_end_matches('/');
    if dir.is_empty() {
        return None;
    }
    let install = dir.strip_suffix(DEVELOPER_DIR_SUFFIX).unwrap_or(dir);
    Some(PathBuf::from(install))
}

fn vendor_name(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| path.display().to_string(), |stem| stem.to_string_lossy().into_owned())
}

fn is_public_bundle(name: &str) -> bool {
    name.starts_with("swift-") && name.ends_with(".xctoolchain")
}

fn public_record(root: &Path, name: String) -> ToolchainRecord {
    let version = if name == LATEST_ALIAS {
        ToolchainVersion::system(name.clone())
    } else {
        ToolchainVersion::parse_identifier(&name)
    };
    ToolchainRecord {
        path: Some(root.join(&name)),
        name,
        version,
        installed: true,
        in_use: false,
        is_default: false,
        source: ToolchainSource::Public,
    }
}

fn sort_public(records: &mut [ToolchainRecord]) {
    records.sort_by(|a, b| {
        b.is_latest_alias()
            .cmp(&a.is_latest_alias())
            .then_with(|| ToolchainVersion::latest_first(&a.version, &b.version))
            .then_with(|| a.path.cmp(&b.path))
    });
}
