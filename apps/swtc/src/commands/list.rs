//! List command for the swtc CLI.
//!
//! Displays every toolchain discovery can find, grouped by where it came
//! from.
//!
//! ## Usage
//!
//! ```bash
//! swtc list
//! ```
//!
//! ## Output Format
//!
//! ```text
//! Xcode:
//! * Xcode         /Applications/Xcode.app
//!
//! Standalone toolchains:
//!   swift-latest.xctoolchain    /Library/Developer/Toolchains/swift-latest.xctoolchain
//!
//! swiftly:
//! * 6.0.3    (default)
//!   5.10.1
//! ```

use anyhow::Result;
use swift_toolchain::{
    DiscoveredToolchains, Discovery, LocalFilesystem, Settings, Swiftly, SystemProcessRunner,
    ToolchainRecord, ToolchainSource,
};

/// Executes the list command.
///
/// # Errors
///
/// Never fails; sources that cannot be read are left out.
#[allow(clippy::unnecessary_wraps)]
pub async fn execute(settings: &Settings) -> Result<()> {
    let swiftly = Swiftly::from_settings(settings);
    let discovery = Discovery {
        platform: settings.platform,
        runner: &SystemProcessRunner,
        fs: &LocalFilesystem,
        manager: &swiftly,
        public_roots: &settings.public_roots,
    };
    let found = discovery.discover().await;

    for line in render(&found) {
        println!("{line}");
    }
    Ok(())
}

fn render(found: &DiscoveredToolchains) -> Vec<String> {
    if found.is_empty() {
        return vec![
            "No toolchains found.".to_string(),
            String::new(),
            "Run 'swtc install <version>' to install one with swiftly.".to_string(),
        ];
    }

    let mut lines = Vec::new();
    for (title, records) in [
        ("Xcode:", &found.vendor),
        ("Standalone toolchains:", &found.public),
        ("swiftly:", &found.managed),
    ] {
        if records.is_empty() {
            continue;
        }
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(title.to_string());
        lines.extend(records.iter().map(render_record));
    }
    lines
}

fn render_record(record: &ToolchainRecord) -> String {
    let marker = if record.in_use { "*" } else { " " };
    let mut line = format!("{marker} {}", record.name);
    if record.is_default {
        line.push_str("    (default)");
    }
    if record.source != ToolchainSource::Managed
        && let Some(path) = &record.path
    {
        line.push_str(&format!("    {}", path.display()));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use swift_toolchain::ToolchainVersion;

    fn record(name: &str, source: ToolchainSource, active: bool) -> ToolchainRecord {
        ToolchainRecord {
            name: name.to_string(),
            version: ToolchainVersion::parse_identifier(name),
            installed: true,
            in_use: active,
            is_default: active,
            source,
            path: Some(PathBuf::from("/opt").join(name)),
        }
    }

    #[test]
    fn empty_discovery_suggests_install() {
        let lines = render(&DiscoveredToolchains::default());
        assert_eq!(lines[0], "No toolchains found.");
        assert!(lines[2].contains("swtc install"));
    }

    #[test]
    fn groups_are_titled_and_separated() {
        let found = DiscoveredToolchains {
            vendor: vec![record("Xcode", ToolchainSource::Vendor, true)],
            public: Vec::new(),
            managed: vec![
                record("6.0.3", ToolchainSource::Managed, true),
                record("5.10.1", ToolchainSource::Managed, false),
            ],
        };
        let lines = render(&found);
        assert_eq!(
            lines,
            vec![
                "Xcode:",
                "* Xcode    (default)    /opt/Xcode",
                "",
                "swiftly:",
                "* 6.0.3    (default)",
                "  5.10.1",
            ]
        );
    }
}
