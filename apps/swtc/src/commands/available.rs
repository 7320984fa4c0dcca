//! Available command for the swtc CLI.
//!
//! Lists toolchains swiftly can download.
//!
//! ## Usage
//!
//! ```bash
//! swtc available          # Every toolchain swiftly knows about
//! swtc available 6.0      # Only toolchains matching "6.0"
//! swtc available --json   # Output in JSON format
//! ```
//!
//! ## Output Format
//!
//! ```text
//! Available toolchains:
//!
//!   6.1.0
//! * 6.0.3    (installed, default)
//!   main-snapshot-2025-01-10
//!
//!   * = in use
//! ```

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use swift_toolchain::{AvailableToolchain, Settings, Swiftly};

/// Arguments for the available command.
#[derive(Args)]
pub struct AvailableArgs {
    /// Only list toolchains matching this selector (e.g. "6.0", "main-snapshot").
    pub filter: Option<String>,

    /// Show toolchains in JSON format.
    #[clap(long, short = 'j')]
    pub json: bool,
}

/// Toolchain information for JSON output.
#[derive(Debug, Serialize)]
struct ToolchainInfo<'a> {
    name: &'a str,
    kind: &'static str,
    installed: bool,
    in_use: bool,
    is_default: bool,
}

/// Executes the available command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub async fn execute(settings: &Settings, args: &AvailableArgs) -> Result<()> {
    let swiftly = Swiftly::from_settings(settings);
    let available = swiftly.list_available(args.filter.as_deref()).await;

    if args.json {
        let infos: Vec<ToolchainInfo<'_>> = available.iter().map(info).collect();
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }

    if available.is_empty() {
        println!("No toolchains available.");
        if !swiftly.supports_json_output().await {
            println!();
            println!("Listing available toolchains requires swiftly 1.1.0 or newer.");
        }
        return Ok(());
    }

    println!("Available toolchains:");
    println!();
    for toolchain in &available {
        println!("{}", render(toolchain));
    }
    println!();
    println!("  * = in use");
    Ok(())
}

fn info(toolchain: &AvailableToolchain) -> ToolchainInfo<'_> {
    ToolchainInfo {
        name: toolchain.version.name(),
        kind: toolchain.version.kind(),
        installed: toolchain.installed,
        in_use: toolchain.in_use,
        is_default: toolchain.is_default,
    }
}

fn render(toolchain: &AvailableToolchain) -> String {
    let marker = if toolchain.in_use { "*" } else { " " };
    let mut notes = Vec::new();
    if toolchain.installed {
        notes.push("installed");
    }
    if toolchain.is_default {
        notes.push("default");
    }
    if notes.is_empty() {
        format!("{marker} {}", toolchain.version)
    } else {
        format!("{marker} {}    ({})", toolchain.version, notes.join(", "))
    }
}
