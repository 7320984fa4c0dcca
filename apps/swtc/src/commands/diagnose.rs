//! Diagnose command for the swtc CLI.
//!
//! Runs the mismatch detector over build output and explains the result.
//!
//! ## Usage
//!
//! ```bash
//! swtc diagnose build.log
//! swift build 2>&1 | swtc diagnose --authority managed
//! swtc diagnose build.log --platform macos --json
//! ```
//!
//! ## Output Format
//!
//! ```text
//! Toolchain mismatch detected.
//!
//! Signals:
//!   - a module was built with a different compiler version
//!
//! Suggested actions:
//!   - Switch toolchain
//!   - Open documentation
//! ```

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;
use swift_toolchain::{
    MismatchContext, MismatchVerdict, Platform, ToolchainAuthority, detect_mismatch,
};

/// Who installed the toolchain that produced the output.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AuthorityArg {
    Managed,
    Vendor,
    Unknown,
}

impl From<AuthorityArg> for ToolchainAuthority {
    fn from(arg: AuthorityArg) -> Self {
        match arg {
            AuthorityArg::Managed => Self::Managed,
            AuthorityArg::Vendor => Self::Vendor,
            AuthorityArg::Unknown => Self::Unknown,
        }
    }
}

/// Platform the output was produced on.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PlatformArg {
    Linux,
    Macos,
    Windows,
    Other,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Linux => Self::Linux,
            PlatformArg::Macos => Self::MacOs,
            PlatformArg::Windows => Self::Windows,
            PlatformArg::Other => Self::Other,
        }
    }
}

/// Arguments for the diagnose command.
#[derive(Args)]
pub struct DiagnoseArgs {
    /// File with compiler output. Reads standard input when omitted.
    pub file: Option<PathBuf>,

    /// Who installed the active toolchain, if known.
    #[clap(long, value_enum, default_value = "unknown")]
    pub authority: AuthorityArg,

    /// Platform the output came from. Defaults to this machine.
    #[clap(long, value_enum)]
    pub platform: Option<PlatformArg>,

    /// Print the verdict as JSON.
    #[clap(long, short = 'j')]
    pub json: bool,
}

/// Verdict for JSON output.
#[derive(Debug, Serialize)]
struct Report {
    detected: bool,
    signals: Vec<&'static str>,
    remediations: Vec<&'static str>,
}

impl From<&MismatchVerdict> for Report {
    fn from(verdict: &MismatchVerdict) -> Self {
        Self {
            detected: verdict.detected,
            signals: verdict.signals.iter().map(|s| s.description()).collect(),
            remediations: verdict.remediations().iter().map(|r| r.label()).collect(),
        }
    }
}

/// Executes the diagnose command.
///
/// # Errors
///
/// Returns an error if the input cannot be read.
pub fn execute(args: &DiagnoseArgs) -> Result<()> {
    let text = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read standard input")?;
            text
        }
    };

    let context = MismatchContext {
        platform: args.platform.map_or_else(Platform::detect, Platform::from),
        authority: args.authority.into(),
    };
    let verdict = detect_mismatch(&text, &context);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&Report::from(&verdict))?);
    } else {
        for line in render(&verdict) {
            println!("{line}");
        }
    }
    Ok(())
}

fn render(verdict: &MismatchVerdict) -> Vec<String> {
    let mut lines = Vec::new();
    if verdict.detected {
        lines.push("Toolchain mismatch detected.".to_string());
    } else if verdict.signals.is_empty() {
        lines.push("No toolchain mismatch detected.".to_string());
        return lines;
    } else {
        lines.push("No toolchain mismatch detected, but the output shows:".to_string());
    }

    lines.push(String::new());
    lines.push("Signals:".to_string());
    lines.extend(verdict.signals.iter().map(|signal| format!("  - {signal}")));

    if !verdict.remediations().is_empty() {
        lines.push(String::new());
        lines.push("Suggested actions:".to_string());
        lines.extend(
            verdict
                .remediations()
                .iter()
                .map(|remediation| format!("  - {}", remediation.label())),
        );
    }
    lines
}
