//! Use command for the swtc CLI.
//!
//! Switches the toolchain swiftly considers active.
//!
//! ## Usage
//!
//! ```bash
//! swtc use 6.0.3
//! ```

use anyhow::{Context, Result};
use clap::Args;
use swift_toolchain::{Settings, Swiftly};

/// Arguments for the use command.
#[derive(Args)]
pub struct UseArgs {
    /// Installed toolchain to activate (e.g. "6.0.3").
    pub version: String,
}

/// Executes the use command.
///
/// # Errors
///
/// Returns an error if swiftly is unsupported here or cannot switch, for
/// example because the version is not installed.
pub async fn execute(settings: &Settings, args: &UseArgs) -> Result<()> {
    let swiftly = Swiftly::from_settings(settings);
    let version = &args.version;

    let cwd = std::env::current_dir().ok();
    swiftly
        .use_toolchain(version, cwd.as_deref())
        .await
        .with_context(|| {
            format!("Could not switch to {version}. Run 'swtc list' to see installed toolchains.")
        })?;
    println!("Now using Swift {version}.");
    Ok(())
}
