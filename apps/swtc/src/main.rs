#![warn(clippy::pedantic)]

//! # swtc
//!
//! Terminal front end for the `swift-toolchain` core. Every subcommand is a
//! thin wrapper over one core operation; the only logic here is printing,
//! prompting and wiring Ctrl-C to cancellation.
//!
//! ## Subcommands
//!
//! - `list` - Show toolchains from Xcode, standalone bundles and swiftly
//! - `available` - Show toolchains swiftly can download
//! - `install` - Install a toolchain through swiftly
//! - `use` - Switch the active toolchain
//! - `doctor` - Check the swiftly setup
//! - `diagnose` - Look for a swiftly/Xcode toolchain mix in build output
//!
//! ## Examples
//!
//! ```bash
//! swtc list
//! swtc install 6.0.3
//! swift build 2>&1 | swtc diagnose --authority managed
//! ```

mod commands;
mod doctor;
mod logging;
mod prompt;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{available, diagnose, install, list, use_cmd};
use swift_toolchain::{Settings, ToolchainError};

/// Exit code for an install interrupted with Ctrl-C.
const EXIT_CANCELLED: i32 = 130;

/// Swift toolchain manager front end.
#[derive(Parser)]
#[command(
    name = "swtc",
    author,
    version,
    about = "Find, install and switch Swift toolchains",
    long_about = "The 'swtc' command drives swiftly to manage Swift toolchains and \
    reports toolchains bundled with Xcode alongside them.",
    after_help = "\
ENVIRONMENT VARIABLES:
    SWTC_MANAGER_PATH       Explicit path to the swiftly binary
    SWIFTLY_HOME_DIR        swiftly home directory
    SWIFTLY_TOOLCHAINS_DIR  Directory holding swiftly toolchains
    SWTC_ALLOWLIST          JSON allow-list for post-install scripts
    SWTC_TMPDIR             Directory for temporary install files
    SWTC_LOG                Log level (error, warn, info, debug, trace)"
)]
pub struct Cli {
    /// Increase log output (-v debug, -vv trace).
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the swtc CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// List installed toolchains.
    ///
    /// Shows toolchains bundled with Xcode, standalone .xctoolchain bundles
    /// and toolchains installed by swiftly. The active toolchain is marked
    /// with an asterisk.
    List,

    /// List toolchains available for download.
    Available(available::AvailableArgs),

    /// Install a toolchain.
    ///
    /// Runs 'swiftly install', shows its progress and, on Linux, offers to
    /// install the system packages the toolchain needs.
    Install(install::InstallArgs),

    /// Switch the active toolchain.
    #[command(name = "use")]
    Use(use_cmd::UseArgs),

    /// Check the swiftly setup.
    Doctor,

    /// Look for a toolchain mismatch in build output.
    ///
    /// Reads compiler output from a file or standard input and reports
    /// whether the failure looks like a swiftly toolchain mixed with Xcode.
    Diagnose(diagnose::DiagnoseArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

/// Handles an error and returns the appropriate exit code.
///
/// Cancellation exits with 130 without a message. Every other error is
/// printed and exits with 1.
fn handle_error(e: &anyhow::Error) -> i32 {
    if e
        .downcast_ref::<ToolchainError>()
        .is_some_and(ToolchainError::is_cancelled)
    {
        return EXIT_CANCELLED;
    }
    eprintln!("Error: {e:#}");
    1
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // diagnose only reads text, so it must work without a usable home directory
    let settings = Settings::from_env();
    logging::init(
        cli.verbose,
        settings.as_ref().ok().and_then(|settings| settings.log_level),
    );

    match cli.command {
        Commands::List => list::execute(&settings?).await,
        Commands::Available(args) => available::execute(&settings?, &args).await,
        Commands::Install(args) => install::execute(&settings?, &args).await,
        Commands::Use(args) => use_cmd::execute(&settings?, &args).await,
        Commands::Doctor => commands::doctor::execute(&settings?).await,
        Commands::Diagnose(args) => diagnose::execute(&args),
    }
}
