//! Install command for the swtc CLI.
//!
//! Installs a toolchain through swiftly and makes it the active one.
//!
//! ## Usage
//!
//! ```bash
//! swtc install 6.0.3                  # Install a release
//! swtc install main-snapshot          # Install the latest main snapshot
//! swtc install 6.0.3 --no-progress    # Let swiftly print its own output
//! ```
//!
//! Ctrl-C cancels the install: swiftly is stopped, temporary files are
//! removed and the command exits with code 130.

use std::sync::Mutex;

use anyhow::{Result, bail};
use clap::Args;
use swift_toolchain::{
    InstallRegistry, PostInstallOutcome, ProgressEvent, ProgressSink, Settings, Swiftly,
    ToolchainError,
};

use crate::prompt::TerminalPrompter;

/// Arguments for the install command.
#[derive(Args)]
pub struct InstallArgs {
    /// Toolchain to install (e.g. "6.0.3", "6.0", "main-snapshot").
    pub version: String,

    /// Do not stream install progress.
    #[clap(long)]
    pub no_progress: bool,
}

/// Executes the install command.
///
/// # Process
///
/// 1. Register an install session for the version
/// 2. Cancel the session on Ctrl-C
/// 3. Run the install pipeline, printing progress
/// 4. Report what happened to the post-install step
///
/// # Errors
///
/// Returns an error if the install fails or is cancelled, or if the
/// post-install script was rejected.
pub async fn execute(settings: &Settings, args: &InstallArgs) -> Result<()> {
    let swiftly = Swiftly::from_settings(settings);
    let registry = InstallRegistry::new(settings.temp_dir.clone());
    let session = registry.begin(args.version.as_str());

    let interrupt = {
        let registry = registry.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                registry.cancel_all();
            }
        })
    };

    let printer = ProgressPrinter::default();
    let request = if args.no_progress {
        session.request()
    } else {
        session.request().with_sink(&printer)
    };

    println!("Installing Swift {}...", args.version);
    let result = swiftly.install_toolchain(request, &TerminalPrompter).await;
    interrupt.abort();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(ToolchainError::ScriptValidationRejected { version, .. }) => {
            bail!(
                "Swift {version} was installed, but its system packages were not.\n\
                 Install them with your package manager before using the toolchain."
            );
        }
        Err(e) => return Err(e.into()),
    };

    match outcome.post_install {
        PostInstallOutcome::Executed => {
            println!("Installed the system packages Swift {} needs.", outcome.version);
        }
        PostInstallOutcome::Skipped => {
            println!("swiftly reported extra system requirements; see its output above.");
        }
        PostInstallOutcome::NotRequired | PostInstallOutcome::Declined => {}
    }
    println!("Swift {} installed and in use.", outcome.version);
    Ok(())
}

/// Prints progress events, one line per step change or 10% of progress.
#[derive(Default)]
struct ProgressPrinter {
    last: Mutex<Option<(String, u8)>>,
}

impl ProgressPrinter {
    fn render(&self, event: &ProgressEvent) -> Option<String> {
        match event {
            ProgressEvent::Step { text, percent } => {
                let bucket = percent.map_or(0, bucket);
                let mut last = self
                    .last
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                let current = (text.clone(), bucket);
                if last.as_ref() == Some(&current) {
                    return None;
                }
                *last = Some(current);
                Some(match percent {
                    Some(percent) => format!("[{percent:>3.0}%] {text}"),
                    None => format!("       {text}"),
                })
            }
            ProgressEvent::Complete { success: true } => None,
            ProgressEvent::Complete { success: false } => {
                Some("swiftly reported that the install failed".to_string())
            }
            ProgressEvent::Text(text) => Some(text.clone()),
        }
    }
}

impl ProgressSink for ProgressPrinter {
    fn on_event(&self, event: &ProgressEvent) {
        if let Some(line) = self.render(event) {
            println!("{line}");
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bucket(percent: f64) -> u8 {
    (percent / 10.0).floor().clamp(0.0, 10.0) as u8
}
