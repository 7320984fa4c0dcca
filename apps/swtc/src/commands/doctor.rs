//! Doctor command for the swtc CLI.
//!
//! Verifies the swiftly setup and reports any issues with suggested
//! remediation steps.
//!
//! ## Usage
//!
//! ```bash
//! swtc doctor
//! ```
//!
//! ## Output Format
//!
//! ```text
//! Checking Swift toolchain setup...
//!
//!   [OK] Platform: linux
//!   [OK] swiftly: /usr/local/bin/swiftly 1.1.0
//!   [WARN] Active toolchain: None
//!          Run 'swtc use <version>' to select one.
//! ```
//!
//! Exits with code 1 when any check fails.

use anyhow::{Result, bail};
use swift_toolchain::{
    Discovery, Filesystem, LocalFilesystem, Settings, Swiftly, SystemProcessRunner,
};

use crate::doctor::{
    Finding, Severity, check_active_toolchain, check_config, check_json_output, check_manager,
    check_mixed_toolchains, check_platform, overall,
};

/// Executes the doctor command.
///
/// # Errors
///
/// Returns an error after printing the report if any check failed.
pub async fn execute(settings: &Settings) -> Result<()> {
    println!("Checking Swift toolchain setup...");
    println!();

    let findings = run_all_checks(settings).await;
    for finding in &findings {
        println!("  {finding}");
    }

    println!();
    match overall(&findings) {
        Severity::Pass => println!("All checks passed."),
        Severity::Warn => {
            println!("Some warnings were found. Toolchains may work but could have issues.");
        }
        Severity::Fail => {
            let failed = findings
                .iter()
                .filter(|finding| finding.severity == Severity::Fail)
                .count();
            println!("Some checks failed. swiftly is required to manage toolchains.");
            bail!("{failed} doctor check(s) failed");
        }
    }
    Ok(())
}

async fn run_all_checks(settings: &Settings) -> Vec<Finding> {
    let platform = settings.platform;
    let mut findings = vec![check_platform(platform)];
    if !platform.supports_manager() {
        return findings;
    }

    let swiftly = Swiftly::from_settings(settings);
    let version = swiftly.version().await;
    findings.push(check_manager(swiftly.program(), version.as_ref()));
    findings.push(check_json_output(version.as_ref()));

    let config = settings.paths.config_file();
    let exists = LocalFilesystem.exists(&config).await;
    findings.push(check_config(&config, exists));

    let cwd = std::env::current_dir().ok();
    let active = swiftly.in_use_version(cwd.as_deref()).await;
    findings.push(check_active_toolchain(active.as_deref()));

    let discovery = Discovery {
        platform,
        runner: &SystemProcessRunner,
        fs: &LocalFilesystem,
        manager: &swiftly,
        public_roots: &settings.public_roots,
    };
    let (vendor, managed) =
        tokio::join!(discovery.vendor_toolchains(), discovery.managed_toolchains());
    let active_managed = managed.iter().find(|record| record.in_use);
    findings.extend(check_mixed_toolchains(platform, active_managed, &vendor));

    findings
}
