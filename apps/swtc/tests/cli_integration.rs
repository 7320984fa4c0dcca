#![warn(clippy::pedantic)]

//! Integration tests for the swtc CLI.
//!
//! These tests spawn the compiled binary and validate its behavior through
//! stdout, stderr, and exit codes.
//!
//! ## Test Strategy
//!
//! 1. **Metadata**: help and version output
//! 2. **Diagnose**: verdicts from files and stdin, JSON output, read errors
//! 3. **Without swiftly**: every command degrades or fails with a clear message
//!    when `SWTC_MANAGER_PATH` points at nothing
//! 4. **With a fake swiftly** (Unix only): a shell script stands in for swiftly
//!    so listing, switching and installing run end to end
//!
//! ## Test Infrastructure
//!
//! - Uses `assert_cmd::Command` for spawning, feeding stdin and asserting on
//!   command execution
//! - Uses `assert_fs` for temporary directories and files
//! - Uses `predicates` for flexible output matching
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p swtc
//! ```

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

const MODULE_MISMATCH: &str = "\
/Users/dev/.swiftly/toolchains/6.0.3/usr/bin/swiftc -frontend -c main.swift
/Applications/Xcode.app/Contents/Developer/Platforms/MacOSX.platform/Developer/SDKs/MacOSX.sdk/usr/lib/swift/Foundation.swiftmodule
error: compiled module was created by a different version of the compiler; rebuild 'Foundation' and try again
";

/// A `swtc` command isolated from the user's swiftly installation.
fn swtc(temp: &assert_fs::TempDir, manager: &std::path::Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("swtc"));
    cmd.env("SWTC_MANAGER_PATH", manager)
        .env("SWIFTLY_HOME_DIR", temp.path().join("swiftly"))
        .env("SWIFTLY_TOOLCHAINS_DIR", temp.path().join("toolchains"))
        .env("SWTC_TMPDIR", temp.path())
        .env_remove("SWTC_ALLOWLIST")
        .env_remove("SWTC_LOG");
    cmd
}

fn missing_manager(temp: &assert_fs::TempDir) -> std::path::PathBuf {
    temp.path().join("no-such-swiftly")
}

// -- Metadata ---------------------------------------------------------------

#[test]
fn help_shows_available_commands() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("swtc"));
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("available"))
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("use"))
        .stdout(predicate::str::contains("doctor"))
        .stdout(predicate::str::contains("diagnose"))
        .stdout(predicate::str::contains("SWTC_MANAGER_PATH"));
}

#[test]
fn version_flag_shows_version() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("swtc"));
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_subcommand_is_a_usage_error() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("swtc"));
    cmd.assert().failure().code(2);
}

#[test]
fn install_requires_a_version() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("swtc"));
    cmd.arg("install")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<VERSION>"));
}

// -- Diagnose ---------------------------------------------------------------

#[test]
fn diagnose_reports_mismatch_from_file() {
    let temp = assert_fs::TempDir::new().expect("Should create temp dir");
    let log = temp.child("build.log");
    log.write_str(MODULE_MISMATCH).expect("Should write log");

    let mut cmd = swtc(&temp, &missing_manager(&temp));
    cmd.arg("diagnose")
        .arg(log.path())
        .args(["--platform", "macos"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Toolchain mismatch detected."))
        .stdout(predicate::str::contains(
            "a module was built with a different compiler version",
        ))
        .stdout(predicate::str::contains("Switch toolchain"))
        .stdout(predicate::str::contains("Open documentation"));
}

#[test]
fn diagnose_on_linux_never_reports_a_mismatch() {
    let temp = assert_fs::TempDir::new().expect("Should create temp dir");

    let mut cmd = swtc(&temp, &missing_manager(&temp));
    cmd.args(["diagnose", "--platform", "linux", "--authority", "managed"])
        .write_stdin(MODULE_MISMATCH)
        .assert()
        .success()
        .stdout(predicate::str::contains("No toolchain mismatch detected"))
        .stdout(predicate::str::contains("Suggested actions").not());
}

#[test]
fn diagnose_uses_authority_without_path_evidence() {
    let temp = assert_fs::TempDir::new().expect("Should create temp dir");
    let text = "error: module compiled with Swift 5.10 cannot be imported by the Swift 6.0.3 compiler\n";

    let mut cmd = swtc(&temp, &missing_manager(&temp));
    cmd.args(["diagnose", "--platform", "macos", "--authority", "managed", "--json"])
        .write_stdin(text)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"detected\": true"))
        .stdout(predicate::str::contains("Switch toolchain"));

    let mut cmd = swtc(&temp, &missing_manager(&temp));
    cmd.args(["diagnose", "--platform", "macos", "--json"])
        .write_stdin(text)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"detected\": false"));
}

#[test]
fn diagnose_clean_output() {
    let temp = assert_fs::TempDir::new().expect("Should create temp dir");

    let mut cmd = swtc(&temp, &missing_manager(&temp));
    cmd.args(["diagnose", "--platform", "macos"])
        .write_stdin("Compiling main.swift\nBuild complete!\n")
        .assert()
        .success()
        .stdout(predicate::str::diff("No toolchain mismatch detected.\n"));
}

#[test]
fn diagnose_missing_file_fails() {
    let temp = assert_fs::TempDir::new().expect("Should create temp dir");

    let mut cmd = swtc(&temp, &missing_manager(&temp));
    cmd.arg("diagnose")
        .arg(temp.path().join("missing.log"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn diagnose_rejects_unknown_authority() {
    let temp = assert_fs::TempDir::new().expect("Should create temp dir");

    let mut cmd = swtc(&temp, &missing_manager(&temp));
    cmd.args(["diagnose", "--authority", "homebrew"])
        .write_stdin("")
        .assert()
        .failure()
        .code(2);
}

// -- Without swiftly --------------------------------------------------------

#[cfg(target_os = "linux")]
mod without_swiftly {
    use super::*;

    #[test]
    fn list_shows_nothing_found() {
        let temp = assert_fs::TempDir::new().expect("Should create temp dir");

        let mut cmd = swtc(&temp, &missing_manager(&temp));
        cmd.arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("No toolchains found."));
    }

    #[test]
    fn available_explains_the_requirement() {
        let temp = assert_fs::TempDir::new().expect("Should create temp dir");

        let mut cmd = swtc(&temp, &missing_manager(&temp));
        cmd.arg("available")
            .assert()
            .success()
            .stdout(predicate::str::contains("No toolchains available."))
            .stdout(predicate::str::contains("1.1.0"));
    }

    #[test]
    fn available_json_is_an_empty_array() {
        let temp = assert_fs::TempDir::new().expect("Should create temp dir");

        let mut cmd = swtc(&temp, &missing_manager(&temp));
        cmd.args(["available", "--json"])
            .assert()
            .success()
            .stdout(predicate::str::diff("[]\n"));
    }

    #[test]
    fn install_fails_naming_the_version() {
        let temp = assert_fs::TempDir::new().expect("Should create temp dir");

        let mut cmd = swtc(&temp, &missing_manager(&temp));
        cmd.args(["install", "6.0.3", "--no-progress"])
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("failed to install Swift 6.0.3"));
    }

    #[test]
    fn use_fails_with_a_hint() {
        let temp = assert_fs::TempDir::new().expect("Should create temp dir");

        let mut cmd = swtc(&temp, &missing_manager(&temp));
        cmd.args(["use", "6.0.3"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Could not switch to 6.0.3"));
    }

    #[test]
    fn doctor_fails_without_swiftly() {
        let temp = assert_fs::TempDir::new().expect("Should create temp dir");

        let mut cmd = swtc(&temp, &missing_manager(&temp));
        cmd.arg("doctor")
            .assert()
            .failure()
            .code(1)
            .stdout(predicate::str::contains("[OK] Platform: linux"))
            .stdout(predicate::str::contains("[FAIL] swiftly"))
            .stdout(predicate::str::contains("Install swiftly or set SWTC_MANAGER_PATH."))
            .stdout(predicate::str::contains("Some checks failed."))
            .stderr(predicate::str::contains("1 doctor check(s) failed"));
    }
}

// -- With a fake swiftly ----------------------------------------------------

#[cfg(target_os = "linux")]
mod fake_swiftly {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    const SCRIPT: &str = r#"#!/bin/sh
case "$1" in
  --version) echo "1.1.0" ;;
  list) echo '{"toolchains":[{"inUse":false,"isDefault":false,"version":{"type":"stable","major":5,"minor":10,"patch":1}},{"inUse":true,"isDefault":true,"version":{"type":"stable","major":6,"minor":0,"patch":3}}]}' ;;
  list-available) echo '{"toolchains":[{"inUse":false,"installed":false,"isDefault":false,"version":{"type":"stable","major":6,"minor":1,"patch":0}}]}' ;;
  use) exit 0 ;;
  install)
    while [ $# -gt 0 ]; do
      if [ "$1" = "--progress-file" ]; then
        printf '%s\n' '{"step":{"text":"Downloading Swift 6.0.3","percent":50}}' '{"complete":{"success":true}}' > "$2"
      fi
      shift
    done
    ;;
  *) echo "unknown command $1" >&2; exit 1 ;;
esac
"#;

    fn fake_swiftly(temp: &assert_fs::TempDir) -> std::path::PathBuf {
        let script = temp.child("swiftly");
        script.write_str(SCRIPT).expect("Should write script");
        std::fs::set_permissions(script.path(), std::fs::Permissions::from_mode(0o755))
            .expect("Should make script executable");
        script.path().to_path_buf()
    }

    #[test]
    fn list_shows_managed_toolchains_newest_first() {
        let temp = assert_fs::TempDir::new().expect("Should create temp dir");
        let manager = fake_swiftly(&temp);

        let mut cmd = swtc(&temp, &manager);
        cmd.arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("swiftly:\n* 6.0.3    (default)\n  5.10.1"));
    }

    #[test]
    fn available_lists_downloads() {
        let temp = assert_fs::TempDir::new().expect("Should create temp dir");
        let manager = fake_swiftly(&temp);

        let mut cmd = swtc(&temp, &manager);
        cmd.arg("available")
            .assert()
            .success()
            .stdout(predicate::str::contains("  6.1.0"));
    }

    #[test]
    fn use_switches_toolchain() {
        let temp = assert_fs::TempDir::new().expect("Should create temp dir");
        let manager = fake_swiftly(&temp);

        let mut cmd = swtc(&temp, &manager);
        cmd.args(["use", "5.10.1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Now using Swift 5.10.1."));
    }

    #[test]
    fn install_streams_progress() {
        let temp = assert_fs::TempDir::new().expect("Should create temp dir");
        let manager = fake_swiftly(&temp);

        let mut cmd = swtc(&temp, &manager);
        cmd.args(["install", "6.0.3"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[ 50%] Downloading Swift 6.0.3"))
            .stdout(predicate::str::contains("Swift 6.0.3 installed and in use."));
    }

    #[test]
    fn install_cleans_up_temporary_files() {
        let temp = assert_fs::TempDir::new().expect("Should create temp dir");
        let manager = fake_swiftly(&temp);

        let mut cmd = swtc(&temp, &manager);
        cmd.args(["install", "6.0.3"]).assert().success();

        let leftovers: Vec<_> = std::fs::read_dir(temp.path())
            .expect("Should read temp dir")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("swtc-"))
            .collect();
        assert!(leftovers.is_empty(), "left behind: {leftovers:?}");
    }

    #[test]
    fn doctor_passes_core_checks() {
        let temp = assert_fs::TempDir::new().expect("Should create temp dir");
        let manager = fake_swiftly(&temp);

        let mut cmd = swtc(&temp, &manager);
        cmd.arg("doctor")
            .assert()
            .success()
            .stdout(predicate::str::contains("[OK] swiftly"))
            .stdout(predicate::str::contains("[OK] JSON output: supported"));
    }
}
