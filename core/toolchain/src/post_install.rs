//! Post-install script validation and privileged execution.
//!
//! On Linux, swiftly may write a shell script naming system packages the new
//! toolchain needs (`apt-get -y install libcurl4-openssl-dev ...`). Running it
//! requires root, so the script is only ever offered to the user after it
//! passed a fail-closed validator.
//!
//! ## Grammar
//!
//! After dropping blank lines and `#` comments, every line must read
//!
//! ```text
//! BINARY FLAG* SUBCOMMAND FLAG* PACKAGE+
//! ```
//!
//! where `BINARY` is an allow-listed package manager, `SUBCOMMAND` one of its
//! allow-listed install subcommands, `FLAG` one of its allow-listed flags and
//! `PACKAGE` a token made only of `[A-Za-z0-9._+:~=-]` that does not start
//! with `-`. A line containing any shell metacharacter is rejected before
//! tokenising. One bad line rejects the whole script.
//!
//! Rejection reasons name the line number and the rule. They never quote the
//! line, so the error cannot be used as a copy-paste recipe to bypass the check.

use std::path::Path;

use serde::Deserialize;

use crate::cancel::CancelToken;
use crate::errors::ToolchainError;
use crate::fs::Filesystem;
use crate::process::{Invocation, ProcessRunner};
use crate::prompt::{Prompter, confirm_or_cancel};

/// Privilege-escalation helper used to run an accepted script.
pub const ESCALATION_PROGRAM: &str = "pkexec";

const SHELL_METACHARACTERS: &[char] = &[
    '|', '&', ';', '<', '>', '$', '`', '(', ')', '{', '}', '[', ']', '*', '?', '!', '\\', '\'',
    '"',
];

/// One package manager the validator accepts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AllowedManager {
    /// Exact binary name as it appears in the script, e.g. `apt-get`.
    pub binary: String,
    /// Subcommands that install packages.
    #[serde(default)]
    pub subcommands: Vec<String>,
    /// Flags accepted before or after the subcommand.
    #[serde(default)]
    pub flags: Vec<String>,
}

impl AllowedManager {
    fn new(binary: &str, subcommands: &[&str], flags: &[&str]) -> Self {
        Self {
            binary: binary.to_string(),
            subcommands: subcommands.iter().map(ToString::to_string).collect(),
            flags: flags.iter().map(ToString::to_string).collect(),
        }
    }

    fn allows_flag(&self, token: &str) -> bool {
        self.flags.iter().any(|flag| flag == token)
    }

    fn allows_subcommand(&self, token: &str) -> bool {
        self.subcommands.iter().any(|sub| sub == token)
    }
}

/// The set of package-manager invocations a post-install script may contain.
///
/// The default is `apt-get` and `yum`, each limited to `install` and `-y`.
/// A custom list can be loaded from JSON:
///
/// ```json
/// { "managers": [ { "binary": "dnf", "subcommands": ["install"], "flags": ["-y"] } ] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AllowList {
    #[serde(default)]
    pub managers: Vec<AllowedManager>,
}

impl Default for AllowList {
    fn default() -> Self {
        Self {
            managers: vec![
                AllowedManager::new("apt-get", &["install"], &["-y"]),
                AllowedManager::new("yum", &["install"], &["-y"]),
            ],
        }
    }
}

impl AllowList {
    /// Parses an allow-list from JSON. Unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns `Parse` if the text is not a valid allow-list document.
    pub fn from_json(text: &str) -> Result<Self, ToolchainError> {
        serde_json::from_str(text)
            .map_err(|e| ToolchainError::parse(format!("invalid allow-list: {e}")))
    }

    fn manager(&self, binary: &str) -> Option<&AllowedManager> {
        self.managers.iter().find(|m| m.binary == binary)
    }
}

/// One meaningful line of a post-install script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// 1-based line number in the original script.
    pub line_number: usize,
    /// The trimmed line.
    pub text: String,
    /// Whitespace-separated tokens.
    pub tokens: Vec<String>,
}

/// Outcome of validating a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected {
        /// Line number and rule. Never contains script text.
        reason: String,
    },
}

/// A parsed and validated post-install script. Immutable once built.
#[derive(Debug, Clone)]
pub struct PostInstallScript {
    raw: String,
    lines: Vec<ParsedCommand>,
    verdict: Verdict,
}

impl PostInstallScript {
    /// Parses `raw` and validates every line against `allow_list`.
    #[must_use]
    pub fn parse(raw: impl Into<String>, allow_list: &AllowList) -> Self {
        let raw = raw.into();
        let lines: Vec<ParsedCommand> = raw
            .lines()
            .enumerate()
            .filter_map(|(index, line)| {
                let text = line.trim();
                if text.is_empty() || text.starts_with('#') {
                    return None;
                }
                Some(ParsedCommand {
                    line_number: index + 1,
                    text: text.to_string(),
                    tokens: text.split_whitespace().map(str::to_string).collect(),
                })
            })
            .collect();

        let verdict = lines
            .iter()
            .find_map(|command| validate_command(command, allow_list).err())
            .map_or(Verdict::Accepted, |reason| Verdict::Rejected { reason });

        Self {
            raw,
            lines,
            verdict,
        }
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn lines(&self) -> &[ParsedCommand] {
        &self.lines
    }

    #[must_use]
    pub fn verdict(&self) -> &Verdict {
        &self.verdict
    }

    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.verdict == Verdict::Accepted
    }
}

fn validate_command(command: &ParsedCommand, allow_list: &AllowList) -> Result<(), String> {
    let line = command.line_number;

    if command.text.contains(SHELL_METACHARACTERS) {
        return Err(format!("line {line}: contains a shell metacharacter"));
    }

    let mut tokens = command.tokens.iter().map(String::as_str).peekable();
    let Some(manager) = tokens.next().and_then(|binary| allow_list.manager(binary)) else {
        return Err(format!("line {line}: command is not an allowed package manager"));
    };

    while let Some(token) = tokens.next_if(|t| t.starts_with('-')) {
        if !manager.allows_flag(token) {
            return Err(format!("line {line}: flag is not allowed"));
        }
    }

    match tokens.next() {
        Some(sub) if manager.allows_subcommand(sub) => {}
        _ => return Err(format!("line {line}: subcommand is not an allowed install subcommand")),
    }

    while let Some(token) = tokens.next_if(|t| t.starts_with('-')) {
        if !manager.allows_flag(token) {
            return Err(format!("line {line}: flag is not allowed"));
        }
    }

    let mut packages = 0usize;
    for token in tokens {
        if token.starts_with('-') {
            return Err(format!("line {line}: flags must precede package names"));
        }
        if !token.chars().all(is_package_char) {
            return Err(format!(
                "line {line}: package name contains characters that are not allowed"
            ));
        }
        packages += 1;
    }

    if packages == 0 {
        return Err(format!("line {line}: no packages named"));
    }
    Ok(())
}

fn is_package_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '+' | ':' | '~' | '=' | '-')
}

/// What happened to the post-install step of a successful install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostInstallOutcome {
    /// swiftly did not ask for extra packages.
    NotRequired,
    /// A script was produced on a platform that does not run one.
    Skipped,
    /// The user accepted and the script ran successfully.
    Executed,
    /// The user declined; the toolchain may be unusable.
    Declined,
}

/// Validates and, with the user's consent, runs a post-install script.
///
/// The steps are separate so the install pipeline can track its state
/// between them: [`review`](Self::review), then [`ask`](Self::ask), then
/// either [`execute`](Self::execute) or [`warn_declined`](Self::warn_declined).
pub struct PostInstallExecutor<'a> {
    pub runner: &'a dyn ProcessRunner,
    pub fs: &'a dyn Filesystem,
    pub prompter: &'a dyn Prompter,
    pub allow_list: &'a AllowList,
}

impl PostInstallExecutor<'_> {
    /// Reads and validates the script swiftly wrote while installing `version`.
    ///
    /// A rejected script is reported through [`Prompter::error`] and never
    /// reaches the confirmation prompt.
    ///
    /// # Errors
    ///
    /// Returns `ScriptValidationRejected` for rejected scripts and
    /// `PostInstallFailed` if the script cannot be read.
    pub async fn review(
        &self,
        version: &str,
        script_path: &Path,
    ) -> Result<PostInstallScript, ToolchainError> {
        let text = self.fs.read_to_string(script_path).await.map_err(|e| {
            ToolchainError::post_install_failed(
                version,
                format!("could not read the post-install script: {e}"),
            )
        })?;

        let script = PostInstallScript::parse(text, self.allow_list);
        if let Verdict::Rejected { reason } = script.verdict() {
            tracing::warn!(version, reason = %reason, "post-install script rejected");
            let err = ToolchainError::script_rejected(version, reason.as_str());
            self.prompter.error(&err.to_string());
            return Err(err);
        }
        Ok(script)
    }

    /// Asks whether to run the script with elevated privileges.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` if the token fires before the user answers.
    pub async fn ask(&self, version: &str, cancel: &CancelToken) -> Result<bool, ToolchainError> {
        let question = format!(
            "Swift {version} requires additional system packages to be installed. \
             Run the post-install script with administrator privileges?"
        );
        confirm_or_cancel(self.prompter, &question, cancel).await
    }

    /// Warns that the toolchain may not work without the skipped packages.
    pub fn warn_declined(&self, version: &str) {
        self.prompter.warn(&format!(
            "Swift {version} is installed, but it may not work until the required \
             system packages are installed manually."
        ));
    }

    /// Makes the script executable and runs it through [`ESCALATION_PROGRAM`].
    ///
    /// A failure here leaves the toolchain itself installed.
    ///
    /// # Errors
    ///
    /// Returns `PostInstallFailed` naming `version`, or `Cancelled`.
    pub async fn execute(
        &self,
        version: &str,
        script_path: &Path,
        cancel: &CancelToken,
    ) -> Result<(), ToolchainError> {
        self.fs.set_executable(script_path).await.map_err(|e| {
            ToolchainError::post_install_failed(
                version,
                format!("could not make the post-install script executable: {e}"),
            )
        })?;

        let invocation =
            Invocation::new(ESCALATION_PROGRAM).arg(script_path.to_string_lossy().into_owned());
        self.runner.run(&invocation, cancel).await.map_err(|e| {
            if e.is_cancelled() {
                e
            } else {
                ToolchainError::post_install_failed(version, e.to_string())
            }
        })?;

        tracing::info!(version, "post-install script completed");
        Ok(())
    }
}
