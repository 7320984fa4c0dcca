#![warn(clippy::pedantic)]
//! Swift toolchain lifecycle core
//!
//! This crate finds, installs and switches Swift toolchains through
//! [swiftly](https://github.com/swiftlang/swiftly), and diagnoses builds that
//! mix a swiftly toolchain with one bundled with Xcode.
//!
//! ## Overview
//!
//! ```text
//! Settings ─▶ Swiftly ─┬─▶ list / list_available / use_toolchain
//!                      ├─▶ install_toolchain ─▶ progress pipe ─▶ post-install script
//!                      └─▶ Discovery (Xcode + standalone bundles + swiftly)
//! compiler output ─▶ detect_mismatch
//! ```
//!
//! Every external effect goes through a small trait ([`ProcessRunner`],
//! [`Filesystem`], [`Prompter`]) so the whole crate can be exercised with
//! in-memory fakes. The platform is injected rather than probed, see
//! [`Platform`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use swift_toolchain::{InstallRequest, Prompter, Settings, Swiftly};
//!
//! async fn install(prompter: &dyn Prompter) -> Result<(), swift_toolchain::ToolchainError> {
//!     let settings = Settings::from_env()?;
//!     let swiftly = Swiftly::from_settings(&settings);
//!     for toolchain in swiftly.list().await {
//!         println!("{} {}", toolchain.name, if toolchain.in_use { "*" } else { "" });
//!     }
//!     swiftly
//!         .install_toolchain(InstallRequest::new("6.0.3"), prompter)
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Read operations degrade to empty results. Installs return a
//! [`ToolchainError`]; check [`ToolchainError::is_cancelled`] before showing
//! an error, since cancellation is not a failure.

pub mod cancel;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod fs;
pub mod install;
pub mod listing;
pub mod manager;
pub mod mismatch;
pub mod paths;
pub mod platform;
pub mod post_install;
pub mod process;
pub mod progress;
pub mod prompt;
pub mod registry;
pub mod settings;
pub mod version;

pub use cancel::{CancelSource, CancelToken};
pub use discovery::{DiscoveredToolchains, Discovery, ToolchainRecord, ToolchainSource};
pub use errors::ToolchainError;
pub use fs::{Filesystem, LocalFilesystem};
pub use install::{InstallOutcome, InstallPaths, InstallRequest, InstallState};
pub use listing::AvailableToolchain;
pub use manager::{Swiftly, ToolchainManager};
pub use mismatch::{
    MismatchContext, MismatchVerdict, Remediation, SignalKind, ToolchainAuthority, detect_mismatch,
};
pub use paths::ManagerPaths;
pub use platform::Platform;
pub use post_install::{AllowList, PostInstallOutcome, PostInstallScript, Verdict};
pub use process::{Invocation, ProcessOutput, ProcessRunner, SystemProcessRunner};
pub use progress::{ProgressEvent, ProgressSink};
pub use prompt::Prompter;
pub use registry::{InstallRegistry, InstallSession};
pub use settings::Settings;
pub use version::ToolchainVersion;
