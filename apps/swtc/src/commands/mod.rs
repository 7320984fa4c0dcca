//! Command modules for the swtc CLI.
//!
//! ## Toolchain Commands
//!
//! - [`list`] - List installed toolchains from every source
//! - [`available`] - List toolchains swiftly can download
//! - [`install`] - Install a toolchain
//! - [`use_cmd`] - Switch the active toolchain
//!
//! ## Diagnostics
//!
//! - [`doctor`] - Check the swiftly setup
//! - [`diagnose`] - Detect a swiftly/Xcode toolchain mix in build output

pub mod available;
pub mod diagnose;
pub mod doctor;
pub mod install;
pub mod list;
pub mod use_cmd;
