//! swiftly's legacy on-disk configuration.
//!
//! swiftly releases older than 1.1.0 cannot list toolchains as JSON, so the
//! installed set is read from `<home>/config.json` instead:
//!
//! ```json
//! { "installedToolchains": ["6.0.3", "main-snapshot-2025-01-10"], "inUse": "6.0.3" }
//! ```
//!
//! Parsing is tolerant: entries that are not strings are dropped, and a
//! missing or non-array `installedToolchains` reads as empty.

use std::io;
use std::path::Path;

use serde_json::Value;

use crate::errors::ToolchainError;
use crate::fs::Filesystem;

/// Contents of swiftly's legacy `config.json` that this crate uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyConfig {
    /// Names of installed toolchains, in file order.
    pub installed_toolchains: Vec<String>,
    /// The active toolchain, if recorded.
    pub in_use: Option<String>,
}

impl LegacyConfig {
    /// Parses the text of a legacy config file.
    ///
    /// # Errors
    ///
    /// Returns `Parse` if the text is not a JSON object.
    pub fn parse(text: &str) -> Result<Self, ToolchainError> {
        let raw: Value = serde_json::from_str(text)
            .map_err(|e| ToolchainError::parse(format!("invalid swiftly config: {e}")))?;
        let Value::Object(mut raw) = raw else {
            return Err(ToolchainError::parse(
                "invalid swiftly config: expected a JSON object",
            ));
        };

        let installed_toolchains = match raw.remove("installedToolchains") {
            Some(Value::Array(entries)) => entries
                .into_iter()
                .filter_map(|entry| match entry {
                    Value::String(name) => Some(name),
                    other => {
                        tracing::debug!(entry = %other, "ignoring non-string toolchain entry");
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        };

        let in_use = match raw.remove("inUse") {
            Some(Value::String(name)) if !name.is_empty() => Some(name),
            _ => None,
        };

        Ok(Self {
            installed_toolchains,
            in_use,
        })
    }

    /// Loads the legacy config at `path`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigNotFound` if the file does not exist, `Io` for other
    /// read failures and `Parse` for malformed content.
    pub async fn load(fs: &dyn Filesystem, path: &Path) -> Result<Self, ToolchainError> {
        match fs.read_to_string(path).await {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ToolchainError::config_not_found(path.to_path_buf()))
            }
            Err(e) => Err(ToolchainError::io(
                format!("failed to read {}", path.display()),
                e,
            )),
        }
    }
}
