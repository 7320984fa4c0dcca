//! Tolerant parsing of swiftly's JSON listings.
//!
//! `swiftly list --format=json` and `swiftly list-available --format=json`
//! share one envelope:
//!
//! ```json
//! { "toolchains": [ { "inUse": true, "isDefault": true, "installed": true,
//!                     "version": { "type": "stable", "major": 6, "minor": 0, "patch": 3 } } ] }
//! ```
//!
//! Each entry is parsed on its own. An entry that does not match the schema,
//! or whose version `type` is unknown, is dropped and the rest are kept in
//! CLI order. Only a payload that is not such an envelope at all is an error.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::ToolchainError;
use crate::version::{ToolchainVersion, WireVersion};

/// An installed toolchain as reported by `swiftly list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedToolchain {
    pub version: ToolchainVersion,
    pub in_use: bool,
    pub is_default: bool,
}

/// A downloadable toolchain as reported by `swiftly list-available`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableToolchain {
    pub version: ToolchainVersion,
    pub installed: bool,
    pub in_use: bool,
    pub is_default: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEntry {
    version: WireVersion,
    #[serde(default)]
    in_use: bool,
    #[serde(default)]
    is_default: bool,
    #[serde(default)]
    installed: bool,
}

/// Parses the output of `swiftly list --format=json`.
///
/// # Errors
///
/// Returns `Parse` only when the payload is not a listing envelope.
pub fn parse_installed(json: &str) -> Result<Vec<ListedToolchain>, ToolchainError> {
    parse_entries::<WireEntry>(json).map(|entries| {
        entries
            .into_iter()
            .filter_map(|entry| {
                Some(ListedToolchain {
                    version: known_version(entry.version)?,
                    in_use: entry.in_use,
                    is_default: entry.is_default,
                })
            })
            .collect()
    })
}

/// Parses the output of `swiftly list-available --format=json`.
///
/// # Errors
///
/// Returns `Parse` only when the payload is not a listing envelope.
pub fn parse_available(json: &str) -> Result<Vec<AvailableToolchain>, ToolchainError> {
    parse_entries::<WireEntry>(json).map(|entries| {
        entries
            .into_iter()
            .filter_map(|entry| {
                Some(AvailableToolchain {
                    version: known_version(entry.version)?,
                    installed: entry.installed,
                    in_use: entry.in_use,
                    is_default: entry.is_default,
                })
            })
            .collect()
    })
}

fn parse_entries<T: DeserializeOwned>(json: &str) -> Result<Vec<T>, ToolchainError> {
    let invalid =
        |detail: String| ToolchainError::parse(format!("unexpected swiftly listing: {detail}"));

    let envelope: Value = serde_json::from_str(json).map_err(|e| invalid(e.to_string()))?;
    let Value::Object(mut envelope) = envelope else {
        return Err(invalid("expected a JSON object".to_string()));
    };
    let entries = match envelope.remove("toolchains") {
        None => Vec::new(),
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(invalid("'toolchains' is not an array".to_string())),
    };

    Ok(entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::debug!(index, error = %e, "dropping malformed toolchain entry");
                None
            }
        })
        .collect())
}

fn known_version(version: WireVersion) -> Option<ToolchainVersion> {
    let known = version.into_version();
    if known.is_none() {
        tracing::debug!("dropping toolchain entry with unknown version type");
    }
    known
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[ListedToolchain]) -> Vec<&str> {
        list.iter().map(|t| t.version.name()).collect()
    }

    #[test]
    fn parses_all_known_variants_in_order() {
        let json = r#"{"toolchains":[
            {"inUse":true,"isDefault":true,"version":{"type":"stable","major":6,"minor":0,"patch":3,"name":"6.0.3"}},
            {"inUse":false,"isDefault":false,"version":{"type":"snapshot","branch":"main","date":"2025-01-10","name":"main-snapshot-2025-01-10"}},
            {"inUse":false,"isDefault":false,"version":{"type":"system","name":"xcode"}}
        ]}"#;
        let list = parse_installed(json).expect("Should parse");
        assert_eq!(
            names(&list),
            vec!["6.0.3", "main-snapshot-2025-01-10", "xcode"]
        );
        assert!(list[0].in_use && list[0].is_default);
        assert!(!list[1].in_use);
    }

    #[test]
    fn unknown_version_types_are_dropped_keeping_order() {
        let json = r#"{"toolchains":[
            {"inUse":false,"isDefault":false,"version":{"type":"stable","major":5,"minor":10,"patch":1}},
            {"inUse":false,"isDefault":false,"version":{"type":"experimental","name":"x"}},
            {"inUse":true,"isDefault":false,"version":{"type":"stable","major":6,"minor":0,"patch":0}},
            {"inUse":false,"isDefault":false,"version":{"type":"nightly"}},
            {"inUse":false,"isDefault":false,"version":{"type":"snapshot","branch":"6.1","date":"2024-12-01"}}
        ]}"#;
        let list = parse_installed(json).expect("Should parse");
        assert_eq!(
            names(&list),
            vec!["5.10.1", "6.0.0", "6.1-snapshot-2024-12-01"]
        );
        assert!(list[1].in_use);
    }

    #[test]
    fn malformed_entries_are_dropped() {
        let json = r#"{"toolchains":[
            42,
            {"version":{"type":"stable","major":"six"}},
            {"inUse":false},
            {"version":{"type":"stable","major":6,"minor":0,"patch":3}}
        ]}"#;
        let list = parse_installed(json).expect("Should parse");
        assert_eq!(names(&list), vec!["6.0.3"]);
        assert!(!list[0].in_use && !list[0].is_default);
    }

    #[test]
    fn available_entries_carry_installed_flag() {
        let json = r#"{"toolchains":[
            {"inUse":false,"installed":true,"isDefault":false,"version":{"type":"stable","major":6,"minor":0,"patch":3}},
            {"inUse":false,"installed":false,"isDefault":false,"version":{"type":"stable","major":6,"minor":0,"patch":2}},
            {"installed":false,"version":{"type":"mystery"}}
        ],"extra":"ignored"}"#;
        let list = parse_available(json).expect("Should parse");
        assert_eq!(list.len(), 2);
        assert!(list[0].installed);
        assert!(!list[1].installed);
    }

    #[test]
    fn missing_toolchains_key_is_empty() {
        assert!(parse_installed("{}").expect("Should parse").is_empty());
    }

    #[test]
    fn unparseable_payload_is_an_error() {
        for payload in [
            "",
            "not json",
            "[]",
            "null",
            r#"[[{"version":{"type":"stable","major":6,"minor":0,"patch":3}}]]"#,
            r#"{"toolchains":"6.0.3"}"#,
        ] {
            let err = parse_installed(payload).expect_err("Should fail");
            assert!(matches!(err, ToolchainError::Parse { .. }), "{payload}");
        }
    }
}
