//! Rule document loading.
//!
//! Text is deserialized into the raw [`RuleDocument`] schema and compiled.
//! Syntax errors and layout mismatches are `RuleParse`; an unreadable file
//! is a `ConfigError`.

use std::path::Path;

use tracing::info;

use reelcheck_contracts::{
    error::{ReelcheckError, ReelcheckResult},
    rules::RuleSet,
};

use crate::{compile::compile, document::RuleDocument};

/// Encodings a rule document may be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFormat {
    Yaml,
    Json,
    Toml,
}

impl RuleFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> ReelcheckResult<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("yaml") | Some("yml") => Ok(RuleFormat::Yaml),
            Some("json") => Ok(RuleFormat::Json),
            Some("toml") => Ok(RuleFormat::Toml),
            _ => Err(ReelcheckError::ConfigError {
                reason: format!(
                    "cannot tell the rule format of '{}'; expected .yaml, .yml, .json or .toml",
                    path.display()
                ),
            }),
        }
    }
}

pub fn from_yaml_str(s: &str) -> ReelcheckResult<RuleSet> {
    let document: RuleDocument = serde_yaml::from_str(s).map_err(|e| ReelcheckError::RuleParse {
        reason: format!("failed to parse rule YAML: {e}"),
    })?;
    compile(document)
}

pub fn from_json_str(s: &str) -> ReelcheckResult<RuleSet> {
    let document: RuleDocument = serde_json::from_str(s).map_err(|e| ReelcheckError::RuleParse {
        reason: format!("failed to parse rule JSON: {e}"),
    })?;
    compile(document)
}

pub fn from_toml_str(s: &str) -> ReelcheckResult<RuleSet> {
    let document: RuleDocument = toml::from_str(s).map_err(|e| ReelcheckError::RuleParse {
        reason: format!("failed to parse rule TOML: {e}"),
    })?;
    compile(document)
}

pub fn from_str(s: &str, format: RuleFormat) -> ReelcheckResult<RuleSet> {
    match format {
        RuleFormat::Yaml => from_yaml_str(s),
        RuleFormat::Json => from_json_str(s),
        RuleFormat::Toml => from_toml_str(s),
    }
}

/// Read and compile the rule document at `path`, choosing the format by
/// extension.
pub fn from_file(path: &Path) -> ReelcheckResult<RuleSet> {
    let format = RuleFormat::from_path(path)?;
    let contents = std::fs::read_to_string(path).map_err(|e| ReelcheckError::ConfigError {
        reason: format!("failed to read rule file '{}': {}", path.display(), e),
    })?;
    let rules = from_str(&contents, format)?;
    info!(path = %path.display(), ?format, "loaded rule set");
    Ok(rules)
}
