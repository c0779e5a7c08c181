//! User replacements for built-in patterns, keyed `recognizer.pattern`.

use std::collections::{BTreeMap, HashMap};

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::custom::{compile_pattern, PatternError};

/// One entry of the `pattern_overrides` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternOverride {
    /// Replacement regex, bare or `/body/flags`. It must keep the capture
    /// groups of the pattern it replaces.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// The pattern never matches. Takes precedence over `regex`.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
}

impl PatternOverride {
    #[must_use]
    pub fn replace(regex: impl Into<String>) -> Self {
        Self {
            regex: Some(regex.into()),
            disabled: false,
        }
    }

    #[must_use]
    pub fn disable() -> Self {
        Self {
            regex: None,
            disabled: true,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum OverrideError {
    #[error("Pattern override key '{0}' must be 'recognizer.pattern'")]
    BadKey(String),

    #[error("Pattern override '{0}' names no built-in pattern")]
    UnknownPattern(String),

    #[error("Pattern override '{key}': {source}")]
    Invalid {
        key: String,
        #[source]
        source: PatternError,
    },
}

/// Compiled overrides grouped by recognizer, then pattern name. `None`
/// disables the pattern.
pub(crate) type CompiledOverrides = HashMap<&'static str, HashMap<String, Option<Regex>>>;

/// Validate and compile a full override set. `lookup` maps a
/// `(recognizer, pattern)` pair to the recognizer's static name when that
/// built-in pattern exists.
pub(crate) fn compile_overrides(
    overrides: &BTreeMap<String, PatternOverride>,
    lookup: impl Fn(&str, &str) -> Option<&'static str>,
) -> Result<CompiledOverrides, OverrideError> {
    let mut compiled = CompiledOverrides::new();
    for (key, entry) in overrides {
        let (recognizer, pattern) = key
            .split_once('.')
            .filter(|(r, p)| !r.is_empty() && !p.is_empty())
            .ok_or_else(|| OverrideError::BadKey(key.clone()))?;
        let owner = lookup(recognizer, pattern).ok_or_else(|| OverrideError::UnknownPattern(key.clone()))?;

        let regex = if entry.disabled {
            None
        } else {
            let text = entry.regex.as_deref().unwrap_or_default();
            let regex = compile_pattern(text, "").map_err(|source| OverrideError::Invalid {
                key: key.clone(),
                source,
            })?;
            Some(regex)
        };
        compiled.entry(owner).or_default().insert(pattern.to_string(), regex);
    }
    Ok(compiled)
}
