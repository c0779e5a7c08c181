//! Bracketed `Key[value]` tag extraction.

use regex::Regex;
use serde_json::{Map, Value};

/// Reads `Key[value]` tags for a fixed set of keys.
#[derive(Debug, Clone, Default)]
pub struct Tags {
    tags: Vec<(&'static str, Regex)>,
}

impl Tags {
    /// Build a reader for the given tag keys.
    #[must_use]
    pub fn new(keys: &[&'static str]) -> Self {
        let tags = keys
            .iter()
            .filter_map(|key| {
                let pattern = format!(r"\b{}\[([^\]]*)\]", regex::escape(key));
                match Regex::new(&pattern) {
                    Ok(re) => Some((*key, re)),
                    Err(e) => {
                        tracing::warn!(tag = key, error = %e, "Failed to compile tag pattern");
                        None
                    }
                }
            })
            .collect();
        Self { tags }
    }

    /// Trimmed, non-empty text of the tag.
    #[must_use]
    pub fn text<'h>(&self, key: &str, line: &'h str) -> Option<&'h str> {
        let (_, re) = self.tags.iter().find(|(k, _)| *k == key)?;
        let value = re.captures(line)?.get(1)?.as_str().trim();
        (!value.is_empty()).then_some(value)
    }

    /// Numeric value of the tag. Absent or unparsable tags yield `None`.
    #[must_use]
    pub fn number(&self, key: &str, line: &str) -> Option<f64> {
        self.text(key, line).and_then(parse_number)
    }

    /// `true` for `1`, `true`, `on`; `false` for `0`, `false`, `off`.
    #[must_use]
    pub fn flag(&self, key: &str, line: &str) -> Option<bool> {
        match self.text(key, line)?.to_ascii_lowercase().as_str() {
            "1" | "true" | "on" => Some(true),
            "0" | "false" | "off" => Some(false),
            _ => None,
        }
    }
}

/// Parse a decimal number, tolerating a percent sign and thousands commas.
#[must_use]
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// JSON number for a parsed value; whole numbers stay integers.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

/// JSON object holding only the fields that are present.
#[must_use]
pub fn record(pairs: &[(&str, Option<Value>)]) -> Value {
    let map: Map<String, Value> = pairs
        .iter()
        .filter_map(|(k, v)| v.clone().map(|v| ((*k).to_string(), v)))
        .collect();
    Value::Object(map)
}
