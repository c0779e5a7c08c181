//! Ordered, named regex tables owned by each recognizer.

use std::collections::HashMap;

use regex::{Captures, Regex};

/// An ordered `name -> pattern` table.
///
/// Built-in patterns are literals; one that fails to compile is skipped with
/// a warning and every lookup of its name simply does not match. The table
/// remembers its original patterns so overrides can always be undone.
#[derive(Debug, Clone, Default)]
pub struct PatternTable {
    entries: Vec<(String, Regex)>,
    defaults: Vec<(String, Regex)>,
}

impl PatternTable {
    /// Compile a table from `(name, pattern)` pairs, keeping their order.
    #[must_use]
    pub fn new(specs: &[(&str, &str)]) -> Self {
        let entries = specs
            .iter()
            .filter_map(|(name, pattern)| match Regex::new(pattern) {
                Ok(re) => Some(((*name).to_string(), re)),
                Err(e) => {
                    tracing::warn!(pattern = %name, error = %e, "Failed to compile built-in pattern");
                    None
                }
            })
            .collect::<Vec<_>>();
        Self {
            defaults: entries.clone(),
            entries,
        }
    }

    /// Append an already compiled pattern.
    pub fn push(&mut self, name: impl Into<String>, regex: Regex) {
        let name = name.into();
        self.defaults.push((name.clone(), regex.clone()));
        self.entries.push((name, regex));
    }

    /// Whether `name` is one of the table's original patterns.
    #[must_use]
    pub fn has_default(&self, name: &str) -> bool {
        self.defaults.iter().any(|(n, _)| n == name)
    }

    /// Restore the original patterns, then apply `overrides`: `Some`
    /// replaces a pattern, `None` removes it so it never matches.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, Option<Regex>>) {
        self.entries = self
            .defaults
            .iter()
            .filter_map(|(name, regex)| match overrides.get(name) {
                None => Some((name.clone(), regex.clone())),
                Some(Some(replacement)) => Some((name.clone(), replacement.clone())),
                Some(None) => None,
            })
            .collect();
    }

    /// Look up a pattern by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Regex> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, re)| re)
    }

    /// Whether the named pattern matches the line.
    #[must_use]
    pub fn is_match(&self, name: &str, line: &str) -> bool {
        self.get(name).is_some_and(|re| re.is_match(line))
    }

    /// Capture groups of the named pattern against the line.
    #[must_use]
    pub fn captures<'h>(&self, name: &str, line: &'h str) -> Option<Captures<'h>> {
        self.get(name).and_then(|re| re.captures(line))
    }

    /// Replace every match of the named pattern. Unknown names leave the
    /// text unchanged.
    #[must_use]
    pub fn replace_all(&self, name: &str, text: &str, replacement: &str) -> String {
        match self.get(name) {
            Some(re) => re.replace_all(text, replacement).into_owned(),
            None => text.to_string(),
        }
    }

    /// Names of all patterns matching the line, in table order.
    #[must_use]
    pub fn matching(&self, line: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, re)| re.is_match(line))
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// Pattern names in table order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Text of capture group `i`, if it participated in the match.
#[must_use]
pub fn group<'h>(caps: &Captures<'h>, i: usize) -> Option<&'h str> {
    caps.get(i).map(|m| m.as_str())
}
