//! User-defined patterns compiled at configuration time.
//!
//! A pattern is either a bare regex or `/body/flags`. Compilation errors are
//! returned to the caller immediately; a rule that compiled can never fail
//! at match time. The `regex` engine does not backtrack, and matching input
//! is additionally capped at [`MAX_MATCH_INPUT`] bytes.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::table::group;
use super::{LineContext, PatternTable, Recognizer};
use crate::event::{EventKind, GameEvent, Level};

/// Longest accepted pattern text.
pub const MAX_PATTERN_LEN: usize = 2048;

/// Only this many leading bytes of a line are matched against user rules.
pub const MAX_MATCH_INPUT: usize = 8 * 1024;

/// Compiled program size limit for one user rule.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Error compiling a single custom pattern.
#[derive(thiserror::Error, Debug)]
pub enum PatternError {
    #[error("Pattern is empty")]
    Empty,

    #[error("Unsupported regex flag '{flag}'")]
    InvalidFlag { flag: char },

    #[error("Pattern is {len} bytes, limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("Invalid regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Error compiling a list of custom patterns.
#[derive(thiserror::Error, Debug)]
#[error("Custom pattern #{index}: {source}")]
pub struct PatternSetError {
    /// Position of the offending entry in the submitted list.
    pub index: usize,
    #[source]
    pub source: PatternError,
}

/// A user-authored pattern as found in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomPatternSpec {
    /// Regex text, optionally in `/body/flags` form.
    pub regex: String,
    /// Extra flags applied on top of any inline `/…/flags`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<String>,
    /// Required; forwarded to every event as configured.
    pub level: Level,
    /// Message template; `$1` and `$2` are replaced by capture groups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Opaque color tag passed through to consumers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// `NONE` suppresses the event while still counting the line as matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

impl CustomPatternSpec {
    /// A spec with a regex and the level its events carry.
    #[must_use]
    pub fn new(regex: impl Into<String>, level: Level) -> Self {
        Self {
            regex: regex.into(),
            flags: None,
            level,
            message: None,
            color: None,
            name: None,
            id: None,
            event: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Message after the `message → name → "Custom Match"` fallback.
    #[must_use]
    pub fn display_message(&self) -> &str {
        self.message
            .as_deref()
            .filter(|m| !m.is_empty())
            .or_else(|| self.name.as_deref().filter(|n| !n.is_empty()))
            .unwrap_or("Custom Match")
    }

    fn is_silent(&self) -> bool {
        self.display_message().eq_ignore_ascii_case("none")
            || self
                .event
                .as_deref()
                .is_some_and(|e| e.eq_ignore_ascii_case("none"))
    }
}

/// Split `/body/flags` into its parts. Anything else is a bare body.
fn split_delimited(text: &str) -> (&str, &str) {
    match text.strip_prefix('/').and_then(|rest| rest.rfind('/').map(|i| (rest, i))) {
        Some((rest, i)) => (&rest[..i], &rest[i + 1..]),
        None => (text, ""),
    }
}

fn build_regex(body: &str, flags: &str) -> Result<Regex, PatternError> {
    let mut builder = RegexBuilder::new(body);
    builder.size_limit(REGEX_SIZE_LIMIT).dfa_size_limit(REGEX_SIZE_LIMIT);
    for flag in flags.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'x' => {
                builder.ignore_whitespace(true);
            }
            // Global and unicode flags have no meaning here.
            'g' | 'u' => {}
            _ => return Err(PatternError::InvalidFlag { flag }),
        }
    }
    builder.build().map_err(|source| PatternError::InvalidRegex {
        pattern: body.to_string(),
        source,
    })
}

/// Compile user pattern text, bare or `/body/flags`, with `extra_flags`
/// applied after the inline ones.
pub(crate) fn compile_pattern(text: &str, extra_flags: &str) -> Result<Regex, PatternError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(PatternError::Empty);
    }
    if text.len() > MAX_PATTERN_LEN {
        return Err(PatternError::TooLong {
            len: text.len(),
            max: MAX_PATTERN_LEN,
        });
    }
    let (body, inline_flags) = split_delimited(text);
    if body.is_empty() {
        return Err(PatternError::Empty);
    }
    build_regex(body, &format!("{inline_flags}{extra_flags}"))
}

/// Longest prefix of `line` within the match input cap.
fn capped(line: &str) -> &str {
    if line.len() <= MAX_MATCH_INPUT {
        return line;
    }
    let mut end = MAX_MATCH_INPUT;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

/// One compiled user pattern.
#[derive(Debug, Clone)]
pub struct CustomRule {
    spec: CustomPatternSpec,
    regex: Regex,
}

impl CustomRule {
    /// Compile a spec.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] if the text is empty, too long, carries an
    /// unknown flag or is not a valid regex.
    pub fn compile(spec: CustomPatternSpec) -> Result<Self, PatternError> {
        let regex = compile_pattern(&spec.regex, spec.flags.as_deref().unwrap_or_default())?;
        Ok(Self { spec, regex })
    }

    #[must_use]
    pub fn spec(&self) -> &CustomPatternSpec {
        &self.spec
    }

    /// Name shown in diagnostics.
    #[must_use]
    pub fn label(&self, index: usize) -> String {
        match &self.spec.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("custom[{index}]"),
        }
    }

    /// Match a line. `None` means no match; `Some(None)` means matched but
    /// configured to emit nothing.
    #[must_use]
    pub fn apply(&self, line: &str) -> Option<Option<GameEvent>> {
        let caps = self.regex.captures(capped(line))?;
        if self.spec.is_silent() {
            return Some(None);
        }
        let first = group(&caps, 1);
        let message = self
            .spec
            .display_message()
            .replacen("$1", first.unwrap_or_default(), 1)
            .replacen("$2", group(&caps, 2).unwrap_or_default(), 1);

        let event = GameEvent::new(EventKind::Custom, first.unwrap_or(line))
            .with_level(self.spec.level)
            .with_id(self.spec.id.as_deref())
            .with_field("message", message)
            .with_opt_field("color", self.spec.color.clone())
            .with_field("source", "user");
        Some(Some(event))
    }
}

/// The user-defined pattern slot of the dispatch engine.
#[derive(Debug, Clone)]
pub struct CustomRecognizer {
    rules: Vec<CustomRule>,
    table: PatternTable,
    enabled: bool,
}

impl Default for CustomRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomRecognizer {
    /// An enabled recognizer with no rules.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            table: PatternTable::default(),
            enabled: true,
        }
    }

    /// Compile a full rule set.
    ///
    /// # Errors
    ///
    /// Returns the first entry that failed to compile.
    pub fn from_specs(specs: &[CustomPatternSpec]) -> Result<Self, PatternSetError> {
        let mut recognizer = Self::new();
        recognizer.set_patterns(specs)?;
        Ok(recognizer)
    }

    /// Replace the rule set. Either every spec compiles and the set is
    /// swapped, or the active set is left untouched.
    ///
    /// # Errors
    ///
    /// Returns the first entry that failed to compile.
    pub fn set_patterns(&mut self, specs: &[CustomPatternSpec]) -> Result<usize, PatternSetError> {
        let rules = specs
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                CustomRule::compile(spec.clone()).map_err(|source| PatternSetError { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut table = PatternTable::default();
        for (index, rule) in rules.iter().enumerate() {
            table.push(rule.label(index), rule.regex.clone());
        }
        self.rules = rules;
        self.table = table;
        Ok(self.rules.len())
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn rules(&self) -> &[CustomRule] {
        &self.rules
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Recognizer for CustomRecognizer {
    fn name(&self) -> &'static str {
        "custom"
    }

    fn patterns(&self) -> &PatternTable {
        &self.table
    }

    fn patterns_mut(&mut self) -> &mut PatternTable {
        &mut self.table
    }

    fn parse(&mut self, line: &str, _ctx: &LineContext, out: &mut Vec<GameEvent>) -> bool {
        if !self.enabled {
            return false;
        }
        let mut handled = false;
        for rule in &self.rules {
            if let Some(event) = rule.apply(line) {
                out.extend(event);
                handled = true;
            }
        }
        handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(rec: &mut CustomRecognizer, line: &str) -> (bool, Vec<GameEvent>) {
        let mut out = Vec::new();
        let matched = rec.parse(line, &LineContext::now(), &mut out);
        (matched, out)
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let err = CustomRule::compile(CustomPatternSpec::new("(", Level::Info)).unwrap_err();
        assert!(matches!(err, PatternError::InvalidRegex { .. }));
        assert!(err.to_string().starts_with("Invalid regex '('"));
    }

    #[test]
    fn test_set_is_all_or_nothing() {
        let mut rec = CustomRecognizer::from_specs(&[CustomPatternSpec::new("Quantum", Level::Info)]).unwrap();
        let err = rec
            .set_patterns(&[CustomPatternSpec::new("ok", Level::Info), CustomPatternSpec::new("(", Level::Info)])
            .unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(rec.len(), 1);
        assert!(parse(&mut rec, "Quantum").0);
        assert!(!parse(&mut rec, "(").0);
    }

    #[test]
    fn test_empty_and_flag_errors() {
        assert!(matches!(
            CustomRule::compile(CustomPatternSpec::new("  ", Level::Info)),
            Err(PatternError::Empty)
        ));
        assert!(matches!(
            CustomRule::compile(CustomPatternSpec::new("/abc/q", Level::Info)),
            Err(PatternError::InvalidFlag { flag: 'q' })
        ));
        assert!(matches!(
            CustomRule::compile(CustomPatternSpec::new("a".repeat(MAX_PATTERN_LEN + 1), Level::Info)),
            Err(PatternError::TooLong { .. })
        ));
    }

    #[test]
    fn test_delimited_flags() {
        let rule = CustomRule::compile(CustomPatternSpec::new("/hello (\\w+)/gi", Level::Info)).unwrap();
        let event = rule.apply("HELLO World").unwrap().unwrap();
        assert_eq!(event.value_str(), Some("World"));
    }

    #[test]
    fn test_message_substitution_and_level_passthrough() {
        let spec = CustomPatternSpec::new(r"Ship (\w+) docked at (\w+)", Level::Critical).with_message("$1 at $2");
        let mut rec = CustomRecognizer::from_specs(&[spec]).unwrap();
        let (_, events) = parse(&mut rec, "Ship Carrack docked at Seraphim");
        assert_eq!(events[0].kind, EventKind::Custom);
        assert_eq!(events[0].level, Level::Critical);
        assert_eq!(events[0].value_str(), Some("Carrack"));
        assert_eq!(events[0].field("message").and_then(|m| m.as_str()), Some("Carrack at Seraphim"));
    }

    #[test]
    fn test_value_defaults_to_line_and_message_fallbacks() {
        let mut spec = CustomPatternSpec::new("Landing", Level::Info);
        spec.name = Some("Pad".to_string());
        spec.color = Some("#00ff00".to_string());
        let (_, events) = parse(&mut CustomRecognizer::from_specs(&[spec]).unwrap(), "Landing granted");
        assert_eq!(events[0].value_str(), Some("Landing granted"));
        assert_eq!(events[0].field("message").and_then(|m| m.as_str()), Some("Pad"));
        assert_eq!(events[0].field("color").and_then(|m| m.as_str()), Some("#00ff00"));

        let rule = CustomRule::compile(CustomPatternSpec::new("x", Level::Info)).unwrap();
        assert_eq!(rule.spec().display_message(), "Custom Match");
    }

    #[test]
    fn test_none_matches_silently() {
        let mut spec = CustomPatternSpec::new("noise", Level::Info);
        spec.event = Some("NONE".to_string());
        let mut rec = CustomRecognizer::from_specs(&[spec, CustomPatternSpec::new("x", Level::Info).with_message("none")]).unwrap();
        let (matched, events) = parse(&mut rec, "noise x");
        assert!(matched);
        assert!(events.is_empty());
    }

    #[test]
    fn test_disabled_never_matches() {
        let mut rec = CustomRecognizer::from_specs(&[CustomPatternSpec::new("a", Level::Info)]).unwrap();
        rec.set_enabled(false);
        assert!(!parse(&mut rec, "a").0);
    }

    #[test]
    fn test_input_is_capped() {
        let rule = CustomRule::compile(CustomPatternSpec::new("END$", Level::Info)).unwrap();
        let long = format!("{}END", "é".repeat(MAX_MATCH_INPUT));
        assert!(rule.apply(&long).is_none());
        assert!(rule.apply("the END").is_some());
    }

    #[test]
    fn test_spec_from_toml_requires_level() {
        let err = toml::from_str::<CustomPatternSpec>(r#"regex = "abc""#).unwrap_err();
        assert!(err.to_string().contains("level"));
        let spec: CustomPatternSpec = toml::from_str("regex = \"abc\"\nlevel = \"CRITICAL\"").unwrap();
        assert_eq!(spec.level, Level::Critical);
        let spec: CustomPatternSpec = toml::from_str("regex = \"abc\"\nlevel = \"warning\"").unwrap();
        assert_eq!(spec.level, Level::Warning);
    }

    #[test]
    fn test_template_substitutes_first_placeholder_only() {
        let spec = CustomPatternSpec::new(r"Beacon (\w+)", Level::Warning).with_message("$1 / $1");
        let rule = CustomRule::compile(spec).unwrap();
        let event = rule.apply("Beacon Citizen42").unwrap().unwrap();
        assert_eq!(event.field("message").and_then(|m| m.as_str()), Some("Citizen42 / $1"));
    }
}
