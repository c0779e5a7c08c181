//! Armistice and monitored-space transitions.

use super::{LineContext, PatternTable, Recognizer};
use crate::event::{EventKind, GameEvent};

/// `(pattern name, regex, emitted value)`; only the first match fires.
const TRANSITIONS: &[(&str, &str, &str)] = &[
    (
        "armistice_enter",
        r#"(?i)Notification "You have entered an Armistice Zone"|<RulesetManager>.*Entered Armistice Zone"#,
        "armistice_enter",
    ),
    (
        "armistice_leave",
        r#"(?i)Notification "You have left an Armistice Zone"|<RulesetManager>.*Left Armistice Zone"#,
        "armistice_leave",
    ),
    ("monitored_enter", r#"(?i)Notification "Entered Monitored Space"#, "monitored_enter"),
    ("monitored_leave", r#"(?i)Notification "Left Monitored Space"#, "monitored_leave"),
];

/// Recognizes security zone changes.
#[derive(Debug, Clone)]
pub struct ZoneRecognizer {
    patterns: PatternTable,
}

impl Default for ZoneRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ZoneRecognizer {
    #[must_use]
    pub fn new() -> Self {
        let specs: Vec<(&str, &str)> = TRANSITIONS.iter().map(|(n, p, _)| (*n, *p)).collect();
        Self {
            patterns: PatternTable::new(&specs),
        }
    }
}

impl Recognizer for ZoneRecognizer {
    fn name(&self) -> &'static str {
        "zone"
    }

    fn patterns(&self) -> &PatternTable {
        &self.patterns
    }

    fn patterns_mut(&mut self) -> &mut PatternTable {
        &mut self.patterns
    }

    fn parse(&mut self, line: &str, _ctx: &LineContext, out: &mut Vec<GameEvent>) -> bool {
        let Some((_, _, value)) = TRANSITIONS
            .iter()
            .find(|(name, _, _)| self.patterns.is_match(name, line))
        else {
            return false;
        };
        out.push(GameEvent::new(EventKind::Zone, *value));
        true
    }
}
