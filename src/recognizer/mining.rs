//! Mining laser, fracture and extraction lines.

use serde_json::Value;

use super::fields::{number_value, record, Tags};
use super::{LineContext, PatternTable, Recognizer};
use crate::event::{EventKind, GameEvent};

/// Recognizes mining activity.
#[derive(Debug, Clone)]
pub struct MiningRecognizer {
    patterns: PatternTable,
    tags: Tags,
}

impl Default for MiningRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn on_off(active: Option<bool>) -> Option<Value> {
    active.map(|on| Value::from(if on { "ON" } else { "OFF" }))
}

impl MiningRecognizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            patterns: PatternTable::new(&[
                ("laser_activation", r"<MiningLaser::SetLaserActive>"),
                ("fracture_event", r"<MiningFracture::OnFracture>"),
                ("extraction_event", r"<MiningExtraction::OnExtraction>"),
            ]),
            tags: Tags::new(&["Active", "Success", "Mass", "Amount", "Material"]),
        }
    }
}

impl Recognizer for MiningRecognizer {
    fn name(&self) -> &'static str {
        "mining"
    }

    fn patterns(&self) -> &PatternTable {
        &self.patterns
    }

    fn patterns_mut(&mut self) -> &mut PatternTable {
        &mut self.patterns
    }

    fn parse(&mut self, line: &str, _ctx: &LineContext, out: &mut Vec<GameEvent>) -> bool {
        let mut handled = false;
        let tags = &self.tags;

        if self.patterns.is_match("laser_activation", line) {
            let value = record(&[("state", on_off(tags.flag("Active", line)))]);
            out.push(GameEvent::new(EventKind::Mining, value).with_subtype("LASER"));
            handled = true;
        }

        if self.patterns.is_match("fracture_event", line) {
            let value = record(&[
                ("success", tags.flag("Success", line).map(Value::from)),
                ("mass", tags.number("Mass", line).map(number_value)),
            ]);
            out.push(GameEvent::new(EventKind::Mining, value).with_subtype("FRACTURE"));
            handled = true;
        }

        if self.patterns.is_match("extraction_event", line) {
            let value = record(&[
                ("material", tags.text("Material", line).map(Value::from)),
                ("amount", tags.number("Amount", line).map(number_value)),
            ]);
            out.push(GameEvent::new(EventKind::Mining, value).with_subtype("EXTRACTION"));
            handled = true;
        }

        handled
    }
}
