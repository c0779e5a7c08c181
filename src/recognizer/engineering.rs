//! Power plant, cooler and fuse lines.

use serde_json::Value;

use super::fields::{number_value, record, Tags};
use super::{LineContext, PatternTable, Recognizer};
use crate::event::{EventKind, GameEvent, Level};

#[derive(Debug, Clone)]
pub struct EngineeringRecognizer {
    patterns: PatternTable,
    tags: Tags,
}

impl Default for EngineeringRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineeringRecognizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            patterns: PatternTable::new(&[
                ("power_state", r"<PowerPlant::SetState>"),
                ("cooler_temp", r"<Cooler::OnTemperatureChange>"),
                ("fuse_break", r"<Fuse::OnBreak>"),
            ]),
            tags: Tags::new(&["State", "Output", "Temperature", "Room", "ID"]),
        }
    }
}

impl Recognizer for EngineeringRecognizer {
    fn name(&self) -> &'static str {
        "engineering"
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

        if self.patterns.is_match("power_state", line) {
            if let Some(state) = tags.text("State", line) {
                let value = record(&[
                    ("state", Some(Value::from(state))),
                    ("output", tags.number("Output", line).map(number_value)),
                ]);
                out.push(GameEvent::new(EventKind::Engineering, value).with_subtype("POWER"));
                handled = true;
            }
        }

        if self.patterns.is_match("cooler_temp", line) {
            if let Some(temperature) = tags.number("Temperature", line) {
                let value = record(&[("temperature", Some(number_value(temperature)))]);
                out.push(GameEvent::new(EventKind::Engineering, value).with_subtype("COOLER"));
                handled = true;
            }
        }

        if self.patterns.is_match("fuse_break", line) {
            let value = record(&[
                ("room", Some(Value::from(tags.text("Room", line).unwrap_or("Unknown")))),
                ("component", Some(Value::from(tags.text("ID", line).unwrap_or("Unknown")))),
            ]);
            out.push(
                GameEvent::new(EventKind::Engineering, value)
                    .with_subtype("FUSE_BREAK")
                    .with_level(Level::Warning),
            );
            handled = true;
        }

        handled
    }
}
