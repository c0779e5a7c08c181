//! Salvage beam and scraping lines.

use serde_json::Value;

use super::fields::{number_value, record, Tags};
use super::mining::on_off;
use super::{LineContext, PatternTable, Recognizer};
use crate::event::{EventKind, GameEvent};

#[derive(Debug, Clone)]
pub struct SalvageRecognizer {
    patterns: PatternTable,
    tags: Tags,
}

impl Default for SalvageRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SalvageRecognizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            patterns: PatternTable::new(&[
                ("beam_activation", r"<SalvageBeam::SetBeamActive>"),
                ("material_scrape", r"<SalvageMaterial::OnScrape>"),
                ("rmc_collection", r"<Salvage::OnRMCCollected>"),
            ]),
            tags: Tags::new(&["Active", "Amount", "Type"]),
        }
    }
}

impl Recognizer for SalvageRecognizer {
    fn name(&self) -> &'static str {
        "salvage"
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

        if self.patterns.is_match("beam_activation", line) {
            let value = record(&[("state", on_off(tags.flag("Active", line)))]);
            out.push(GameEvent::new(EventKind::Salvage, value).with_subtype("BEAM"));
            handled = true;
        }

        for (pattern, subtype) in [("material_scrape", "SCRAPE"), ("rmc_collection", "RMC")] {
            if self.patterns.is_match(pattern, line) {
                let value = record(&[
                    ("amount", tags.number("Amount", line).map(number_value)),
                    ("material", tags.text("Type", line).map(Value::from)),
                ]);
                out.push(GameEvent::new(EventKind::Salvage, value).with_subtype(subtype));
                handled = true;
            }
        }

        handled
    }
}
