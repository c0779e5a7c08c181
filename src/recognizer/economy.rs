//! Shop purchases, insurance claims and fines.

use serde_json::Value;

use super::fields::{number_value, parse_number, record, Tags};
use super::table::group;
use super::{LineContext, PatternTable, Recognizer};
use crate::event::{EventKind, GameEvent, Level};

/// Recognizes economy lines.
#[derive(Debug, Clone)]
pub struct EconomyRecognizer {
    patterns: PatternTable,
    tags: Tags,
}

impl Default for EconomyRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl EconomyRecognizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            patterns: PatternTable::new(&[
                ("shop_purchase", r"<ShopPurchase>"),
                ("insurance_claim", r"<InsuranceClaim>"),
                ("fine", r"<Fine>"),
                ("item_quoted", r"(?i)Item\s+'([^']+)'"),
                ("cost_plain", r"(?i)\bCost\s+([\d.,]+)"),
                ("amount_plain", r"(?i)\bAmount\s+([\d.,]+)"),
            ]),
            tags: Tags::new(&["Item", "Cost", "Amount", "Quantity"]),
        }
    }

    /// A numeric field written either as `Key[value]` or `Key value`.
    fn number(&self, tag: &str, plain: &str, line: &str) -> Option<Value> {
        self.tags
            .number(tag, line)
            .or_else(|| {
                self.patterns
                    .captures(plain, line)
                    .and_then(|c| group(&c, 1))
                    .and_then(parse_number)
            })
            .map(number_value)
    }
}

impl Recognizer for EconomyRecognizer {
    fn name(&self) -> &'static str {
        "economy"
    }

    fn patterns(&self) -> &PatternTable {
        &self.patterns
    }

    fn patterns_mut(&mut self) -> &mut PatternTable {
        &mut self.patterns
    }

    fn parse(&mut self, line: &str, _ctx: &LineContext, out: &mut Vec<GameEvent>) -> bool {
        let mut handled = false;

        if self.patterns.is_match("shop_purchase", line) {
            let item = self
                .patterns
                .captures("item_quoted", line)
                .and_then(|c| group(&c, 1))
                .or_else(|| self.tags.text("Item", line));
            let cost = self.number("Cost", "cost_plain", line);
            let quantity = self.tags.number("Quantity", line).map(number_value);
            let value = if item.is_none() && cost.is_none() {
                Value::from("purchase")
            } else {
                record(&[
                    ("item", item.map(Value::from)),
                    ("cost", cost),
                    ("quantity", quantity),
                ])
            };
            out.push(GameEvent::new(EventKind::Economy, value).with_subtype("PURCHASE"));
            handled = true;
        }

        if self.patterns.is_match("insurance_claim", line) {
            out.push(GameEvent::new(EventKind::Economy, "insurance_claim").with_subtype("INSURANCE_CLAIM"));
            handled = true;
        }

        if self.patterns.is_match("fine", line) {
            let amount = self.number("Amount", "amount_plain", line);
            out.push(
                GameEvent::new(EventKind::Economy, record(&[("amount", amount)]))
                    .with_subtype("FINE")
                    .with_level(Level::Warning),
            );
            handled = true;
        }

        handled
    }
}
