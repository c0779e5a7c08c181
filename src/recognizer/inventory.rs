//! Attachment and inventory management lines.

use serde_json::json;

use super::table::group;
use super::{LineContext, PatternTable, Recognizer};
use crate::event::{EventKind, GameEvent, Level};

#[derive(Debug, Clone)]
pub struct InventoryRecognizer {
    patterns: PatternTable,
}

impl Default for InventoryRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl InventoryRecognizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            patterns: PatternTable::new(&[
                (
                    "attachment_received",
                    r"(?i)<([^>]+)>\s+\[[^\]]+\]\s+<AttachmentReceived>\s+Player\[([^\]]+)\]\s+Attachment\[([^,\]]+),\s*([^,\]]+),\s*([^\]]+)\].*?Port\[([^\]]+)\]",
                ),
                (
                    "inventory_management",
                    r"(?i)<InventoryManagement>\s+Request\[(\d+)\]\s+for\s+'([^']+)'\s+\[\d+\]\s+Result\[(\w+)\]",
                ),
            ]),
        }
    }
}

impl Recognizer for InventoryRecognizer {
    fn name(&self) -> &'static str {
        "inventory"
    }

    fn patterns(&self) -> &PatternTable {
        &self.patterns
    }

    fn patterns_mut(&mut self) -> &mut PatternTable {
        &mut self.patterns
    }

    fn parse(&mut self, line: &str, _ctx: &LineContext, out: &mut Vec<GameEvent>) -> bool {
        if let Some(caps) = self.patterns.captures("attachment_received", line) {
            let value = json!({
                "timestamp": group(&caps, 1),
                "player": group(&caps, 2),
                "attachmentId": group(&caps, 3),
                "archetype": group(&caps, 4),
                "numericId": group(&caps, 5),
                "port": group(&caps, 6),
            });
            out.push(GameEvent::new(EventKind::AttachmentReceived, value).with_raw(line));
            return true;
        }

        if let Some(caps) = self.patterns.captures("inventory_management", line) {
            let player = group(&caps, 2).unwrap_or_default();
            let succeeded = group(&caps, 3).is_some_and(|r| r.eq_ignore_ascii_case("succeed"));
            let (value, level) = if succeeded {
                ("Inventory Updated", Level::Info)
            } else {
                ("Inventory Action Failed", Level::Warning)
            };
            out.push(
                GameEvent::new(EventKind::Inventory, value)
                    .with_level(level)
                    .with_field("player", player),
            );
            return true;
        }

        false
    }
}
