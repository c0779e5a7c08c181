//! Hangar elevator timing, landing services and docking.

use super::table::group;
use super::{LineContext, PatternTable, Recognizer};
use crate::event::{EventKind, GameEvent};

/// Recognizes hangar platform lines.
#[derive(Debug, Clone)]
pub struct HangarRecognizer {
    patterns: PatternTable,
}

impl Default for HangarRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Collapse a raw platform state into `TRANSIT`, `READY` or `CLOSED`.
fn platform_phase(state: &str) -> &'static str {
    if state.starts_with("Moving") {
        "TRANSIT"
    } else if state == "OpenIdle" {
        "READY"
    } else {
        "CLOSED"
    }
}

impl HangarRecognizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            patterns: PatternTable::new(&[
                (
                    "platform_state",
                    r"(?i)<CSCLoadingPlatformManager::TransitionLightGroupState>.*platform manager \[?'?([^'\]]+)'?\]?.*state:\s+(\w+)",
                ),
                ("atc_assigned", r#"(?i)Notification "Landing pad ([^"]+) assigned""#),
                ("hangar_request", r"local equip request"),
                ("docking_request", r"[Dd]ocking.*[Rr]equest(?:ed)?|[Rr]equest.*[Dd]ocking"),
                ("docking_granted", r"[Dd]ocking.*[Gg]ranted"),
            ]),
        }
    }
}

impl Recognizer for HangarRecognizer {
    fn name(&self) -> &'static str {
        "hangar"
    }

    fn patterns(&self) -> &PatternTable {
        &self.patterns
    }

    fn patterns_mut(&mut self) -> &mut PatternTable {
        &mut self.patterns
    }

    fn parse(&mut self, line: &str, _ctx: &LineContext, out: &mut Vec<GameEvent>) -> bool {
        let mut handled = false;

        if let Some(caps) = self.patterns.captures("platform_state", line) {
            if let (Some(manager), Some(state)) = (group(&caps, 1), group(&caps, 2)) {
                if manager.contains("ShipElevator") {
                    out.push(
                        GameEvent::new(EventKind::HangarState, platform_phase(state))
                            .with_field("manager", manager)
                            .with_field("rawState", state),
                    );
                    handled = true;
                }
            }
        }

        if let Some(pad) = self
            .patterns
            .captures("atc_assigned", line)
            .and_then(|c| group(&c, 1))
        {
            out.push(GameEvent::new(EventKind::HangarAssigned, pad));
            handled = true;
        }

        if self.patterns.is_match("hangar_request", line) {
            out.push(GameEvent::new(EventKind::HangarRequest, "Landing Services"));
            handled = true;
        }

        // A line naming both is a request.
        if self.patterns.is_match("docking_request", line) {
            out.push(GameEvent::new(EventKind::Docking, "requested"));
            handled = true;
        } else if self.patterns.is_match("docking_granted", line) {
            out.push(GameEvent::new(EventKind::Docking, "granted"));
            handled = true;
        }

        handled
    }
}
