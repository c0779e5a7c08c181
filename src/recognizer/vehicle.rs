//! Ship boarding and exit tracking.

use std::collections::HashSet;

use super::names::clean_ship_name;
use super::table::group;
use super::{LineContext, PatternTable, Recognizer};
use crate::event::{EventKind, GameEvent};

/// Tracks which ship the player is in.
///
/// The current ship is a single slot: entry sets it and a confirmed exit
/// clears it. The low-confidence "releasing" line only fires as a fallback
/// when a ship is known and nothing else on the line named one.
#[derive(Debug, Clone)]
pub struct VehicleRecognizer {
    patterns: PatternTable,
    current_ship: Option<String>,
    /// Ship rooms already observed during this boarding.
    rooms: HashSet<String>,
}

impl Default for VehicleRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl VehicleRecognizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            patterns: PatternTable::new(&[
                (
                    "ship_room",
                    r"(?i)Fire Area '(Room_(?:Cockpit|SnubBay|Habitation|Tail|Cargo_Hold|Turret|Engineering)[^']*?)'",
                ),
                ("seat_enter", r"SeatEnter\s+'([^']+)'"),
                ("seat_exit", r"SeatExit\s+'([^']+)'"),
                ("vehicle_control", r"<Vehicle Control Flow>"),
                ("vehicle_name", r"for\s+'([^']+)'"),
                ("ship_exit_confirm", r"(?i)<Vehicle Control Flow>.*releasing"),
                (
                    "hangar_state",
                    r"(?i)LoadingPlatformManager.*?ShipElevator.*?Platform state changed to (\w+)",
                ),
                ("spawn_flow", r"<Spawn Flow>"),
                (
                    "spawn_reservation",
                    r"lost\s+reservation\s+for\s+spawnpoint\s+(\S+)\s+\[(\d+)\]",
                ),
            ]),
            current_ship: None,
            rooms: HashSet::new(),
        }
    }

    /// Name of the ship the player is currently in.
    #[must_use]
    pub fn current_ship(&self) -> Option<&str> {
        self.current_ship.as_deref()
    }

    fn board(&mut self, name: String, out: &mut Vec<GameEvent>) {
        self.current_ship = Some(name.clone());
        out.push(GameEvent::new(EventKind::ShipEnter, name));
    }

    fn leave(&mut self, name: String, out: &mut Vec<GameEvent>) {
        self.current_ship = None;
        self.rooms.clear();
        out.push(GameEvent::new(EventKind::ShipExit, name));
    }
}

impl Recognizer for VehicleRecognizer {
    fn name(&self) -> &'static str {
        "vehicle"
    }

    fn patterns(&self) -> &PatternTable {
        &self.patterns
    }

    fn patterns_mut(&mut self) -> &mut PatternTable {
        &mut self.patterns
    }

    fn parse(&mut self, line: &str, _ctx: &LineContext, out: &mut Vec<GameEvent>) -> bool {
        let mut handled = false;

        if let Some(room) = self
            .patterns
            .captures("ship_room", line)
            .and_then(|c| group(&c, 1))
        {
            if self.rooms.insert(room.to_string())
                && room.to_lowercase().contains("cockpit")
                && self.current_ship.is_none()
            {
                self.current_ship = Some("Unknown Ship".to_string());
                out.push(GameEvent::new(EventKind::ShipEnter, "In Ship (Cockpit Detected)"));
            }
            handled = true;
        }

        if let Some(raw) = self
            .patterns
            .captures("seat_enter", line)
            .and_then(|c| group(&c, 1))
        {
            self.board(clean_ship_name(Some(raw)), out);
            handled = true;
        } else if let Some(raw) = self
            .patterns
            .captures("seat_exit", line)
            .and_then(|c| group(&c, 1))
        {
            self.leave(clean_ship_name(Some(raw)), out);
            handled = true;
        }

        if !handled && self.patterns.is_match("vehicle_control", line) {
            if let Some(raw) = self
                .patterns
                .captures("vehicle_name", line)
                .and_then(|c| group(&c, 1))
            {
                let name = clean_ship_name(Some(raw));
                if line.contains("granted") {
                    self.board(name, out);
                } else if line.contains("releasing")
                    && self.current_ship.as_deref() == Some(name.as_str())
                {
                    self.leave(name, out);
                }
                handled = true;
            }
        }

        if let Some(state) = self
            .patterns
            .captures("hangar_state", line)
            .and_then(|c| group(&c, 1))
        {
            out.push(GameEvent::new(EventKind::HangarState, state));
            handled = true;
        }

        if !handled && self.patterns.is_match("ship_exit_confirm", line) {
            if let Some(ship) = self.current_ship.clone() {
                self.leave(ship, out);
                handled = true;
            }
        }

        if self.patterns.is_match("spawn_flow", line) {
            if let Some(point) = self
                .patterns
                .captures("spawn_reservation", line)
                .and_then(|c| group(&c, 1))
            {
                out.push(GameEvent::new(EventKind::SpawnSet, point.replace('_', " ")));
                handled = true;
            }
        }

        handled
    }

    fn reset(&mut self) {
        self.current_ship = None;
        self.rooms.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(rec: &mut VehicleRecognizer, line: &str) -> Vec<GameEvent> {
        let mut out = Vec::new();
        rec.parse(line, &LineContext::now(), &mut out);
        out
    }

    #[test]
    fn test_seat_enter_and_exit() {
        let mut rec = VehicleRecognizer::new();
        let events = run(&mut rec, "<SeatEnter> SeatEnter 'AEGS_Gladius_9490661802904'");
        assert_eq!(events[0].kind, EventKind::ShipEnter);
        assert_eq!(events[0].value_str(), Some("Aegis Gladius"));
        assert_eq!(rec.current_ship(), Some("Aegis Gladius"));

        let events = run(&mut rec, "SeatExit 'AEGS_Gladius_9490661802904'");
        assert_eq!(events[0].kind, EventKind::ShipExit);
        assert_eq!(rec.current_ship(), None);
    }

    #[test]
    fn test_control_flow_release_requires_same_ship() {
        let mut rec = VehicleRecognizer::new();
        run(&mut rec, "<Vehicle Control Flow> control granted for 'DRAK_Cutlass_Black_123'");
        assert_eq!(rec.current_ship(), Some("Drake Cutlass Black"));

        let events = run(&mut rec, "<Vehicle Control Flow> releasing for 'ANVL_Arrow_55'");
        assert!(events.is_empty());
        assert_eq!(rec.current_ship(), Some("Drake Cutlass Black"));

        let events = run(&mut rec, "<Vehicle Control Flow> releasing for 'DRAK_Cutlass_Black_123'");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::ShipExit);
    }

    #[test]
    fn test_releasing_fallback_only_without_name() {
        let mut rec = VehicleRecognizer::new();
        assert!(run(&mut rec, "<Vehicle Control Flow> releasing control").is_empty());

        run(&mut rec, "SeatEnter 'MISC_Prospector'");
        let events = run(&mut rec, "<Vehicle Control Flow> releasing control");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value_str(), Some("MISC Prospector"));
        assert!(run(&mut rec, "<Vehicle Control Flow> releasing control").is_empty());
    }

    #[test]
    fn test_cockpit_room_boards_once() {
        let mut rec = VehicleRecognizer::new();
        let line = "Fire Area 'Room_Cockpit_AN_Room' registered";
        let events = run(&mut rec, line);
        assert_eq!(events[0].value_str(), Some("In Ship (Cockpit Detected)"));
        assert!(run(&mut rec, line).is_empty());
    }

    #[test]
    fn test_hangar_state_and_spawn() {
        let mut rec = VehicleRecognizer::new();
        let events = run(
            &mut rec,
            "Loading Platform Manager [LoadingPlatformManager_ShipElevator_HangarXLTop] Platform state changed to OpeningLoadingGate",
        );
        assert_eq!(events[0].kind, EventKind::HangarState);
        assert_eq!(events[0].value_str(), Some("OpeningLoadingGate"));

        let events = run(
            &mut rec,
            "<Spawn Flow> Player lost reservation for spawnpoint Bed_Hab_02 [2011] at location 77",
        );
        assert_eq!(events[0].kind, EventKind::SpawnSet);
        assert_eq!(events[0].value_str(), Some("Bed Hab 02"));
    }

    #[test]
    fn test_reset_forgets_ship() {
        let mut rec = VehicleRecognizer::new();
        run(&mut rec, "SeatEnter 'RSI_Aurora_MR'");
        rec.reset();
        assert_eq!(rec.current_ship(), None);
    }
}
