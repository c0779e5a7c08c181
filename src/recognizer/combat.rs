//! Deaths, vehicle destruction, environmental hazards and CrimeStat.

use std::time::{Duration, Instant};

use serde_json::{json, Value};

use super::fields::{parse_number, record};
use super::names::clean_ship_name;
use super::table::group;
use super::{LineContext, PatternTable, Recognizer};
use crate::event::{EventKind, GameEvent, Level};

/// Deaths this close to a vehicle destruction are reported as its crew.
pub const CREW_WINDOW: Duration = Duration::from_millis(500);

/// Minimum spacing between two fire alerts.
pub const FIRE_DEDUP: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Default)]
struct CombatState {
    /// `(victim, seen_at)` for deaths inside the crew window.
    recent_deaths: Vec<(String, Instant)>,
    last_fire: Option<Instant>,
}

impl CombatState {
    fn prune(&mut self, now: Instant) {
        self.recent_deaths
            .retain(|(_, seen)| now.saturating_duration_since(*seen) < CREW_WINDOW);
    }

    fn record_death(&mut self, victim: &str, now: Instant) {
        self.prune(now);
        self.recent_deaths.push((victim.to_string(), now));
    }

    fn crew(&mut self, now: Instant) -> Vec<String> {
        self.prune(now);
        self.recent_deaths.iter().map(|(v, _)| v.clone()).collect()
    }
}

/// Recognizes combat and hazard lines.
#[derive(Debug, Clone)]
pub struct CombatRecognizer {
    patterns: PatternTable,
    state: CombatState,
}

impl Default for CombatRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

fn text(value: Option<&str>) -> Option<Value> {
    value.map(Value::from)
}

impl CombatRecognizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            patterns: PatternTable::new(&[
                ("actor_death", r"<Actor Death>"),
                (
                    "death_detailed",
                    r"(?i)<Actor Death>.*?'([^']+)'(?:\s*\[\d+\])?.*?killed by\s+'([^']+)'(?:\s*\[\d+\])?.*?using\s+'([^']+)'(?:.*?damage type\s+'([^']+)')?",
                ),
                ("death_zone", r"(?i)in zone\s+'([^']+)'"),
                (
                    "death_direction",
                    r"(?i)from direction\s+x:\s*([-\d.]+),?\s*y:\s*([-\d.]+),?\s*z:\s*([-\d.]+)",
                ),
                (
                    "actor_state_dead",
                    r"(?i)<\[ActorState\] Dead>.*?Actor '([^']+)'\s*\[\d+\].*?from zone '([^']+)'\s*\[\d+\].*?to zone '([^']+)'",
                ),
                ("vehicle_destruction", r"<Vehicle Destruction>"),
                (
                    "vehicle_destruction_detail",
                    r"(?i)<Vehicle Destruction>.*?Vehicle\s+'([^']+)'\s*\[\d+\].*?driven by\s+'([^']+)'\s*\[\d+\].*?from destroy level\s+(\d+)\s+to\s+(\d+).*?caused by\s+'([^']+)'",
                ),
                ("suffocating", r"(?i)Player.*started suffocating"),
                ("depressurizing", r"(?i)Player.*started depressurization"),
                (
                    "fire_actual",
                    r"(?i)<Fire Client - Snapshot Request> Fire Area '([^']+)'.*Similarity: [\d.]+ dB",
                ),
                ("crimestat", r"(?i)CrimeStat Rating (Increased|Decreased)"),
                (
                    "medical_dropoff",
                    r"(?i)DropoffLocation_BP\[Destination\],\s+locations:\s+\(([^\]\[]+)\s+\[([^\]]+)\]\)",
                ),
                ("medical_bed", r"[Mm]edical\s*[Bb]ed|[Mm]edBed|[Rr]egeneration\s*[Pp]od"),
            ]),
            state: CombatState::default(),
        }
    }

    fn parse_actor_death(&mut self, line: &str, now: Instant, out: &mut Vec<GameEvent>) {
        let Some(caps) = self.patterns.captures("death_detailed", line) else {
            out.push(GameEvent::new(EventKind::Status, "death").with_level(Level::Critical));
            return;
        };
        let victim = group(&caps, 1).unwrap_or_default();
        let zone = self
            .patterns
            .captures("death_zone", line)
            .and_then(|c| group(&c, 1));
        let direction = self.patterns.captures("death_direction", line).and_then(|c| {
            let axis = |i| group(&c, i).and_then(parse_number);
            Some(json!({ "x": axis(1)?, "y": axis(2)?, "z": axis(3)? }))
        });

        let details = record(&[
            ("victim", text(Some(victim))),
            ("killer", text(group(&caps, 2))),
            ("weapon", text(group(&caps, 3))),
            ("damageType", text(group(&caps, 4))),
            ("zone", text(zone)),
            ("direction", direction),
        ]);
        out.push(
            GameEvent::new(EventKind::Death, "Killed")
                .with_level(Level::Critical)
                .with_field("details", details),
        );
        self.state.record_death(victim, now);
    }

    fn parse_vehicle_destruction(&mut self, line: &str, now: Instant, out: &mut Vec<GameEvent>) {
        let Some(caps) = self.patterns.captures("vehicle_destruction_detail", line) else {
            out.push(GameEvent::new(EventKind::VehicleDeath, "Vehicle Destroyed").with_level(Level::Critical));
            return;
        };
        let vehicle = group(&caps, 1).unwrap_or_default();
        let level = |i| group(&caps, i).and_then(|v| v.parse::<u8>().ok());
        let from_level = level(3);
        let to_level = level(4);
        let total_loss = to_level.is_some_and(|l| l >= 2);
        let zone = self
            .patterns
            .captures("death_zone", line)
            .and_then(|c| group(&c, 1));

        let details = record(&[
            ("vehicle", Some(Value::from(clean_ship_name(Some(vehicle))))),
            ("vehicleRaw", text(Some(vehicle))),
            ("driver", text(group(&caps, 2))),
            ("attacker", text(group(&caps, 5))),
            ("fromLevel", from_level.map(Value::from)),
            ("toLevel", to_level.map(Value::from)),
            ("isTotalLoss", Some(Value::from(total_loss))),
            ("zone", text(zone)),
            ("crewDeaths", Some(Value::from(self.state.crew(now)))),
        ]);
        let (value, level) = if total_loss {
            ("Ship Destroyed", Level::Critical)
        } else {
            ("Ship Crippled", Level::Warning)
        };
        out.push(
            GameEvent::new(EventKind::VehicleDestruction, value)
                .with_level(level)
                .with_field("details", details),
        );
        if total_loss {
            out.push(GameEvent::new(EventKind::VehicleDeath, "Critical Failure").with_level(Level::Critical));
        }
    }
}

impl Recognizer for CombatRecognizer {
    fn name(&self) -> &'static str {
        "combat"
    }

    fn patterns(&self) -> &PatternTable {
        &self.patterns
    }

    fn patterns_mut(&mut self) -> &mut PatternTable {
        &mut self.patterns
    }

    fn parse(&mut self, line: &str, ctx: &LineContext, out: &mut Vec<GameEvent>) -> bool {
        let mut handled = false;

        if self.patterns.is_match("actor_death", line) {
            self.parse_actor_death(line, ctx.now, out);
            handled = true;
        }

        if let Some(caps) = self.patterns.captures("actor_state_dead", line) {
            let victim = group(&caps, 1).unwrap_or_default();
            let details = json!({
                "victim": victim,
                "killer": "Unknown",
                "weapon": "Unknown",
                "damageType": "Unknown",
                "zone": group(&caps, 3),
                "fromZone": group(&caps, 2),
            });
            out.push(
                GameEvent::new(EventKind::Death, "Killed")
                    .with_level(Level::Critical)
                    .with_field("details", details),
            );
            self.state.record_death(victim, ctx.now);
            handled = true;
        }

        if self.patterns.is_match("vehicle_destruction", line) {
            self.parse_vehicle_destruction(line, ctx.now, out);
            handled = true;
        }

        if self.patterns.is_match("suffocating", line) {
            out.push(GameEvent::new(EventKind::Status, "suffocating").with_level(Level::Critical));
            handled = true;
        }
        if self.patterns.is_match("depressurizing", line) {
            out.push(GameEvent::new(EventKind::Status, "depressurizing").with_level(Level::Critical));
            handled = true;
        }

        if let Some(room) = self
            .patterns
            .captures("fire_actual", line)
            .and_then(|c| group(&c, 1))
        {
            let due = self
                .state
                .last_fire
                .map_or(true, |last| ctx.now.saturating_duration_since(last) > FIRE_DEDUP);
            if due {
                self.state.last_fire = Some(ctx.now);
                out.push(
                    GameEvent::new(EventKind::HazardFire, "Fire onboard!")
                        .with_level(Level::Critical)
                        .with_field("room", room),
                );
            }
            handled = true;
        }

        if let Some(direction) = self
            .patterns
            .captures("crimestat", line)
            .and_then(|c| group(&c, 1))
        {
            let direction = direction.to_uppercase();
            let increased = direction == "INCREASED";
            out.push(
                GameEvent::new(EventKind::Status, format!("CRIMESTAT {direction}"))
                    .with_level(if increased { Level::Critical } else { Level::Info }),
            );
            if increased {
                out.push(GameEvent::new(EventKind::CrimeUpdate, "WANTED LEVEL INCREASED").with_level(Level::Critical));
            }
            handled = true;
        }

        if let Some(clinic) = self
            .patterns
            .captures("medical_dropoff", line)
            .and_then(|c| group(&c, 1))
        {
            out.push(
                GameEvent::new(EventKind::Status, format!("RESPAWN SET: {}", clinic.trim()))
                    .with_subtype("respawn"),
            );
            handled = true;
        }

        if self.patterns.is_match("medical_bed", line) {
            out.push(GameEvent::new(EventKind::MedicalBed, "entered"));
            handled = true;
        }

        handled
    }

    fn reset(&mut self) {
        self.state = CombatState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_at(rec: &mut CombatRecognizer, line: &str, now: Instant) -> Vec<GameEvent> {
        let mut out = Vec::new();
        rec.parse(line, &LineContext::at(now), &mut out);
        out
    }

    #[test]
    fn test_minimal_actor_death() {
        let mut rec = CombatRecognizer::new();
        let events = run_at(
            &mut rec,
            "<Actor Death> CActor::Kill: 'A' killed by 'B' using 'W'",
            Instant::now(),
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Death);
        assert_eq!(
            events[0].field("details"),
            Some(&json!({ "victim": "A", "killer": "B", "weapon": "W" }))
        );
    }

    #[test]
    fn test_detailed_actor_death() {
        let mut rec = CombatRecognizer::new();
        let line = "<Actor Death> CActor::Kill: 'Pilot' [201] in zone 'Stanton_Crusader' killed by 'Pirate' [202] using 'KLWE_LaserRepeater_S3' [Class X] with damage type 'Energy' from direction x: 1.5, y: -2, z: 0";
        let events = run_at(&mut rec, line, Instant::now());
        let details = events[0].field("details").unwrap();
        assert_eq!(details["damageType"], "Energy");
        assert_eq!(details["zone"], "Stanton_Crusader");
        assert_eq!(details["direction"]["y"], -2.0);
    }

    #[test]
    fn test_unparsed_actor_death_falls_back_to_status() {
        let mut rec = CombatRecognizer::new();
        let events = run_at(&mut rec, "<Actor Death> something odd", Instant::now());
        assert_eq!(events[0].kind, EventKind::Status);
        assert_eq!(events[0].value_str(), Some("death"));
    }

    #[test]
    fn test_vehicle_destruction_collects_crew_inside_window() {
        let mut rec = CombatRecognizer::new();
        let t0 = Instant::now();
        run_at(&mut rec, "<Actor Death> 'Gunner' killed by 'X' using 'Y'", t0);
        let line = "<Vehicle Destruction> CVehicle::OnAdvanceDestroyLevel: Vehicle 'ANVL_Paladin_1234567890123' [55] in zone 'space' driven by 'Pilot' [11] advanced from destroy level 1 to 2 caused by 'Pirate' [66]";
        let events = run_at(&mut rec, line, t0 + Duration::from_millis(200));
        assert_eq!(events.len(), 2);
        let details = events[0].field("details").unwrap();
        assert_eq!(events[0].value_str(), Some("Ship Destroyed"));
        assert_eq!(details["vehicle"], "Anvil Paladin");
        assert_eq!(details["vehicleRaw"], "ANVL_Paladin_1234567890123");
        assert_eq!(details["crewDeaths"], json!(["Gunner"]));
        assert_eq!(events[1].kind, EventKind::VehicleDeath);

        let events = run_at(&mut rec, line, t0 + Duration::from_millis(900));
        assert_eq!(events[0].field("details").unwrap()["crewDeaths"], json!([]));
    }

    #[test]
    fn test_crippled_vehicle_has_no_legacy_death() {
        let mut rec = CombatRecognizer::new();
        let line = "<Vehicle Destruction> Vehicle 'DRAK_Cutter' [1] driven by 'P' [2] advanced from destroy level 0 to 1 caused by 'Q' [3]";
        let events = run_at(&mut rec, line, Instant::now());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value_str(), Some("Ship Crippled"));
    }

    #[test]
    fn test_hazards() {
        let mut rec = CombatRecognizer::new();
        let events = run_at(&mut rec, "Player 'A' started suffocating", Instant::now());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value_str(), Some("suffocating"));
        let events = run_at(&mut rec, "Player 'A' started depressurization", Instant::now());
        assert_eq!(events[0].value_str(), Some("depressurizing"));
    }

    #[test]
    fn test_fire_is_deduplicated_for_ten_seconds() {
        let mut rec = CombatRecognizer::new();
        let line = "<Fire Client - Snapshot Request> Fire Area 'Room_Cockpit' Similarity: 12.5 dB";
        let t0 = Instant::now();
        assert_eq!(run_at(&mut rec, line, t0).len(), 1);
        assert!(run_at(&mut rec, line, t0 + Duration::from_secs(5)).is_empty());
        assert_eq!(run_at(&mut rec, line, t0 + Duration::from_secs(11)).len(), 1);
    }

    #[test]
    fn test_crimestat() {
        let mut rec = CombatRecognizer::new();
        let events = run_at(&mut rec, "CrimeStat Rating Increased", Instant::now());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].value_str(), Some("CRIMESTAT INCREASED"));
        assert_eq!(events[0].level, Level::Critical);
        assert_eq!(events[1].kind, EventKind::CrimeUpdate);
        let events = run_at(&mut rec, "CrimeStat Rating Decreased", Instant::now());
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_actor_state_dead() {
        let mut rec = CombatRecognizer::new();
        let line = "<[ActorState] Dead> [ACTOR STATE][CSCActorControlStateDead::PrePhysicsUpdate] Actor 'TypicallyBrit_ish' [204269884415] ejected from zone 'AEGS_Gladius_9490661802904' [9490661802904] to zone 'OOC_Stanton_2b_Daymar' [9431957087341]";
        let events = run_at(&mut rec, line, Instant::now());
        let details = events[0].field("details").unwrap();
        assert_eq!(details["fromZone"], "AEGS_Gladius_9490661802904");
        assert_eq!(details["zone"], "OOC_Stanton_2b_Daymar");
    }

    #[test]
    fn test_medical_bed_entered() {
        let mut rec = CombatRecognizer::new();
        let now = Instant::now();
        let events = run_at(&mut rec, "<CEntityComponentMedBed::OnEnter> player entered MedBed_Tier2", now);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::MedicalBed);
        assert_eq!(run_at(&mut rec, "Regeneration Pod occupied", now)[0].value_str(), Some("entered"));
    }
}
