//! Location, quantum travel and location-hint recognition.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::names::{squash_spaces, title_case};
use super::table::group;
use super::{LineContext, PatternTable, Recognizer};
use crate::event::{EventKind, GameEvent};

/// A user-defined name for a raw location identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocationAlias {
    /// Display name only.
    Name(String),
    /// Display name with optional system and zone overrides (`"Auto"`
    /// means no override).
    Detailed {
        name: String,
        #[serde(default)]
        zone: Option<String>,
        #[serde(default)]
        system: Option<String>,
    },
}

impl LocationAlias {
    fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Detailed { name, .. } => name,
        }
    }

    fn zone(&self) -> Option<&str> {
        match self {
            Self::Detailed { zone: Some(z), .. } if z != "Auto" => Some(z),
            _ => None,
        }
    }

    fn system(&self) -> Option<&str> {
        match self {
            Self::Detailed { system: Some(s), .. } if s != "Auto" => Some(s),
            _ => None,
        }
    }
}

/// Quantum drive state. Only the latest transition is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantumState {
    Entered,
    Exited,
    Arrived,
}

impl QuantumState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Entered => "entered",
            Self::Exited => "exited",
            Self::Arrived => "arrived",
        }
    }
}

/// Built-in raw location names with a fixed display name.
const BUILTIN_LOCATIONS: &[(&str, &str)] = &[
    ("Stanton1_Lorville", "Lorville"),
    ("Stanton1_Hurston", "Hurston"),
    ("Stanton2_Crusader", "Crusader"),
    ("Stanton2_Orison", "Orison"),
    ("Stanton3_ArcCorp", "ArcCorp"),
    ("Stanton3_Area18", "Area 18"),
    ("Stanton4_Microtech", "Microtech"),
    ("Stanton4_NewBabbage", "New Babbage"),
    ("Stanton_PortOlisar", "Port Olisar"),
    ("Stanton_EverusHarbor", "Everus Harbor"),
    ("Stanton_PortTressler", "Port Tressler"),
    ("Stanton_BaijiniPoint", "Baijini Point"),
    ("Stanton_SeraphimStation", "Seraphim Station"),
];

/// Object-container folder names with a fixed display name.
const HINT_NAMES: &[(&str, &str)] = &[
    ("area18", "Area 18"),
    ("lorville", "Lorville"),
    ("new_babbage", "New Babbage"),
    ("orison", "Orison"),
    ("seraphim_station", "Seraphim Station"),
    ("port_tressler", "Port Tressler"),
    ("everus_harbor", "Everus Harbor"),
    ("baijini_point", "Baijini Point"),
    ("astroarmada", "Astro Armada"),
    ("dumper", "Dumpers Depot"),
    ("casaba", "Casaba Outlet"),
    ("galleria", "Galleria"),
    ("admin_office", "Admin Office"),
    ("centermass", "Center Mass"),
    ("platinumbay", "Platinum Bay"),
    ("hospital", "Hospital"),
    ("spaceport", "Spaceport"),
    ("newbab", "New Babbage"),
    ("levski", "Levski"),
];

const STANTON_PLANETS: &[(&str, &str)] = &[
    ("1", "Hurston"),
    ("2", "Crusader"),
    ("3", "ArcCorp"),
    ("4", "MicroTech"),
];

const STANTON_MARKERS: &[&str] = &[
    "stanton", "cru_", "hur_", "arc_", "mic_", "grimhex", "kareah", "portolisar", "seraphim",
    "everus", "baijini", "tressler", "orison", "lorville", "area18", "newbabbage", "stan-",
];

fn builtin_location(raw: &str) -> Option<&'static str> {
    BUILTIN_LOCATIONS
        .iter()
        .find(|(k, _)| *k == raw)
        .map(|(_, v)| *v)
}

/// Identify the star system a raw location belongs to.
fn detect_system(raw: &str) -> Option<&'static str> {
    let lower = raw.to_lowercase();
    if lower.contains("jumppoint") {
        return None;
    }
    if lower.contains("pyro") || lower.contains("pext") || lower.starts_with("p_") {
        Some("Pyro")
    } else if lower.contains("nyx") {
        Some("Nyx")
    } else if lower.contains("magnus") {
        Some("Magnus")
    } else if STANTON_MARKERS.iter().any(|m| lower.contains(m)) {
        Some("Stanton")
    } else {
        None
    }
}

fn alias_key(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '+' | '_' | ' ' | '-'))
        .collect()
}

/// Cross-line memory of the navigation recognizer.
#[derive(Debug, Clone, Default)]
struct NavigationState {
    /// Last emitted location hint; identical consecutive hints are dropped.
    last_hint: Option<String>,
    /// Last resolved location name.
    last_location: Option<String>,
    /// Raw identifier of the last location.
    last_location_raw: Option<String>,
    /// Locations already announced as `NEW_LOCATION`.
    announced: HashSet<String>,
    quantum: Option<QuantumState>,
}

/// Recognizes where the player is.
#[derive(Debug, Clone)]
pub struct NavigationRecognizer {
    patterns: PatternTable,
    cleaners: PatternTable,
    aliases: HashMap<String, LocationAlias>,
    state: NavigationState,
}

impl Default for NavigationRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationRecognizer {
    #[must_use]
    pub fn new() -> Self {
        Self::with_aliases(HashMap::new())
    }

    /// Create a recognizer that resolves locations through user aliases.
    #[must_use]
    pub fn with_aliases(aliases: HashMap<String, LocationAlias>) -> Self {
        Self {
            patterns: PatternTable::new(&[
                ("room_name", r"(?i)RoomName:\s*(\S+)"),
                (
                    "location_inventory",
                    r"(?i)<RequestLocationInventory>\s+Player\[[^\]]+\]\s+requested inventory for Location\[([^\]]+)\]",
                ),
                ("stamina_room_ooc", r"(?i)\[STAMINA\]\s+(?:\\t)?->\s*RoomName:\s*(OOC_\S+)"),
                ("jump_point", r"(?i)position in the grid \((OOC_JumpPoint_[^)]+)\)"),
                (
                    "join_pu",
                    r"(?i)<Join PU>\s+address\[([^\]]+)\]\s+port\[([^\]]+)\]\s+shard\[([^\]]+)\]",
                ),
                ("jurisdiction", r#"(?i)Added notification "Entered\s+(.*?)\s*Jurisdiction"#),
                ("armistice_enter", r#"(?i)Added notification "Entering Armistice Zone"#),
                ("armistice_leave", r#"(?i)Added notification "Leaving Armistice Zone"#),
                (
                    "generated_location",
                    r"(?i)<GenerateLocationProperty>.*?locations:\s*\(([^\[]+)\s*\[\d+\]\s*\[([^\]]+)\]\)",
                ),
                (
                    "loading_platform",
                    r"(?i)(?:\[LoadingPlatformManager_([^\]]+)\]\s+Platform state changed|Platform manager 'LoadingPlatformManager_([^']+)')",
                ),
                ("location_generic", r"(?i)Location\[([^\]]+)\]"),
                (
                    "quantum_spooling",
                    r"(?i)Player Selected Quantum Target|Successfully calculated route to",
                ),
                ("quantum_entered", r"<Jump Drive Requesting State Change>.*to Traveling"),
                ("quantum_travel_entering", r"(?i)Quantum Travel: Entering"),
                ("quantum_exited", r"<Jump Drive Requesting State Change>.*to Idle"),
                ("quantum_travel_exiting", r"(?i)Quantum Travel: Exiting"),
                ("quantum_arrived", r"<Quantum Drive Arrived"),
                ("interdiction", r"(?i)Interdiction|Jammed|Interrupted|Forced Exit|Pulled out"),
                (
                    "location_obj",
                    r"(?i)<StatObjLoad\s+0x[0-9A-Fa-f]+\s+Format>\s+'[^']*?objectcontainers/pu/loc/(?:flagship|mod)/(?:stanton/)?(?:station/ser/)?(?:[^/]+/)*([^/]{5,})/",
                ),
                ("ocs_master_zone", r"(?i)Master zone is \[([^\]]+)\]"),
            ]),
            cleaners: PatternTable::new(&[
                ("ooc_body", r"(?i)^OOC_[A-Za-z]+_\d+[a-z]?_(.+)$"),
                ("ooc_stanton_planet", r"(?i)^OOC_Stanton_(\d+)$"),
                ("system_prefix", r"^Stanton\d*_"),
                ("digits", r"\b\d+\b"),
                ("ocs_noise", r"(?i)\b(?:int|ext|c|b|a|final|rund|cmpd|wrhse|lge|util)\b"),
                (
                    "hangar_noise",
                    r"(?i)\b(?:lrgtop|smltop|medtop|xltop|lext|xg|aeroview|selfland|industrial|vfg|revelyork|hangar)\b",
                ),
                ("rs_suffix", r"(?i) RS[A-Z0-9-]+$"),
                ("rs_prefix", r"(?i)^rs "),
            ]),
            aliases,
            state: NavigationState::default(),
        }
    }

    /// Replace the user alias table.
    pub fn set_aliases(&mut self, aliases: HashMap<String, LocationAlias>) {
        self.aliases = aliases;
    }

    /// Latest quantum drive transition seen.
    #[must_use]
    pub fn quantum_state(&self) -> Option<QuantumState> {
        self.state.quantum
    }

    /// Last resolved location name.
    #[must_use]
    pub fn current_location(&self) -> Option<&str> {
        self.state.last_location.as_deref()
    }

    /// Clean a raw `Location[...]` value (`Stanton1_Lorville` → `Lorville`).
    #[must_use]
    pub fn clean_location_name(&self, raw: &str) -> String {
        if let Some(name) = builtin_location(raw) {
            return name.to_string();
        }
        if let Some(body) = raw
            .get(..4)
            .filter(|p| p.eq_ignore_ascii_case("OOC_"))
            .and_then(|_| raw.get(4..))
            .filter(|b| !b.is_empty())
        {
            return self
                .clean_ooc_name(raw)
                .unwrap_or_else(|| title_case(&body.replace('_', " ")));
        }

        let lower = raw.to_lowercase();
        let kind = if lower.contains("_outpost_") {
            Some("Outpost")
        } else if lower.contains("_bunker_") {
            Some("Bunker")
        } else if lower.contains("_cave_") {
            Some("Cave")
        } else {
            None
        };
        if let Some(kind) = kind {
            let desc = [
                ("_trdpst_", "Trading Post "),
                ("_scrp_", "Scrap Yard "),
                ("_sec_", "Security "),
                ("_dc_", "Data Center "),
                ("_shck_", "Shack "),
            ]
            .iter()
            .find(|(marker, _)| lower.contains(marker))
            .map_or("", |(_, d)| *d);
            let first = raw.split('_').next().unwrap_or(raw);
            let planet = first.trim_end_matches(|c: char| c.is_ascii_digit());
            return format!("{planet} {desc}{kind}").trim().to_string();
        }

        let stripped = self.cleaners.replace_all("system_prefix", raw, "");
        let cleaned = title_case(stripped.replace('_', " ").trim());
        if cleaned.is_empty() {
            raw.to_string()
        } else {
            cleaned
        }
    }

    /// Clean an object-container room name (`OOC_Stanton_2b_Daymar` →
    /// `Daymar`). The bare system container is too vague and yields `None`.
    #[must_use]
    pub fn clean_ooc_name(&self, raw: &str) -> Option<String> {
        if raw.eq_ignore_ascii_case("OOC_Stanton") {
            return None;
        }
        if raw.to_lowercase().contains("jumppoint") {
            return Some("Wormhole Transit".to_string());
        }
        if let Some(caps) = self.cleaners.captures("ooc_body", raw) {
            return group(&caps, 1).map(|body| title_case(&body.replace('_', " ")));
        }
        if let Some(caps) = self.cleaners.captures("ooc_stanton_planet", raw) {
            let number = group(&caps, 1)?;
            return STANTON_PLANETS
                .iter()
                .find(|(n, _)| *n == number)
                .map(|(_, name)| (*name).to_string());
        }
        let body = raw.get(4..).unwrap_or(raw);
        Some(title_case(&body.replace('_', " ")))
    }

    fn clean_location_hint(&self, raw: &str) -> String {
        let lower = raw.to_lowercase();
        if let Some((_, name)) = HINT_NAMES.iter().find(|(k, _)| *k == lower) {
            return (*name).to_string();
        }
        if lower.contains("hangar") {
            let name = lower.replace('_', " ");
            let name = self.cleaners.replace_all("hangar_noise", &name, "");
            let name = self.cleaners.replace_all("digits", &name, "");
            let name: String = name.chars().filter(|c| !matches!(c, '(' | ')')).collect();
            return title_case(&squash_spaces(&name));
        }
        let name = raw.replace('_', " ");
        let name = self.cleaners.replace_all("rs_suffix", &name, "");
        let name = self.cleaners.replace_all("rs_prefix", &name, "");
        title_case(&name)
    }

    fn clean_zone_name(&self, raw: &str) -> String {
        let zone = raw.split(" - ").next().unwrap_or(raw).trim();
        let base = zone.strip_prefix("StreamingSOC_").unwrap_or(zone).replace('_', " ");
        let aggressive = self.cleaners.replace_all("digits", &base, "");
        let aggressive = self.cleaners.replace_all("ocs_noise", &aggressive, "");
        let aggressive = squash_spaces(&aggressive);
        if aggressive.is_empty() {
            squash_spaces(&base)
        } else {
            aggressive
        }
    }

    /// Emit a hint unless it repeats the previous one.
    fn emit_hint(&mut self, hint: String, out: &mut Vec<GameEvent>) {
        if hint.is_empty() || self.state.last_hint.as_deref() == Some(hint.as_str()) {
            return;
        }
        self.state.last_hint = Some(hint.clone());
        out.push(GameEvent::new(EventKind::LocationHint, hint));
    }

    fn resolve_alias(&self, cleaned: &str, raw: &str) -> Option<&LocationAlias> {
        if self.aliases.is_empty() {
            return None;
        }
        if let Some(alias) = self.aliases.get(raw).or_else(|| self.aliases.get(cleaned)) {
            return Some(alias);
        }
        let raw_key = alias_key(raw);
        let cleaned_key = alias_key(cleaned);
        self.aliases.iter().find_map(|(key, alias)| {
            let key = alias_key(key);
            (key == raw_key || (!cleaned_key.is_empty() && key == cleaned_key)).then_some(alias)
        })
    }

    fn emit_location(&mut self, cleaned: &str, raw: &str, out: &mut Vec<GameEvent>) {
        let mut name = if cleaned.is_empty() { raw } else { cleaned }.to_string();
        let mut system_override = None;
        let aliased = if let Some(alias) = self.resolve_alias(cleaned, raw) {
            name = alias.name().to_string();
            system_override = alias.system().map(str::to_string);
            let zone = alias.zone().map(str::to_string);
            if let Some(system) = &system_override {
                out.push(GameEvent::new(EventKind::System, system.as_str()));
            }
            if let Some(zone) = zone {
                if self.state.last_location_raw.as_deref() != Some(raw) {
                    out.push(GameEvent::new(EventKind::Zone, zone));
                }
            }
            true
        } else {
            false
        };

        out.push(GameEvent::new(EventKind::Location, name.as_str()).with_raw(raw));

        let changed = self.state.last_location.as_deref() != Some(name.as_str());
        self.state.last_location_raw = Some(raw.to_string());
        if !changed {
            return;
        }
        self.state.last_location = Some(name.clone());

        if system_override.is_none() {
            if let Some(system) = detect_system(raw) {
                out.push(GameEvent::new(EventKind::System, system));
            }
        }
        if !aliased && builtin_location(raw).is_none() && self.state.announced.insert(name.clone()) {
            out.push(GameEvent::new(EventKind::NewLocation, name).with_raw(raw));
        }
    }

    fn parse_quantum(&mut self, line: &str, out: &mut Vec<GameEvent>) -> bool {
        let p = &self.patterns;
        let state = if p.is_match("quantum_spooling", line)
            || p.is_match("quantum_entered", line)
            || p.is_match("quantum_travel_entering", line)
        {
            QuantumState::Entered
        } else if p.is_match("quantum_exited", line) || p.is_match("quantum_travel_exiting", line) {
            QuantumState::Exited
        } else if p.is_match("interdiction", line) {
            out.push(GameEvent::new(EventKind::Interdiction, "Quantum Jammed"));
            return true;
        } else if p.is_match("quantum_arrived", line) {
            QuantumState::Arrived
        } else {
            return false;
        };
        self.state.quantum = Some(state);
        out.push(GameEvent::new(EventKind::Quantum, state.as_str()));
        true
    }
}

impl Recognizer for NavigationRecognizer {
    fn name(&self) -> &'static str {
        "navigation"
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
            .captures("room_name", line)
            .and_then(|c| group(&c, 1))
        {
            out.push(GameEvent::new(EventKind::LocationRaw, room));
            handled = true;
        }

        // Exact location sources end processing of the line.
        if let Some(raw) = self
            .patterns
            .captures("location_inventory", line)
            .and_then(|c| group(&c, 1))
        {
            let cleaned = self.clean_location_name(raw);
            self.emit_location(&cleaned, raw, out);
            return true;
        }

        if let Some(raw) = self
            .patterns
            .captures("stamina_room_ooc", line)
            .and_then(|c| group(&c, 1))
        {
            if let Some(cleaned) = self.clean_ooc_name(raw) {
                self.emit_location(&cleaned, raw, out);
            }
            return true;
        }

        if let Some(raw) = self
            .patterns
            .captures("jump_point", line)
            .and_then(|c| group(&c, 1))
        {
            self.emit_location("Wormhole Transit", raw, out);
            return true;
        }

        if let Some(caps) = self.patterns.captures("join_pu", line) {
            out.push(GameEvent::new(
                EventKind::ServerConnected,
                json!({
                    "address": group(&caps, 1),
                    "port": group(&caps, 2),
                    "shard": group(&caps, 3),
                }),
            ));
            return true;
        }

        if let Some(jurisdiction) = self
            .patterns
            .captures("jurisdiction", line)
            .and_then(|c| group(&c, 1))
        {
            out.push(GameEvent::new(EventKind::Jurisdiction, jurisdiction.trim()));
            handled = true;
        }

        if self.patterns.is_match("armistice_enter", line) {
            out.push(GameEvent::new(EventKind::Zone, "Armistice Zone"));
            handled = true;
        } else if self.patterns.is_match("armistice_leave", line) {
            out.push(GameEvent::new(EventKind::Zone, "Open Space"));
            handled = true;
        }

        if let Some(raw) = self
            .patterns
            .captures("generated_location", line)
            .and_then(|c| group(&c, 2))
        {
            // These arrive continuously; surfaced for alias authoring only.
            out.push(GameEvent::new(EventKind::NewLocation, raw));
            return true;
        }

        if let Some(caps) = self.patterns.captures("loading_platform", line) {
            if let Some(raw) = group(&caps, 1).or_else(|| group(&caps, 2)) {
                let lower = raw.to_lowercase();
                if !lower.contains("elevator") && !lower.contains("kiosk") {
                    self.emit_hint(raw.replace('_', " "), out);
                }
            }
            handled = true;
        }

        if !handled {
            if let Some(raw) = self
                .patterns
                .captures("location_generic", line)
                .and_then(|c| group(&c, 1))
            {
                let numeric = raw.chars().all(|c| c.is_ascii_digit());
                if !numeric && !raw.contains(':') && raw.len() > 3 {
                    let cleaned = self.clean_location_name(raw);
                    self.emit_location(&cleaned, raw, out);
                    handled = true;
                }
            }
        }

        if self.parse_quantum(line, out) {
            handled = true;
        }

        if let Some(raw) = self
            .patterns
            .captures("location_obj", line)
            .and_then(|c| group(&c, 1))
        {
            let hint = self.clean_location_hint(raw);
            self.emit_hint(hint, out);
            handled = true;
        }

        if let Some(raw) = self
            .patterns
            .captures("ocs_master_zone", line)
            .and_then(|c| group(&c, 1))
        {
            let hint = self.clean_zone_name(raw);
            if hint.len() > 3 {
                self.emit_hint(hint, out);
                handled = true;
            }
        }

        handled
    }

    fn reset(&mut self) {
        self.state = NavigationState::default();
    }
}
