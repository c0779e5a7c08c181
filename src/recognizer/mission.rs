//! Contract acceptance, objectives and completion.
//!
//! Mission ids and titles rarely share a line. An id seen on any line is
//! held in a short buffer and attached to later lines until the buffer
//! expires; once a `(title, id)` pair is known it is remembered so that
//! end-of-mission lines carrying only the id still report the title.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::table::group;
use super::{LineContext, PatternTable, Recognizer};
use crate::event::{EventKind, GameEvent, Level};

/// How long a mission id stays attachable to later lines.
pub const DEFAULT_MISSION_ID_WINDOW: Duration = Duration::from_secs(5);

const NIL_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Cross-line mission correlation state.
#[derive(Debug, Clone)]
pub struct MissionState {
    /// Correlation window for `last_id`.
    pub window: Duration,
    /// Most recent id and when it was seen.
    pub last_id: Option<(String, Instant)>,
    /// Known titles by mission id. Entries are pruned when the mission ends.
    pub titles: HashMap<String, String>,
}

impl MissionState {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_id: None,
            titles: HashMap::new(),
        }
    }

    /// Record an id seen on the current line.
    pub fn observe(&mut self, id: &str, now: Instant) {
        self.last_id = Some((id.to_string(), now));
    }

    /// The buffered id if it is still inside the window. An expired buffer
    /// is cleared so it can never be reused.
    pub fn buffered_id(&mut self, now: Instant) -> Option<String> {
        let fresh = self
            .last_id
            .as_ref()
            .is_some_and(|(_, seen)| now.saturating_duration_since(*seen) <= self.window);
        if fresh {
            self.last_id.as_ref().map(|(id, _)| id.clone())
        } else {
            self.last_id = None;
            None
        }
    }

    fn finish(&mut self, id: Option<&str>) -> Option<String> {
        id.and_then(|id| self.titles.remove(id))
    }
}

impl Default for MissionState {
    fn default() -> Self {
        Self::new(DEFAULT_MISSION_ID_WINDOW)
    }
}

/// Recognizes mission lifecycle lines.
#[derive(Debug, Clone)]
pub struct MissionRecognizer {
    patterns: PatternTable,
    state: MissionState,
}

impl Default for MissionRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

fn status_event(status: &str, id: Option<&str>, title: Option<String>) -> GameEvent {
    let level = if status == "completed" {
        Level::Info
    } else {
        Level::Warning
    };
    GameEvent::new(EventKind::MissionStatus, status)
        .with_level(level)
        .with_id(id)
        .with_opt_field("title", title)
}

impl MissionRecognizer {
    #[must_use]
    pub fn new() -> Self {
        Self::with_window(DEFAULT_MISSION_ID_WINDOW)
    }

    /// Create a recognizer with a custom id correlation window.
    #[must_use]
    pub fn with_window(window: Duration) -> Self {
        Self {
            patterns: PatternTable::new(&[
                (
                    "mission_ended_structured",
                    r"(?i)<MissionEnded>\s*mission_id\s*\[([^\]]+)\]\s*-\s*mission_state\s*\[([^\]]+)\]",
                ),
                ("mission_ended_tag", r"<MissionEnded>"),
                (
                    "contract_accepted",
                    r#"(?i)(?:Added\s+)?notification\s+"Contract Accepted:\s*([^"]+)""#,
                ),
                (
                    "contract_complete",
                    r#"(?i)(?:Added\s+)?notification\s+"Contract Completed?:\s*([^"]+)""#,
                ),
                (
                    "contract_failed",
                    r#"(?i)(?:Added\s+)?notification\s+"Contract Failed:\s*([^"]+)""#,
                ),
                (
                    "new_objective",
                    r#"(?i)(?:Added\s+)?notification\s+"New Objective:\s*([^"]+)""#,
                ),
                ("mission_id", r"(?i)MissionId:\s*\[?([^\[\]\s,]+)\]?"),
                ("tracked_mission", r"(?i)TrackedMission|MissionMarker"),
                ("contract_available", r"^Contract Available: (.*?) \[\d+\]"),
            ]),
            state: MissionState::new(window),
        }
    }

    /// Current correlation state.
    #[must_use]
    pub fn state(&self) -> &MissionState {
        &self.state
    }

    /// Id on this line, else the buffered one if still fresh.
    fn effective_id(&mut self, line: &str, now: Instant) -> Option<String> {
        let own = self
            .patterns
            .captures("mission_id", line)
            .and_then(|c| group(&c, 1))
            .filter(|id| *id != NIL_ID);
        match own {
            Some(id) => {
                self.state.observe(id, now);
                Some(id.to_string())
            }
            None => self.state.buffered_id(now),
        }
    }

    // Unverified against real logs; kept apart from the accept and end rules.
    fn tracked_mission(&self, line: &str, id: Option<&str>, out: &mut Vec<GameEvent>) -> bool {
        if !self.patterns.is_match("tracked_mission", line) {
            return false;
        }
        let Some((id, title)) = id.and_then(|id| self.state.titles.get(id).map(|t| (id, t))) else {
            return false;
        };
        out.push(GameEvent::new(EventKind::MissionChanged, title.as_str()).with_id(Some(id)));
        true
    }
}

impl Recognizer for MissionRecognizer {
    fn name(&self) -> &'static str {
        "mission"
    }

    fn patterns(&self) -> &PatternTable {
        &self.patterns
    }

    fn patterns_mut(&mut self) -> &mut PatternTable {
        &mut self.patterns
    }

    fn parse(&mut self, line: &str, ctx: &LineContext, out: &mut Vec<GameEvent>) -> bool {
        let mut handled = false;
        let id = self.effective_id(line, ctx.now);
        let id = id.as_deref();

        if let Some(caps) = self.patterns.captures("mission_ended_structured", line) {
            let mission_id = group(&caps, 1);
            let state = group(&caps, 2).unwrap_or_default().to_lowercase();
            let status = if state.contains("succeeded") || state.contains("complete") {
                "completed"
            } else if state.contains("abandoned") {
                "abandoned"
            } else {
                "failed"
            };
            let title = self.state.finish(mission_id);
            out.push(status_event(status, mission_id, title));
            handled = true;
        }

        if let Some(title) = self
            .patterns
            .captures("contract_accepted", line)
            .and_then(|c| group(&c, 1))
        {
            let title = title.trim().trim_end_matches(':').trim();
            if let Some(id) = id {
                self.state.titles.insert(id.to_string(), title.to_string());
            }
            out.push(GameEvent::new(EventKind::MissionAccepted, title).with_id(id));
            handled = true;
        }

        if let Some(objective) = self
            .patterns
            .captures("new_objective", line)
            .and_then(|c| group(&c, 1))
        {
            out.push(GameEvent::new(EventKind::MissionObjective, objective.trim()).with_id(id));
            handled = true;
        }

        if let Some(offer) = self
            .patterns
            .captures("contract_available", line)
            .and_then(|c| group(&c, 1))
        {
            out.push(GameEvent::new(EventKind::ContractAvailable, offer.trim()));
            handled = true;
        }

        for (pattern, status) in [("contract_complete", "completed"), ("contract_failed", "failed")] {
            if let Some(title) = self
                .patterns
                .captures(pattern, line)
                .and_then(|c| group(&c, 1))
            {
                self.state.finish(id);
                out.push(status_event(status, id, Some(title.trim().to_string())));
                handled = true;
            }
        }

        if !handled && self.patterns.is_match("mission_ended_tag", line) {
            let success = ["Success", "Complete", "SUCCEEDED"]
                .iter()
                .any(|word| line.contains(word));
            let status = if success { "completed" } else { "failed" };
            let title = self.state.finish(id);
            out.push(status_event(status, id, title));
            handled = true;
        }

        if self.tracked_mission(line, id, out) {
            handled = true;
        }

        if !handled && id.is_some() {
            tracing::trace!(mission_id = ?id, "Buffered mission id");
        }
        handled
    }

    fn reset(&mut self) {
        self.state = MissionState::new(self.state.window);
    }
}
