//! Session, build and environment facts.

use super::table::group;
use super::{LineContext, PatternTable, Recognizer};
use crate::event::{EventKind, GameEvent};

/// Facts reported at most once per log generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SessionSeen {
    build: bool,
    env: bool,
    session_id: bool,
    player: bool,
    username: bool,
    character: bool,
    region: bool,
}

/// Recognizes session metadata lines.
#[derive(Debug, Clone)]
pub struct SessionRecognizer {
    patterns: PatternTable,
    seen: SessionSeen,
}

impl Default for SessionRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRecognizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            patterns: PatternTable::new(&[
                ("log_start", r"(?i)^<([^>]+)> Log started on"),
                ("build_info", r"(?i)Build\((\d+)\)"),
                ("environment", r"(?i)\[Trace\] Environment:\s+(\w+)"),
                ("session_id", r"(?i)\[Trace\] @session:\s+'([^']+)'"),
                ("legacy_login", r"Legacy login response.*Handle\[(\w+)\]"),
                ("username", r"username (\w+) signedIn (\d)"),
                ("character_name", r"AccountLoginCharacterStatus_Character.*name (\w+)\s*-\s*state STATE_CURRENT"),
                ("account_login_success", r"\{SET_ACCOUNT_STATE\} state \[kAccountLoginSuccess\]"),
                ("server_region", r"grpc-client-endpoint-override='https://(\w+)-"),
            ]),
            seen: SessionSeen::default(),
        }
    }

    /// Emit a fact the first time its pattern matches.
    fn once(
        patterns: &PatternTable,
        seen: &mut bool,
        name: &str,
        kind: EventKind,
        line: &str,
        out: &mut Vec<GameEvent>,
    ) -> bool {
        if *seen {
            return false;
        }
        let Some(value) = patterns.captures(name, line).and_then(|c| group(&c, 1)) else {
            return false;
        };
        *seen = true;
        out.push(GameEvent::new(kind, value));
        true
    }
}

impl Recognizer for SessionRecognizer {
    fn name(&self) -> &'static str {
        "session"
    }

    fn patterns(&self) -> &PatternTable {
        &self.patterns
    }

    fn patterns_mut(&mut self) -> &mut PatternTable {
        &mut self.patterns
    }

    fn parse(&mut self, line: &str, _ctx: &LineContext, out: &mut Vec<GameEvent>) -> bool {
        let mut handled = false;
        let p = &self.patterns;

        if let Some(started) = p.captures("log_start", line).and_then(|c| group(&c, 1)) {
            out.push(GameEvent::new(EventKind::SessionStart, started));
            handled = true;
        }

        let seen = &mut self.seen;
        handled |= Self::once(p, &mut seen.build, "build_info", EventKind::BuildInfo, line, out);
        handled |= Self::once(p, &mut seen.env, "environment", EventKind::ServerEnv, line, out);
        handled |= Self::once(p, &mut seen.session_id, "session_id", EventKind::SessionId, line, out);
        handled |= Self::once(p, &mut seen.player, "legacy_login", EventKind::PlayerName, line, out);
        handled |= Self::once(p, &mut seen.username, "username", EventKind::Username, line, out);
        handled |= Self::once(p, &mut seen.character, "character_name", EventKind::CharacterName, line, out);
        handled |= Self::once(p, &mut seen.region, "server_region", EventKind::ServerRegion, line, out);

        if p.is_match("account_login_success", line) {
            out.push(GameEvent::new(EventKind::AccountLogin, "success"));
            handled = true;
        }
        handled
    }

    fn reset(&mut self) {
        self.seen = SessionSeen::default();
    }
}
