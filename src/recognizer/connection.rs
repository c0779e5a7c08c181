//! Client connection state, game join and leave, loading screens.

use super::table::group;
use super::{LineContext, PatternTable, Recognizer};
use crate::event::{EventKind, GameEvent};

#[derive(Debug, Clone)]
pub struct ConnectionRecognizer {
    patterns: PatternTable,
}

impl Default for ConnectionRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRecognizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            patterns: PatternTable::new(&[
                ("connection_state", r"\{SET_CONNECTION_STATE\} state \[(\w+)\]"),
                ("server_connect", r"CSessionManager::OnClientConnected"),
                ("server_disconnect", r"CSessionManager::RequestFrontEnd.*Started"),
                ("loading_screen", r"CGlobalGameUI::OpenLoadingScreen"),
                ("loading_game_mode", r"Loading GameModeRecord='(\w+)'"),
            ]),
        }
    }
}

impl Recognizer for ConnectionRecognizer {
    fn name(&self) -> &'static str {
        "connection"
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

        if let Some(state) = p.captures("connection_state", line).and_then(|c| group(&c, 1)) {
            out.push(GameEvent::new(EventKind::Connection, state));
            handled = true;
        }
        if p.is_match("server_connect", line) {
            out.push(GameEvent::new(EventKind::Connection, "IN_GAME"));
            out.push(GameEvent::new(EventKind::GameJoin, "joined"));
            handled = true;
        }
        if p.is_match("server_disconnect", line) {
            out.push(GameEvent::new(EventKind::GameLeave, "disconnected"));
            handled = true;
        }
        if p.is_match("loading_screen", line) {
            out.push(GameEvent::new(EventKind::Loading, "started"));
            handled = true;
        }
        if let Some(mode) = p.captures("loading_game_mode", line).and_then(|c| group(&c, 1)) {
            out.push(GameEvent::new(EventKind::GameMode, mode));
            handled = true;
        }
        handled
    }
}
