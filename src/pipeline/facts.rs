//! Last known session facts for status labels.

use serde::Serialize;

use crate::event::{EventKind, GameEvent};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionFacts {
    pub started: Option<String>,
    pub build: Option<String>,
    pub environment: Option<String>,
    pub session_id: Option<String>,
    pub player: Option<String>,
    pub character: Option<String>,
    pub region: Option<String>,
    pub shard: Option<String>,
    /// Last `CONNECTION` state.
    pub connection: Option<String>,
}

impl SessionFacts {
    /// Update from an emitted event. Returns `true` if a fact changed.
    pub fn observe(&mut self, event: &GameEvent) -> bool {
        let (slot, value) = match event.kind {
            EventKind::SessionStart => (&mut self.started, event.value_str()),
            EventKind::BuildInfo => (&mut self.build, event.value_str()),
            EventKind::ServerEnv => (&mut self.environment, event.value_str()),
            EventKind::SessionId => (&mut self.session_id, event.value_str()),
            EventKind::PlayerName => (&mut self.player, event.value_str()),
            EventKind::CharacterName => (&mut self.character, event.value_str()),
            EventKind::ServerRegion => (&mut self.region, event.value_str()),
            EventKind::Connection => (&mut self.connection, event.value_str()),
            EventKind::ServerConnected => (&mut self.shard, event.value.get("shard").and_then(|v| v.as_str())),
            _ => return false,
        };
        match value {
            Some(v) if slot.as_deref() != Some(v) => {
                *slot = Some(v.to_string());
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
