//! Nearby players and group invites.

use super::table::group;
use super::{LineContext, PatternTable, Recognizer};
use crate::event::{EventKind, GameEvent};

#[derive(Debug, Clone)]
pub struct SocialRecognizer {
    patterns: PatternTable,
}

impl Default for SocialRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SocialRecognizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            patterns: PatternTable::new(&[
                ("social_subscribe", r"SubscribeToPlayerSocial:\s*(\S+)"),
                ("group_invite", r"(?i)<Group>.*Invite"),
                ("party_invite", r"NotifyPendingInvitations"),
            ]),
        }
    }
}

impl Recognizer for SocialRecognizer {
    fn name(&self) -> &'static str {
        "social"
    }

    fn patterns(&self) -> &PatternTable {
        &self.patterns
    }

    fn patterns_mut(&mut self) -> &mut PatternTable {
        &mut self.patterns
    }

    fn parse(&mut self, line: &str, _ctx: &LineContext, out: &mut Vec<GameEvent>) -> bool {
        let mut handled = false;
        if let Some(player) = self
            .patterns
            .captures("social_subscribe", line)
            .and_then(|c| group(&c, 1))
        {
            out.push(
                GameEvent::new(EventKind::SocialProximity, player)
                    .with_field("message", format!("Player nearby: {player}")),
            );
            handled = true;
        }
        if self.patterns.is_match("group_invite", line) {
            out.push(GameEvent::new(EventKind::SocialInvite, "Group Invite"));
            handled = true;
        }
        if self.patterns.is_match("party_invite", line) {
            out.push(GameEvent::new(EventKind::PartyInvite, "pending"));
            handled = true;
        }
        handled
    }
}
