//! Line recognizers and the dispatch engine that drives them.
//!
//! Each recognizer owns an ordered pattern table and whatever short-lived
//! correlation state it needs. Recognizers never see each other's state;
//! the only thing they share is the [`LineContext`].

mod combat;
mod connection;
mod custom;
mod economy;
mod engine;
mod engineering;
mod fields;
mod hangar;
mod inventory;
mod mining;
mod mission;
mod names;
mod navigation;
mod overrides;
mod salvage;
mod session;
mod social;
mod system;
mod table;
mod vehicle;
mod zone;

use std::time::Instant;

use crate::event::GameEvent;

pub use combat::CombatRecognizer;
pub use connection::ConnectionRecognizer;
pub use custom::{CustomPatternSpec, CustomRecognizer, CustomRule, PatternError, PatternSetError};
pub use economy::EconomyRecognizer;
pub use engine::{Dispatch, DispatchEngine, PatternHit, Slot};
pub use engineering::EngineeringRecognizer;
pub use fields::{parse_number, Tags};
pub use hangar::HangarRecognizer;
pub use inventory::InventoryRecognizer;
pub use mining::MiningRecognizer;
pub use mission::{MissionRecognizer, MissionState, DEFAULT_MISSION_ID_WINDOW};
pub use names::{clean_ship_name, title_case};
pub use navigation::{LocationAlias, NavigationRecognizer, QuantumState};
pub use overrides::{OverrideError, PatternOverride};
pub use salvage::SalvageRecognizer;
pub use session::SessionRecognizer;
pub use social::SocialRecognizer;
pub use system::SystemRecognizer;
pub use table::{group, PatternTable};
pub use vehicle::VehicleRecognizer;
pub use zone::ZoneRecognizer;

/// Context shared with every recognizer for one line.
#[derive(Debug, Clone, Copy)]
pub struct LineContext {
    /// Time the line was observed. Correlation windows are measured
    /// against this, never against the wall clock.
    pub now: Instant,
}

impl LineContext {
    #[must_use]
    pub fn at(now: Instant) -> Self {
        Self { now }
    }

    #[must_use]
    pub fn now() -> Self {
        Self::at(Instant::now())
    }
}

/// A stateful line classifier.
///
/// `parse` reports whether the line matched and pushes zero or more events.
/// Malformed input is "did not match"; implementations must not panic on
/// it. State may only be advanced by lines passed to `parse`, in file order.
pub trait Recognizer: Send + Sync {
    /// Stable name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// The recognizer's pattern table.
    fn patterns(&self) -> &PatternTable;

    /// Mutable access for pattern overrides.
    fn patterns_mut(&mut self) -> &mut PatternTable;

    /// Classify one line.
    fn parse(&mut self, line: &str, ctx: &LineContext, out: &mut Vec<GameEvent>) -> bool;

    /// Drop cross-line correlation state (the log was rotated).
    fn reset(&mut self) {}
}

/// All built-in recognizers in dispatch order.
#[must_use]
pub fn builtin_recognizers(
    mission_id_window: std::time::Duration,
    aliases: std::collections::HashMap<String, LocationAlias>,
) -> Vec<Box<dyn Recognizer>> {
    vec![
        Box::new(NavigationRecognizer::with_aliases(aliases)),
        Box::new(VehicleRecognizer::new()),
        Box::new(CombatRecognizer::new()),
        Box::new(MissionRecognizer::with_window(mission_id_window)),
        Box::new(EconomyRecognizer::new()),
        Box::new(ZoneRecognizer::new()),
        Box::new(SessionRecognizer::new()),
        Box::new(SystemRecognizer::new()),
        Box::new(ConnectionRecognizer::new()),
        Box::new(SocialRecognizer::new()),
        Box::new(HangarRecognizer::new()),
        Box::new(MiningRecognizer::new()),
        Box::new(SalvageRecognizer::new()),
        Box::new(EngineeringRecognizer::new()),
        Box::new(InventoryRecognizer::new()),
    ]
}
