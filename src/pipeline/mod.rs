//! Synchronous classification core.
//!
//! A [`Pipeline`] owns the dispatch engine together with the tables that
//! only make sense across recognizers: unknown line groups, alert
//! cooldowns and session facts. It is driven one line at a time in file
//! order and never touches the filesystem.

mod cooldown;
mod facts;
mod unknown;

pub use cooldown::AlertCooldowns;
pub use facts::SessionFacts;
pub use unknown::{UnknownGroup, UnknownSnapshot, UnknownTracker};

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::WatchConfig;
use crate::event::{EventKind, GameEvent};
use crate::recognizer::{
    CustomPatternSpec, CustomRecognizer, DispatchEngine, LineContext, OverrideError, PatternHit, PatternOverride,
    PatternSetError,
};

/// A configuration the pipeline cannot be built from.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Custom(#[from] PatternSetError),

    #[error(transparent)]
    Override(#[from] OverrideError),
}

/// An event leaving the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Emitted {
    #[serde(flatten)]
    pub event: GameEvent,
    /// The event is alert-worthy and its cooldown allowed it.
    pub alert: bool,
}

/// Result of processing one line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineOutcome {
    pub matched: bool,
    pub events: Vec<Emitted>,
    /// The unknown tracker wants a snapshot published.
    pub snapshot_due: bool,
}

#[derive(Debug)]
pub struct Pipeline {
    engine: DispatchEngine,
    unknowns: UnknownTracker,
    cooldowns: AlertCooldowns,
    facts: SessionFacts,
    capture_unknowns: bool,
}

impl Pipeline {
    /// Build the pipeline described by the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first custom pattern or pattern override that is invalid.
    pub fn new(config: &WatchConfig) -> Result<Self, PipelineError> {
        let mut custom = CustomRecognizer::from_specs(&config.custom_patterns)?;
        custom.set_enabled(config.custom_patterns_enabled);
        let mut engine = DispatchEngine::standard(
            config.mission_id_window(),
            config.custom_locations.clone(),
            custom,
        );
        engine.set_pattern_overrides(&config.pattern_overrides)?;
        Ok(Self::with_engine(engine, config))
    }

    /// Wrap an already assembled engine.
    #[must_use]
    pub fn with_engine(engine: DispatchEngine, config: &WatchConfig) -> Self {
        Self {
            engine,
            unknowns: UnknownTracker::new(config.unknown.clone()),
            cooldowns: AlertCooldowns::new(config.cooldowns()),
            facts: SessionFacts::default(),
            capture_unknowns: config.unknown.capture,
        }
    }

    /// Classify one line observed at `now`.
    pub fn process_line(&mut self, text: &str, now: Instant) -> LineOutcome {
        if text.trim().is_empty() {
            return LineOutcome::default();
        }

        let dispatch = self.engine.process(text, &LineContext::at(now));
        let mut outcome = LineOutcome {
            matched: dispatch.matched,
            events: Vec::with_capacity(dispatch.events.len()),
            snapshot_due: false,
        };

        for event in dispatch.events {
            if self.facts.observe(&event) {
                tracing::debug!(kind = %event.kind, "Session fact updated");
            }
            let alert = event
                .alert_key()
                .is_some_and(|key| self.cooldowns.permit(&key, now));
            outcome.events.push(Emitted { event, alert });
        }

        if !outcome.matched && self.capture_unknowns {
            outcome.snapshot_due = self.unknowns.record(text);
        }
        outcome
    }

    /// The log was rotated: drop correlation state and announce a restart.
    pub fn rotate(&mut self) -> Emitted {
        self.reset();
        Emitted {
            event: GameEvent::new(EventKind::GameRestart, "restarted"),
            alert: false,
        }
    }

    /// Drop recognizer correlation state and session facts. Unknown groups,
    /// cooldowns and custom patterns survive.
    pub fn reset(&mut self) {
        self.engine.reset();
        self.facts.reset();
    }

    /// Backfill disables capture so history does not flood the groups.
    pub fn set_capture_unknowns(&mut self, capture: bool) {
        self.capture_unknowns = capture;
    }

    #[must_use]
    pub fn capture_unknowns(&self) -> bool {
        self.capture_unknowns
    }

    #[must_use]
    pub fn explain(&self, line: &str) -> Vec<PatternHit> {
        self.engine.explain(line)
    }

    /// Replace the user pattern set.
    ///
    /// # Errors
    ///
    /// Returns the first invalid entry; the active set is then unchanged.
    pub fn set_custom_patterns(&mut self, specs: &[CustomPatternSpec]) -> Result<usize, PatternSetError> {
        let count = self.engine.set_custom_patterns(specs)?;
        tracing::info!(count, "Custom patterns replaced");
        Ok(count)
    }

    pub fn set_custom_enabled(&mut self, enabled: bool) {
        self.engine.set_custom_enabled(enabled);
    }

    /// Replace the built-in pattern overrides.
    ///
    /// # Errors
    ///
    /// Returns the first bad entry; the active patterns are then unchanged.
    pub fn set_pattern_overrides(&mut self, overrides: &BTreeMap<String, PatternOverride>) -> Result<usize, OverrideError> {
        let count = self.engine.set_pattern_overrides(overrides)?;
        tracing::info!(count, "Pattern overrides applied");
        Ok(count)
    }

    pub fn set_cooldown(&mut self, key: impl Into<String>, window: Duration) {
        self.cooldowns.set(key, window);
    }

    #[must_use]
    pub fn unknown_snapshot(&self) -> UnknownSnapshot {
        self.unknowns.snapshot()
    }

    pub fn ignore_unknown(&mut self, key: &str) -> UnknownSnapshot {
        self.unknowns.ignore(key);
        self.unknowns.snapshot()
    }

    pub fn clear_unknowns(&mut self) -> UnknownSnapshot {
        self.unknowns.clear();
        self.unknowns.snapshot()
    }

    #[must_use]
    pub fn facts(&self) -> &SessionFacts {
        &self.facts
    }

    /// Recognizer panics so far.
    #[must_use]
    pub fn faults(&self) -> u64 {
        self.engine.faults()
    }

    #[must_use]
    pub fn engine(&self) -> &DispatchEngine {
        &self.engine
    }
}
