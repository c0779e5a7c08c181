//! Feeds every line to every recognizer.

use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use super::custom::{CustomPatternSpec, CustomRecognizer, PatternSetError};
use super::navigation::LocationAlias;
use super::overrides::{compile_overrides, OverrideError, PatternOverride};
use super::{builtin_recognizers, LineContext, Recognizer};
use crate::event::GameEvent;

/// An entry of the recognizer table.
pub enum Slot {
    BuiltIn(Box<dyn Recognizer>),
    UserDefined(CustomRecognizer),
}

impl Slot {
    fn recognizer(&self) -> &dyn Recognizer {
        match self {
            Self::BuiltIn(r) => r.as_ref(),
            Self::UserDefined(r) => r,
        }
    }

    fn recognizer_mut(&mut self) -> &mut dyn Recognizer {
        match self {
            Self::BuiltIn(r) => r.as_mut(),
            Self::UserDefined(r) => r,
        }
    }
}

impl std::fmt::Debug for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BuiltIn(r) => f.debug_tuple("BuiltIn").field(&r.name()).finish(),
            Self::UserDefined(r) => f.debug_tuple("UserDefined").field(&r.len()).finish(),
        }
    }
}

/// Result of dispatching one line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dispatch {
    /// At least one recognizer matched.
    pub matched: bool,
    /// Events in recognizer order, then emission order.
    pub events: Vec<GameEvent>,
}

/// A pattern that matched a line, for pattern authoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternHit {
    pub recognizer: &'static str,
    pub pattern: String,
}

/// Ordered recognizer table.
#[derive(Debug)]
pub struct DispatchEngine {
    slots: Vec<Slot>,
    faults: u64,
}

impl DispatchEngine {
    #[must_use]
    pub fn new(slots: Vec<Slot>) -> Self {
        Self { slots, faults: 0 }
    }

    /// Every built-in recognizer followed by the user-defined slot.
    #[must_use]
    pub fn standard(
        mission_id_window: Duration,
        aliases: HashMap<String, LocationAlias>,
        custom: CustomRecognizer,
    ) -> Self {
        let mut slots: Vec<Slot> = builtin_recognizers(mission_id_window, aliases)
            .into_iter()
            .map(Slot::BuiltIn)
            .collect();
        slots.push(Slot::UserDefined(custom));
        Self::new(slots)
    }

    /// Run every recognizer on the line, in table order.
    ///
    /// A recognizer that panics is logged and counted; its events for this
    /// line are discarded and the remaining recognizers still run.
    pub fn process(&mut self, line: &str, ctx: &LineContext) -> Dispatch {
        let mut dispatch = Dispatch::default();
        for slot in &mut self.slots {
            let recognizer = slot.recognizer_mut();
            let mut events = Vec::new();
            match catch_unwind(AssertUnwindSafe(|| recognizer.parse(line, ctx, &mut events))) {
                Ok(matched) => {
                    if matched {
                        tracing::trace!(recognizer = recognizer.name(), events = events.len(), "Line matched");
                    }
                    dispatch.matched |= matched;
                    dispatch.events.append(&mut events);
                }
                Err(_) => {
                    self.faults += 1;
                    tracing::error!(recognizer = recognizer.name(), line = %line, "Recognizer panicked");
                }
            }
        }
        dispatch
    }

    /// Recognizer and pattern names matching the line. Does not touch
    /// recognizer state.
    #[must_use]
    pub fn explain(&self, line: &str) -> Vec<PatternHit> {
        self.slots
            .iter()
            .map(Slot::recognizer)
            .flat_map(|r| {
                r.patterns().matching(line).into_iter().map(move |p| PatternHit {
                    recognizer: r.name(),
                    pattern: p.to_string(),
                })
            })
            .collect()
    }

    /// Drop all cross-line correlation state.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.recognizer_mut().reset();
        }
    }

    /// Number of recognizer panics so far.
    #[must_use]
    pub fn faults(&self) -> u64 {
        self.faults
    }

    /// Recognizer names in dispatch order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.slots.iter().map(|s| s.recognizer().name()).collect()
    }

    /// The user-defined slot, if the table has one.
    #[must_use]
    pub fn custom(&self) -> Option<&CustomRecognizer> {
        self.slots.iter().find_map(|s| match s {
            Slot::UserDefined(c) => Some(c),
            Slot::BuiltIn(_) => None,
        })
    }

    fn custom_mut(&mut self) -> Option<&mut CustomRecognizer> {
        self.slots.iter_mut().find_map(|s| match s {
            Slot::UserDefined(c) => Some(c),
            Slot::BuiltIn(_) => None,
        })
    }

    /// Replace the user pattern set, leaving built-ins untouched. A table
    /// without a user-defined slot gains one.
    ///
    /// # Errors
    ///
    /// Returns the first invalid entry; the active set is then unchanged.
    pub fn set_custom_patterns(&mut self, specs: &[CustomPatternSpec]) -> Result<usize, PatternSetError> {
        if let Some(custom) = self.custom_mut() {
            return custom.set_patterns(specs);
        }
        let custom = CustomRecognizer::from_specs(specs)?;
        let count = custom.len();
        self.slots.push(Slot::UserDefined(custom));
        Ok(count)
    }

    /// Replace the built-in pattern overrides. Every built-in table is
    /// first restored, so an empty set undoes all earlier overrides.
    ///
    /// # Errors
    ///
    /// Returns the first bad entry; the active patterns are then unchanged.
    pub fn set_pattern_overrides(
        &mut self,
        overrides: &BTreeMap<String, PatternOverride>,
    ) -> Result<usize, OverrideError> {
        let compiled = compile_overrides(overrides, |recognizer, pattern| {
            self.slots.iter().find_map(|slot| match slot {
                Slot::BuiltIn(r) if r.name() == recognizer && r.patterns().has_default(pattern) => Some(r.name()),
                _ => None,
            })
        })?;

        let untouched = HashMap::new();
        for slot in &mut self.slots {
            if let Slot::BuiltIn(r) = slot {
                let table = compiled.get(r.name()).unwrap_or(&untouched);
                r.patterns_mut().apply_overrides(table);
            }
        }
        Ok(overrides.len())
    }

    pub fn set_custom_enabled(&mut self, enabled: bool) {
        if let Some(custom) = self.custom_mut() {
            custom.set_enabled(enabled);
        }
    }
}
