//! Configuration types.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::recognizer::{CustomPatternSpec, LocationAlias, PatternOverride};

/// Unknown line discovery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnknownConfig {
    /// Group lines no recognizer matched.
    pub capture: bool,
    /// Group cap; the oldest group is evicted first.
    pub max_groups: usize,
    /// Shorter cleaned lines are ignored.
    pub min_length: usize,
    /// Longest sample kept per group.
    pub sample_max: usize,
    /// Publish a snapshot after this many recorded unknown lines.
    pub snapshot_every: u64,
}

impl Default for UnknownConfig {
    fn default() -> Self {
        Self {
            capture: true,
            max_groups: 200,
            min_length: 15,
            sample_max: 300,
            snapshot_every: 50,
        }
    }
}

/// Watcher configuration loaded from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Log file to watch. Discovered from conventional install locations when unset.
    pub log_path: Option<PathBuf>,
    /// Poll timer period in milliseconds.
    pub poll_interval_ms: u64,
    /// Upper bound on bytes read per poll.
    pub max_read_bytes: u64,
    /// Use filesystem notifications to poll sooner.
    pub fs_events: bool,
    /// Capacity of the outbound event channel.
    pub event_buffer: usize,
    /// Mission id correlation window in milliseconds.
    pub mission_id_window_ms: u64,
    /// Lines from the end of an existing file to classify at start.
    pub backfill_lines: usize,
    pub unknown: UnknownConfig,
    /// Alert key to cooldown in milliseconds.
    pub alert_cooldowns: HashMap<String, u64>,
    pub custom_patterns: Vec<CustomPatternSpec>,
    pub custom_patterns_enabled: bool,
    /// Built-in pattern replacements keyed `recognizer.pattern`.
    pub pattern_overrides: BTreeMap<String, PatternOverride>,
    /// Raw location identifier to display alias.
    pub custom_locations: HashMap<String, LocationAlias>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            poll_interval_ms: 250,
            max_read_bytes: 4 * 1024 * 1024,
            fs_events: true,
            event_buffer: 1024,
            mission_id_window_ms: 5000,
            backfill_lines: 0,
            unknown: UnknownConfig::default(),
            alert_cooldowns: HashMap::new(),
            custom_patterns: Vec::new(),
            custom_patterns_enabled: true,
            pattern_overrides: BTreeMap::new(),
            custom_locations: HashMap::new(),
        }
    }
}

impl WatchConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    #[must_use]
    pub fn mission_id_window(&self) -> Duration {
        Duration::from_millis(self.mission_id_window_ms)
    }

    /// Alert cooldowns as durations.
    #[must_use]
    pub fn cooldowns(&self) -> HashMap<String, Duration> {
        self.alert_cooldowns
            .iter()
            .map(|(key, ms)| (key.clone(), Duration::from_millis(*ms)))
            .collect()
    }
}
