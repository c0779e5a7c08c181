//! Per alert key throttling.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Suppresses repeat alerts of the same key inside a cooldown window.
///
/// A key without a configured window, or with a zero window, always fires.
#[derive(Debug, Clone, Default)]
pub struct AlertCooldowns {
    windows: HashMap<String, Duration>,
    last_fired: HashMap<String, Instant>,
}

impl AlertCooldowns {
    #[must_use]
    pub fn new(windows: HashMap<String, Duration>) -> Self {
        Self {
            windows,
            last_fired: HashMap::new(),
        }
    }

    /// Configure the window for a key. Restarts its cooldown.
    pub fn set(&mut self, key: impl Into<String>, window: Duration) {
        let key = key.into();
        self.last_fired.remove(&key);
        self.windows.insert(key, window);
    }

    #[must_use]
    pub fn window(&self, key: &str) -> Option<Duration> {
        self.windows.get(key).copied()
    }

    /// Whether an alert for `key` may fire at `now`. A permitted alert
    /// starts a new window.
    pub fn permit(&mut self, key: &str, now: Instant) -> bool {
        let Some(window) = self.window(key).filter(|w| !w.is_zero()) else {
            return true;
        };
        if let Some(last) = self.last_fired.get(key) {
            if now.saturating_duration_since(*last) < window {
                tracing::debug!(alert = %key, "Alert suppressed by cooldown");
                return false;
            }
        }
        self.last_fired.insert(key.to_string(), now);
        true
    }
}
