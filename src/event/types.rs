//! Event payload types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::EventKind;

/// Severity attached to an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    #[default]
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => f.write_str("INFO"),
            Self::Warning => f.write_str("WARNING"),
            Self::Critical => f.write_str("CRITICAL"),
        }
    }
}

impl std::str::FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INFO" => Ok(Self::Info),
            "WARNING" => Ok(Self::Warning),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(format!("unknown level `{s}`, expected INFO, WARNING or CRITICAL")),
        }
    }
}

// Config files are written by hand, so any casing is accepted.
impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A single complete line read from the log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    /// Line text without the trailing `\r\n` / `\n`.
    pub text: String,
    /// Byte offset in the file where the line started.
    pub offset: u64,
}

/// The unit of output of the pipeline.
///
/// `value` is the kind-specific payload. Kind-specific extras (a mission
/// title, death details, a custom message) live in `fields` and are
/// flattened into the top-level object when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default)]
    pub level: Level,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl GameEvent {
    /// Create an event with the given kind and payload at `INFO` level.
    #[must_use]
    pub fn new(kind: EventKind, value: impl Into<Value>) -> Self {
        Self {
            kind,
            value: value.into(),
            subtype: None,
            level: Level::Info,
            id: None,
            raw: None,
            fields: Map::new(),
        }
    }

    #[must_use]
    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Attach a correlation id. `None` leaves the event without one.
    #[must_use]
    pub fn with_id(mut self, id: Option<impl Into<String>>) -> Self {
        self.id = id.map(Into::into);
        self
    }

    #[must_use]
    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    /// Add a named extra field.
    #[must_use]
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Add a named extra field only when a value is present.
    #[must_use]
    pub fn with_opt_field(self, key: &str, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(v) => self.with_field(key, v),
            None => self,
        }
    }

    /// Payload as a string, if it is one.
    #[must_use]
    pub fn value_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    /// Extra field lookup.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Key used for alert cooldowns, or `None` for passive events.
    #[must_use]
    pub fn alert_key(&self) -> Option<String> {
        let key = match self.kind {
            EventKind::Status => return self.value_str().map(str::to_lowercase),
            EventKind::Death => "death",
            EventKind::VehicleDestruction | EventKind::VehicleDeath => "vehicle_destruction",
            EventKind::HazardFire => "fire",
            EventKind::CrimeUpdate => "crimestat",
            EventKind::Interdiction => "interdiction",
            EventKind::Custom => "custom",
            _ => return None,
        };
        Some(key.to_string())
    }
}
