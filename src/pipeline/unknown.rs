//! Grouping of lines no recognizer matched.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use regex::RegexSet;
use serde::Serialize;

use crate::config::UnknownConfig;
use crate::recognizer::{group, PatternTable};

/// Lines that are never worth surfacing.
const NOISE: &[&str] = &[
    r"^\s*$",
    r"(?i)CryAnimation",
    r"(?i)CEntityComponentPhysics",
    r"(?i)SEntityPhysics",
    r"(?i)CParticleEffect",
    r"(?i)CFlowGraph",
    r"(?i)CryAction",
    r"(?i)pak_cache",
    r"^\s*\d+\.\d+\s*$",
    r"(?i)PSOCacheGen",
    r"VK_LAYER_",
    r"\[VK_INFO\]",
    r"\[VK\] Available Vulkan",
    r"grpc\.\w+=",
    r"RegisterUniverseHierarchy",
    r"ContextEstablisher",
    r"CVARS.*Not Whitelisted",
    r"Subsumption.*ErrorReporter",
    r"SubsumptionManager",
    r"CIG\s*$",
    r"^\s*-\s+Adapter index",
    r"^\s*-\s+Dedicated video memory",
    r"^\s*-\s+Feature level",
    r"^\s*-\s+Displays connected",
    r"^\s*-\s+Suitable rendering",
    r"grpc\.(primary_user_agent|http2|max_|keepalive|default_compression)",
    r"===== PSOs Skipped",
    r"SysSpec mismatch",
    r"Shader not found",
    r"Technique not found",
    r"Unsupported PSO",
    r"(Register|WaitFor)OCHierarchyData",
    r"CacheSolarSystemStreaming",
    r"BindSolarSystem",
    r"BindAlwaysStreamedIn",
    r"BindAllStreamable",
    r"GrantPlayerOwnedTokens",
    r"ModelWaitForViews",
    r"SeedingProcessor",
    r"Entity Bury Request",
    r"DestroyEntity.*Aggregate",
    r"Failed to attach to itemport",
];

/// Volatile tokens replaced by placeholders, in application order.
const MASKS: &[(&str, &str, &str)] = &[
    (
        "uuid",
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        "<UUID>",
    ),
    ("url", r"https?://[^\s]+", "<URL>"),
    ("hex", r"\b0x[0-9a-fA-F]+\b|[0-9a-fA-F]{8,}", "<HEX>"),
    ("num", r"\b\d+\b", "<NUM>"),
];

/// Lines sharing a signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnknownGroup {
    /// Normalized signature.
    pub group: String,
    /// The most descriptive line seen for the group.
    pub sample: String,
    pub count: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Groups ordered by descending count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnknownSnapshot {
    pub groups: Vec<UnknownGroup>,
    pub total_groups: usize,
}

/// Buckets unmatched lines by signature for pattern authoring.
#[derive(Debug)]
pub struct UnknownTracker {
    config: UnknownConfig,
    prefixes: PatternTable,
    keys: PatternTable,
    masks: PatternTable,
    noise: RegexSet,
    groups: HashMap<String, UnknownGroup>,
    /// Insertion order, oldest first.
    order: VecDeque<String>,
    ignored: HashSet<String>,
    recorded: u64,
}

impl UnknownTracker {
    #[must_use]
    pub fn new(config: UnknownConfig) -> Self {
        let noise = RegexSet::new(NOISE).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to compile noise filter, keeping every line");
            RegexSet::empty()
        });
        let masks: Vec<(&str, &str)> = MASKS.iter().map(|(name, re, _)| (*name, *re)).collect();

        Self {
            config,
            prefixes: PatternTable::new(&[
                ("timestamp", r"^<\d{4}-\d{2}-\d{2}T[\d:.]+Z>\s*"),
                ("severity", r"^\[(Notice|Error|Trace|Warning|Info)\]\s*"),
            ]),
            keys: PatternTable::new(&[
                ("event_tag", r"^<([^>]{3,60})>"),
                ("class", r"^(C?[A-Z][A-Za-z0-9]+(?:::[A-Za-z0-9_]+)?)"),
                ("bracket_tag", r"^\[([^\]]{2,40})\]"),
            ]),
            masks: PatternTable::new(&masks),
            noise,
            groups: HashMap::new(),
            order: VecDeque::new(),
            ignored: HashSet::new(),
            recorded: 0,
        }
    }

    /// Line text with the timestamp and severity prefixes removed.
    #[must_use]
    pub fn clean(&self, line: &str) -> String {
        let stripped = self.prefixes.replace_all("timestamp", line.trim(), "");
        self.prefixes.replace_all("severity", &stripped, "").trim().to_string()
    }

    /// Signature of a cleaned line, or `None` for noise and short lines.
    #[must_use]
    pub fn signature(&self, cleaned: &str) -> Option<String> {
        if self.noise.is_match(cleaned) || cleaned.chars().count() < self.config.min_length {
            return None;
        }

        let masked = MASKS
            .iter()
            .fold(cleaned.to_string(), |text, (name, _, placeholder)| {
                self.masks.replace_all(name, &text, placeholder)
            });

        if let Some(tag) = self.keys.captures("event_tag", &masked).and_then(|c| group(&c, 1)) {
            return Some(tag.to_string());
        }
        if let Some(class) = self.keys.captures("class", &masked).and_then(|c| group(&c, 1)) {
            if class.len() > 3 {
                return Some(class.to_string());
            }
        }
        if let Some(tag) = self.keys.captures("bracket_tag", &masked).and_then(|c| group(&c, 1)) {
            return Some(format!("[{tag}]"));
        }
        Some(leading_phrase(&masked))
    }

    /// Record an unmatched line. Returns `true` when a periodic snapshot
    /// is due.
    pub fn record(&mut self, line: &str) -> bool {
        self.record_at(line, Utc::now())
    }

    pub fn record_at(&mut self, line: &str, seen: DateTime<Utc>) -> bool {
        let cleaned = self.clean(line);
        let Some(key) = self.signature(&cleaned) else {
            return false;
        };
        if self.ignored.contains(&key) {
            return false;
        }

        let sample_max = self.config.sample_max;
        if let Some(existing) = self.groups.get_mut(&key) {
            existing.count += 1;
            existing.last_seen = seen;
            let len = cleaned.chars().count();
            if len > existing.sample.chars().count() && len <= sample_max {
                existing.sample = cleaned;
            }
        } else {
            if self.groups.len() >= self.config.max_groups {
                self.evict_oldest();
            }
            tracing::trace!(group = %key, "New unknown group");
            self.order.push_back(key.clone());
            self.groups.insert(
                key.clone(),
                UnknownGroup {
                    group: key,
                    sample: cleaned.chars().take(sample_max).collect(),
                    count: 1,
                    first_seen: seen,
                    last_seen: seen,
                },
            );
        }

        self.recorded += 1;
        self.config.snapshot_every > 0 && self.recorded % self.config.snapshot_every == 0
    }

    fn evict_oldest(&mut self) {
        while let Some(oldest) = self.order.pop_front() {
            if self.groups.remove(&oldest).is_some() {
                tracing::debug!(group = %oldest, "Evicted oldest unknown group");
                return;
            }
        }
    }

    /// Stop collecting a signature and drop its group.
    pub fn ignore(&mut self, key: &str) {
        self.ignored.insert(key.to_string());
        self.groups.remove(key);
        self.order.retain(|k| k != key);
    }

    /// Drop every group. Ignored signatures stay ignored.
    pub fn clear(&mut self) {
        self.groups.clear();
        self.order.clear();
    }

    #[must_use]
    pub fn snapshot(&self) -> UnknownSnapshot {
        let mut groups: Vec<UnknownGroup> = self.groups.values().cloned().collect();
        groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.first_seen.cmp(&b.first_seen)));
        UnknownSnapshot {
            total_groups: groups.len(),
            groups,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    #[must_use]
    pub fn is_ignored(&self, key: &str) -> bool {
        self.ignored.contains(key)
    }
}

/// The first words of a line: up to 60 characters, cut at the last space
/// when one falls past the 20th character.
fn leading_phrase(text: &str) -> String {
    let head: Vec<char> = text.chars().take(80).collect();
    let cut = head
        .iter()
        .take(61)
        .rposition(|c| *c == ' ')
        .filter(|i| *i > 20);
    match cut {
        Some(i) => head[..i].iter().collect(),
        None => head.iter().take(60).collect(),
    }
}
