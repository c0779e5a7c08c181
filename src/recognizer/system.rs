//! Client hardware, display and version lines from the log header.

use std::collections::HashSet;

use super::table::group;
use super::{LineContext, PatternTable, Recognizer};
use crate::event::{EventKind, GameEvent};

/// (pattern, kind, unit suffix) for the single valued facts.
const FACTS: &[(&str, EventKind, &str)] = &[
    ("gpu_info", EventKind::SystemGpu, ""),
    ("gpu_vram", EventKind::SystemVram, "MB"),
    ("cpu_info", EventKind::SystemCpu, ""),
    ("ram_info", EventKind::SystemRam, "MB"),
    ("game_version", EventKind::GameVersion, ""),
    ("build_id", EventKind::BuildId, ""),
    ("resolution", EventKind::Resolution, ""),
];

/// Recognizes hardware facts. Each is reported once per log generation;
/// every distinct joystick is reported once.
#[derive(Debug, Clone)]
pub struct SystemRecognizer {
    patterns: PatternTable,
    seen: HashSet<EventKind>,
    joysticks: HashSet<String>,
}

impl Default for SystemRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemRecognizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            patterns: PatternTable::new(&[
                ("gpu_info", r"GPU: Vendor = (\w+)"),
                ("gpu_vram", r"GPU: DedicatedVidMemMB = (\d+)"),
                ("cpu_info", r"Host CPU: (.+)"),
                ("ram_info", r"(\d+)MB physical memory installed"),
                ("game_version", r"Branch: (.+)"),
                ("build_id", r"Changelist: (\d+)"),
                ("resolution", r"Current display mode is (\d+x\d+)"),
                ("joystick", r"Connected joystick\d+:\s+(.+?)\s*\{"),
            ]),
            seen: HashSet::new(),
            joysticks: HashSet::new(),
        }
    }
}

impl Recognizer for SystemRecognizer {
    fn name(&self) -> &'static str {
        "system"
    }

    fn patterns(&self) -> &PatternTable {
        &self.patterns
    }

    fn patterns_mut(&mut self) -> &mut PatternTable {
        &mut self.patterns
    }

    fn parse(&mut self, line: &str, _ctx: &LineContext, out: &mut Vec<GameEvent>) -> bool {
        for &(name, kind, unit) in FACTS {
            let Some(value) = self.patterns.captures(name, line).and_then(|c| group(&c, 1)) else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            if self.seen.insert(kind) {
                out.push(GameEvent::new(kind, format!("{value}{unit}")));
            }
            // A repeated header line is still a known line.
            return true;
        }

        if let Some(device) = self.patterns.captures("joystick", line).and_then(|c| group(&c, 1)) {
            let device = device.trim();
            if self.joysticks.insert(device.to_string()) {
                out.push(GameEvent::new(EventKind::Joystick, device));
            }
            return true;
        }
        false
    }

    fn reset(&mut self) {
        self.seen.clear();
        self.joysticks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(rec: &mut SystemRecognizer, line: &str) -> Vec<GameEvent> {
        let mut out = Vec::new();
        rec.parse(line, &LineContext::now(), &mut out);
        out
    }

    #[test]
    fn test_header_facts() {
        let mut rec = SystemRecognizer::new();
        assert_eq!(run(&mut rec, "GPU: Vendor = NVIDIA")[0].kind, EventKind::SystemGpu);
        assert_eq!(run(&mut rec, "GPU: DedicatedVidMemMB = 12282")[0].value_str(), Some("12282MB"));
        assert_eq!(
            run(&mut rec, "Host CPU: AMD Ryzen 7 5800X3D 8-Core Processor   ")[0].value_str(),
            Some("AMD Ryzen 7 5800X3D 8-Core Processor")
        );
        assert_eq!(run(&mut rec, "32699MB physical memory installed")[0].value_str(), Some("32699MB"));
        assert_eq!(run(&mut rec, "Branch: sc-alpha-4.0.2")[0].kind, EventKind::GameVersion);
        assert_eq!(run(&mut rec, "Changelist: 9485493")[0].value_str(), Some("9485493"));
        assert_eq!(
            run(&mut rec, "Current display mode is 2560x1440x32 @ 144Hz")[0].value_str(),
            Some("2560x1440")
        );
    }

    #[test]
    fn test_facts_once_until_reset() {
        let mut rec = SystemRecognizer::new();
        let mut out = Vec::new();
        assert!(rec.parse("GPU: Vendor = NVIDIA", &LineContext::now(), &mut out));
        assert!(rec.parse("GPU: Vendor = NVIDIA", &LineContext::now(), &mut out));
        assert_eq!(out.len(), 1);

        rec.reset();
        assert_eq!(run(&mut rec, "GPU: Vendor = NVIDIA").len(), 1);
    }

    #[test]
    fn test_each_joystick_reported() {
        let mut rec = SystemRecognizer::new();
        let stick = run(&mut rec, "Connected joystick0: VKBsim Gladiator EVO R  {5E6AE163-0000}");
        assert_eq!(stick[0].value_str(), Some("VKBsim Gladiator EVO R"));
        assert_eq!(run(&mut rec, "Connected joystick1: VKBsim Gladiator EVO L {5E6AE164-0000}").len(), 1);
        assert!(run(&mut rec, "Connected joystick0: VKBsim Gladiator EVO R {5E6AE163-0000}").is_empty());
    }
}
