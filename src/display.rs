//! Colored CLI display utilities for watcher output.
//!
//! This module provides functions for printing colored, formatted game
//! events, unknown line groups and watcher status to the terminal.

use std::io::Write;

use chrono::Local;
use owo_colors::OwoColorize;
use serde_json::Value;

use crate::event::{EventKind, GameEvent, Level};
use crate::pipeline::{Emitted, UnknownSnapshot};
use crate::recognizer::PatternHit;
use crate::watcher::{ConnectionState, WatchStatus};

fn clock() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

const VALUE_WIDTH: usize = 80;
const FIELD_WIDTH: usize = 40;

/// Shorten `s` to at most `width` characters, ending in `…` when cut.
#[must_use]
pub fn clip(s: &str, width: usize, raw: bool) -> String {
    if raw || s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Render an event value. Objects become `key=value` pairs without nulls.
#[must_use]
pub fn format_value(value: &Value, raw: bool) -> String {
    match value {
        Value::String(text) => clip(text, VALUE_WIDTH, raw),
        Value::Object(map) => {
            let fields: Vec<String> = map
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(key, v)| match v {
                    Value::String(text) => format!("{key}={}", clip(text, FIELD_WIDTH, raw)),
                    other => format!("{key}={}", clip(&other.to_string(), FIELD_WIDTH, raw)),
                })
                .collect();
            fields.join(", ")
        }
        other => clip(&other.to_string(), VALUE_WIDTH, raw),
    }
}

/// Parse a `#rrggbb` color tag.
#[must_use]
pub fn parse_hex_color(tag: &str) -> Option<(u8, u8, u8)> {
    let hex = tag.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// One-line summary of an event without colors.
#[must_use]
pub fn summarize(event: &GameEvent, raw: bool) -> String {
    let mut summary = format_value(&event.value, raw);
    if let Some(subtype) = &event.subtype {
        summary.push_str(&format!(" ({subtype})"));
    }
    if let Some(id) = &event.id {
        summary.push_str(&format!(" id={}", clip(id, 12, raw)));
    }
    for key in ["title", "message", "details"] {
        if let Some(extra) = event.field(key) {
            summary.push_str(&format!(" {key}: {}", format_value(extra, raw)));
        }
    }
    summary
}

fn paint_tag(event: &GameEvent) -> String {
    let tag = format!("[{}]", event.kind);
    if let Some((r, g, b)) = event.field("color").and_then(Value::as_str).and_then(parse_hex_color) {
        return tag.truecolor(r, g, b).bold().to_string();
    }
    match event.level {
        Level::Critical => return tag.red().bold().to_string(),
        Level::Warning => return tag.yellow().bold().to_string(),
        Level::Info => {}
    }
    match event.kind {
        EventKind::Location
        | EventKind::LocationRaw
        | EventKind::LocationHint
        | EventKind::NewLocation
        | EventKind::System
        | EventKind::Zone
        | EventKind::Jurisdiction
        | EventKind::Quantum => tag.cyan().bold().to_string(),
        EventKind::ShipEnter
        | EventKind::ShipExit
        | EventKind::HangarState
        | EventKind::HangarAssigned
        | EventKind::HangarRequest
        | EventKind::Docking => tag.blue().bold().to_string(),
        EventKind::MissionAccepted
        | EventKind::MissionObjective
        | EventKind::MissionStatus
        | EventKind::MissionChanged
        | EventKind::ContractAvailable => tag.magenta().bold().to_string(),
        EventKind::Death | EventKind::VehicleDestruction | EventKind::VehicleDeath | EventKind::HazardFire => {
            tag.red().bold().to_string()
        }
        EventKind::Economy | EventKind::Mining | EventKind::Salvage | EventKind::Engineering => {
            tag.green().bold().to_string()
        }
        _ => tag.white().bold().to_string(),
    }
}

/// Print a classified event.
pub fn print_event(emitted: &Emitted, raw: bool) {
    let event = &emitted.event;
    let alert = if emitted.alert {
        format!(" {}", "ALERT".red().bold())
    } else {
        String::new()
    };
    println!(
        "{} {}{} {}",
        clock().dimmed(),
        paint_tag(event),
        alert,
        summarize(event, raw)
    );
    let _ = std::io::stdout().flush();
}

/// Print an event as a JSON line.
pub fn print_event_json(emitted: &Emitted) {
    match serde_json::to_string(emitted) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!(error = %e, "Failed to serialize event"),
    }
    let _ = std::io::stdout().flush();
}

/// Print a rotation notice.
pub fn print_rotated(path: &std::path::Path) {
    println!(
        "{} {} {}",
        clock().dimmed(),
        "[ROTATED]".yellow().bold(),
        path.display()
    );
    let _ = std::io::stdout().flush();
}

/// Print the most frequent unknown line groups.
pub fn print_unknowns(snapshot: &UnknownSnapshot, limit: usize, raw: bool) {
    println!(
        "{} {} group(s) of unmatched lines",
        "[UNKNOWN]".magenta().bold(),
        snapshot.total_groups
    );
    for group in snapshot.groups.iter().take(limit) {
        println!(
            "  {:>6}  {}  {}",
            group.count.bold(),
            clip(&group.group, 40, raw).cyan(),
            clip(&group.sample, 100, raw).dimmed()
        );
    }
    let _ = std::io::stdout().flush();
}

/// Print a watcher status change.
pub fn print_status(status: &WatchStatus) {
    let state = match status.state {
        ConnectionState::Watching => status.state.to_string().green().bold().to_string(),
        ConnectionState::Error => status.state.to_string().red().bold().to_string(),
        ConnectionState::Idle | ConnectionState::Locating => status.state.to_string().dimmed().to_string(),
    };
    let path = status
        .path
        .as_ref()
        .map_or(String::new(), |p| p.display().to_string());
    println!("{} {} {} {}", "[WATCHER]".blue().bold(), state, path.dimmed(), status.reason.as_deref().unwrap_or(""));
    let _ = std::io::stdout().flush();
}

/// Print the patterns that match a line.
pub fn print_explain(line: &str, hits: &[PatternHit]) {
    println!("{} {}", "[LINE]".cyan().bold(), line);
    if hits.is_empty() {
        println!("  {}", "no recognizer pattern matches".dimmed());
    }
    for hit in hits {
        println!("  {}.{}", hit.recognizer.bold(), hit.pattern.green());
    }
    let _ = std::io::stdout().flush();
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
}
