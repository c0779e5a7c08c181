//! End-to-end classification through the pipeline.

use std::time::{Duration, Instant};

use serde_json::json;
use verse_watch::config::WatchConfig;
use verse_watch::event::EventKind;
use verse_watch::pipeline::{Emitted, Pipeline};
use verse_watch::recognizer::PatternOverride;

fn new_pipeline() -> Pipeline {
    Pipeline::new(&WatchConfig::default()).unwrap()
}

fn kinds(events: &[Emitted]) -> Vec<EventKind> {
    events.iter().map(|e| e.event.kind).collect()
}

#[test]
fn test_death_then_suffocating_in_order() {
    let mut pipeline = new_pipeline();
    let now = Instant::now();
    let mut events = Vec::new();
    for line in [
        "<Actor Death> CActor::Kill: 'A' killed by 'B' using 'W'",
        "Player 'A' started suffocating",
    ] {
        events.extend(pipeline.process_line(line, now).events);
    }

    assert_eq!(kinds(&events), vec![EventKind::Death, EventKind::Status]);
    assert_eq!(
        events[0].event.field("details"),
        Some(&json!({"victim": "A", "killer": "B", "weapon": "W"}))
    );
    assert_eq!(events[1].event.value_str(), Some("suffocating"));
    assert!(events.iter().all(|e| e.alert));
}

#[test]
fn test_mission_id_correlation_window() {
    let accepted = r#"Notification "Contract Accepted: Deliver Cargo""#;

    let mut pipeline = new_pipeline();
    let t0 = Instant::now();
    pipeline.process_line("MissionID: 42", t0);
    let within = pipeline.process_line(accepted, t0 + Duration::from_secs(4));
    assert_eq!(within.events[0].event.kind, EventKind::MissionAccepted);
    assert_eq!(within.events[0].event.id.as_deref(), Some("42"));

    let mut pipeline = new_pipeline();
    pipeline.process_line("MissionID: 42", t0);
    let late = pipeline.process_line(accepted, t0 + Duration::from_secs(6));
    assert_eq!(late.events[0].event.kind, EventKind::MissionAccepted);
    assert_eq!(late.events[0].event.id, None);
}

#[test]
fn test_configured_mission_window() {
    let config = WatchConfig {
        mission_id_window_ms: 10_000,
        ..WatchConfig::default()
    };
    let mut pipeline = Pipeline::new(&config).unwrap();
    let t0 = Instant::now();
    pipeline.process_line("MissionID: 42", t0);
    let outcome = pipeline.process_line(
        r#"Notification "Contract Accepted: Deliver Cargo""#,
        t0 + Duration::from_secs(8),
    );
    assert_eq!(outcome.events[0].event.id.as_deref(), Some("42"));
}

#[test]
fn test_daymar_location_emitted_once_per_line() {
    let mut pipeline = new_pipeline();
    let line = "<2026-02-21T01:21:50.391Z> [Notice] <GenerateLocationProperty> Generated Locations - Location[OOC_Stanton_2b_Daymar]";
    let now = Instant::now();

    for _ in 0..2 {
        let outcome = pipeline.process_line(line, now);
        let locations: Vec<_> = outcome
            .events
            .iter()
            .filter(|e| e.event.kind == EventKind::Location)
            .collect();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].event.value_str(), Some("Daymar"));
    }
}

#[test]
fn test_repeated_hint_suppressed() {
    let mut pipeline = new_pipeline();
    let line = "<StatObjLoad 0xFF Format> 'objectcontainers/pu/loc/mod/levski/x/'";
    let now = Instant::now();
    let first = pipeline.process_line(line, now);
    let second = pipeline.process_line(line, now);
    assert!(kinds(&first.events).contains(&EventKind::LocationHint));
    assert!(!kinds(&second.events).contains(&EventKind::LocationHint));
}

#[test]
fn test_unknown_lines_share_group_across_timestamps() {
    let mut pipeline = new_pipeline();
    let now = Instant::now();
    for ts in ["2026-02-09T23:19:26.021Z", "2026-02-09T23:45:02.777Z"] {
        let outcome = pipeline.process_line(&format!("<{ts}> [Notice] <Unmapped Telemetry> sample payload"), now);
        assert!(!outcome.matched);
    }

    let snapshot = pipeline.unknown_snapshot();
    assert_eq!(snapshot.total_groups, 1);
    assert_eq!(snapshot.groups[0].group, "Unmapped Telemetry");
    assert_eq!(snapshot.groups[0].count, 2);

    let snapshot = pipeline.ignore_unknown("Unmapped Telemetry");
    assert_eq!(snapshot.total_groups, 0);
    pipeline.process_line("<Unmapped Telemetry> sample payload again", now);
    assert_eq!(pipeline.unknown_snapshot().total_groups, 0);
}

#[test]
fn test_rotation_resets_session_and_emits_restart() {
    let mut pipeline = new_pipeline();
    let now = Instant::now();
    pipeline.process_line("Legacy login response [CIG-net] Handle[Citizen42] ok", now);
    assert_eq!(pipeline.facts().player.as_deref(), Some("Citizen42"));

    let restart = pipeline.rotate();
    assert_eq!(restart.event.kind, EventKind::GameRestart);
    assert_eq!(restart.event.value_str(), Some("restarted"));
    assert!(pipeline.facts().player.is_none());

    let again = pipeline.process_line("Legacy login response [CIG-net] Handle[Citizen42] ok", now);
    assert_eq!(kinds(&again.events), vec![EventKind::PlayerName]);
}

#[test]
fn test_vehicle_destruction_reports_display_ship_name() {
    let mut pipeline = new_pipeline();
    let outcome = pipeline.process_line(
        "<Vehicle Destruction> CVehicle::OnAdvanceDestroyLevel: Vehicle 'ANVL_Paladin_1234567890123' [55] in zone 'space' driven by 'Pilot' [11] advanced from destroy level 0 to 1 caused by 'Pirate' [66]",
        Instant::now(),
    );
    let destruction = outcome
        .events
        .iter()
        .find(|e| e.event.kind == EventKind::VehicleDestruction)
        .unwrap();
    let details = destruction.event.field("details").unwrap();
    assert_eq!(details["vehicle"], "Anvil Paladin");
    assert_eq!(details["vehicleRaw"], "ANVL_Paladin_1234567890123");
}

#[test]
fn test_join_sequence_tracks_connection() {
    let mut pipeline = new_pipeline();
    let now = Instant::now();
    let mut events = Vec::new();
    for line in [
        "<2026-02-09T21:00:01.000Z> [Notice] {SET_ACCOUNT_STATE} state [kAccountLoginSuccess]",
        "<2026-02-09T21:00:02.000Z> grpc-client-endpoint-override='https://use1-pub.grpc.example.net'",
        "<2026-02-09T21:00:03.000Z> [Notice] {SET_CONNECTION_STATE} state [kConnectionState_Connecting]",
        "<2026-02-09T21:00:04.000Z> <CGlobalGameUI::OpenLoadingScreen> open",
        "<2026-02-09T21:00:05.000Z> Loading GameModeRecord='EA_FreeFlight'",
        "<2026-02-09T21:00:09.000Z> <CSessionManager::OnClientConnected> done",
    ] {
        events.extend(pipeline.process_line(line, now).events);
    }

    assert_eq!(
        kinds(&events),
        vec![
            EventKind::AccountLogin,
            EventKind::ServerRegion,
            EventKind::Connection,
            EventKind::Loading,
            EventKind::GameMode,
            EventKind::Connection,
            EventKind::GameJoin,
        ]
    );
    assert_eq!(pipeline.facts().region.as_deref(), Some("use1"));
    assert_eq!(pipeline.facts().connection.as_deref(), Some("IN_GAME"));

    let leave = pipeline.process_line("<CSessionManager::RequestFrontEnd> Request Started", now);
    assert_eq!(kinds(&leave.events), vec![EventKind::GameLeave]);
}

#[test]
fn test_hardware_header_reported_per_generation() {
    let mut pipeline = new_pipeline();
    let now = Instant::now();
    let header = ["GPU: DedicatedVidMemMB = 12282", "Changelist: 9485493"];

    let first: Vec<_> = header.iter().flat_map(|l| pipeline.process_line(l, now).events).collect();
    assert_eq!(kinds(&first), vec![EventKind::SystemVram, EventKind::BuildId]);
    assert_eq!(first[0].event.value_str(), Some("12282MB"));

    let repeat = pipeline.process_line(header[0], now);
    assert!(repeat.matched);
    assert!(repeat.events.is_empty());

    pipeline.rotate();
    assert_eq!(pipeline.process_line(header[0], now).events.len(), 1);
}

#[test]
fn test_overrides_swapped_at_runtime() {
    let mut pipeline = new_pipeline();
    let now = Instant::now();
    let overrides = [("hangar.hangar_request".to_string(), PatternOverride::replace("landing services requested"))]
        .into_iter()
        .collect();
    assert_eq!(pipeline.set_pattern_overrides(&overrides).unwrap(), 1);

    let outcome = pipeline.process_line("ATC: landing services requested for pad 02", now);
    assert_eq!(kinds(&outcome.events), vec![EventKind::HangarRequest]);
    assert!(!pipeline.process_line("local equip request", now).matched);

    let bad = [("hangar.hangar_request".to_string(), PatternOverride::replace("("))]
        .into_iter()
        .collect();
    assert!(pipeline.set_pattern_overrides(&bad).is_err());
    assert!(pipeline.process_line("ATC: landing services requested for pad 02", now).matched);
}
