//! The async watcher end to end on a temporary log file.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;
use verse_watch::config::WatchConfig;
use verse_watch::event::{EventKind, Level};
use verse_watch::pipeline::Emitted;
use verse_watch::recognizer::{CustomPatternSpec, PatternOverride};
use verse_watch::watcher::{ConnectionState, LogWatcher, WatchEvent, WatcherError, WatcherHandle};

const WAIT: Duration = Duration::from_secs(5);

fn config(path: PathBuf) -> WatchConfig {
    WatchConfig {
        log_path: Some(path),
        poll_interval_ms: 20,
        fs_events: false,
        ..WatchConfig::default()
    }
}

fn append(path: &Path, text: &str) {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(text.as_bytes()).unwrap();
}

async fn next_event(rx: &mut mpsc::Receiver<WatchEvent>) -> WatchEvent {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for watcher event")
        .expect("watcher closed its channel")
}

async fn next_game(rx: &mut mpsc::Receiver<WatchEvent>) -> Emitted {
    loop {
        if let WatchEvent::Game(emitted) = next_event(rx).await {
            return emitted;
        }
    }
}

async fn wait_for_state(handle: &WatcherHandle, state: ConnectionState) {
    let mut status = handle.subscribe();
    tokio::time::timeout(WAIT, status.wait_for(|s| s.state == state))
        .await
        .expect("timed out waiting for watcher state")
        .expect("watcher dropped its status");
}

#[tokio::test]
async fn test_appended_lines_become_events_in_order() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("Game.log");
    append(&path, "<Actor Death> CActor::Kill: 'Old' killed by 'Older' using 'X'\n");

    let (handle, mut rx) = LogWatcher::spawn(config(path.clone())).unwrap();
    wait_for_state(&handle, ConnectionState::Watching).await;

    append(
        &path,
        "<Actor Death> CActor::Kill: 'A' killed by 'B' using 'W'\nPlayer 'A' started suffocating\n",
    );

    let death = next_game(&mut rx).await;
    assert_eq!(death.event.kind, EventKind::Death);
    assert_eq!(death.event.field("details").unwrap()["victim"], "A");
    let status = next_game(&mut rx).await;
    assert_eq!(status.event.kind, EventKind::Status);
    assert_eq!(status.event.value_str(), Some("suffocating"));

    handle.stop().await;
}

#[tokio::test]
async fn test_rotation_emits_restart() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("Game.log");
    append(&path, "");

    let (handle, mut rx) = LogWatcher::spawn(config(path.clone())).unwrap();
    wait_for_state(&handle, ConnectionState::Watching).await;

    append(&path, "Player 'A' started suffocating\nPlayer 'A' started depressurization\n");
    next_game(&mut rx).await;
    next_game(&mut rx).await;

    std::fs::write(&path, "Player 'B' started suffocating\n").unwrap();

    assert!(matches!(next_event(&mut rx).await, WatchEvent::Rotated(p) if p == path));
    let restart = next_game(&mut rx).await;
    assert_eq!(restart.event.kind, EventKind::GameRestart);
    let fresh = next_game(&mut rx).await;
    assert_eq!(fresh.event.value_str(), Some("suffocating"));

    handle.stop().await;
}

#[tokio::test]
async fn test_missing_file_reported_then_recovered() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("Game.log");

    let (handle, mut rx) = LogWatcher::spawn(config(path.clone())).unwrap();
    wait_for_state(&handle, ConnectionState::Error).await;
    let status = handle.status();
    assert!(status.reason.unwrap().contains("missing"));
    assert_eq!(status.path.as_deref(), Some(path.as_path()));

    append(&path, "");
    wait_for_state(&handle, ConnectionState::Watching).await;
    append(&path, "Player 'A' started suffocating\n");
    assert_eq!(next_game(&mut rx).await.event.kind, EventKind::Status);

    handle.stop().await;
}

#[tokio::test]
async fn test_deleted_and_recreated_log_restarts_session() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("Game.log");
    append(&path, "");

    let (handle, mut rx) = LogWatcher::spawn(config(path.clone())).unwrap();
    wait_for_state(&handle, ConnectionState::Watching).await;
    append(&path, "Player 'A' started suffocating\n");
    next_game(&mut rx).await;

    std::fs::remove_file(&path).unwrap();
    wait_for_state(&handle, ConnectionState::Error).await;

    append(
        &path,
        "Player 'B' started depressurization after a much longer first line\nPlayer 'B' started suffocating\n",
    );
    assert!(matches!(next_event(&mut rx).await, WatchEvent::Rotated(p) if p == path));
    assert_eq!(next_game(&mut rx).await.event.kind, EventKind::GameRestart);
    assert_eq!(next_game(&mut rx).await.event.value_str(), Some("depressurizing"));
    assert_eq!(next_game(&mut rx).await.event.value_str(), Some("suffocating"));
    wait_for_state(&handle, ConnectionState::Watching).await;

    handle.stop().await;
}

#[tokio::test]
async fn test_custom_patterns_validated_through_handle() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("Game.log");
    append(&path, "");

    let (handle, mut rx) = LogWatcher::spawn(config(path.clone())).unwrap();
    wait_for_state(&handle, ConnectionState::Watching).await;

    let err = handle
        .set_custom_patterns(vec![CustomPatternSpec::new("(", Level::Info)])
        .await
        .unwrap_err();
    assert!(matches!(err, WatcherError::Pattern(_)));

    let count = handle
        .set_custom_patterns(vec![CustomPatternSpec::new("Beacon (\\w+)", Level::Info).with_message("Beacon $1")])
        .await
        .unwrap();
    assert_eq!(count, 1);

    append(&path, "(\nBeacon Citizen42 nearby\n");
    let custom = next_game(&mut rx).await;
    assert_eq!(custom.event.kind, EventKind::Custom);
    assert_eq!(custom.event.value_str(), Some("Citizen42"));

    handle.stop().await;
}

#[tokio::test]
async fn test_pattern_overrides_through_handle() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("Game.log");
    append(&path, "");

    let (handle, mut rx) = LogWatcher::spawn(config(path.clone())).unwrap();
    wait_for_state(&handle, ConnectionState::Watching).await;

    let mut overrides = BTreeMap::new();
    overrides.insert("combat.suffocating".to_string(), PatternOverride::disable());
    overrides.insert("combat.depressurizing".to_string(), PatternOverride::replace("/cabin breach/i"));
    assert_eq!(handle.set_pattern_overrides(overrides).await.unwrap(), 2);

    let mut bad = BTreeMap::new();
    bad.insert("combat".to_string(), PatternOverride::disable());
    let err = handle.set_pattern_overrides(bad).await.unwrap_err();
    assert!(matches!(err, WatcherError::Override(_)));

    append(&path, "Player 'A' started suffocating\nCABIN BREACH on deck 2\n");
    let status = next_game(&mut rx).await;
    assert_eq!(status.event.value_str(), Some("depressurizing"));

    handle.stop().await;
}

#[tokio::test]
async fn test_backfill_classifies_history_without_unknowns() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("Game.log");
    append(
        &path,
        "Player 'A' started suffocating\n<Historic Unmatched> line from before the watcher\n",
    );

    let mut cfg = config(path.clone());
    cfg.backfill_lines = 10;
    let (handle, mut rx) = LogWatcher::spawn(cfg).unwrap();

    assert_eq!(next_game(&mut rx).await.event.value_str(), Some("suffocating"));
    wait_for_state(&handle, ConnectionState::Watching).await;
    assert_eq!(handle.unknown_snapshot().await.unwrap().total_groups, 0);

    append(&path, "<Live Unmatched> line after the watcher started\n");
    tokio::time::timeout(WAIT, async {
        loop {
            if handle.unknown_snapshot().await.unwrap().total_groups == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("live unknown line was not grouped");

    handle.clear_unknowns().await.unwrap();
    match next_event(&mut rx).await {
        WatchEvent::Unknowns(snapshot) => assert_eq!(snapshot.total_groups, 0),
        other => panic!("unexpected event: {other:?}"),
    }

    handle.stop().await;
}

#[tokio::test]
async fn test_stop_sets_idle() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("Game.log");
    append(&path, "");

    let (handle, _rx) = LogWatcher::spawn(config(path)).unwrap();
    let mut status = handle.subscribe();
    wait_for_state(&handle, ConnectionState::Watching).await;
    handle.stop().await;
    assert_eq!(status.borrow_and_update().state, ConnectionState::Idle);
}
