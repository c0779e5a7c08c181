//! Incremental reading across appends and rotations.

use std::io::Write;

use tempfile::TempDir;
use verse_watch::watcher::LogTailer;

fn append(path: &std::path::Path, text: &str) {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(text.as_bytes()).unwrap();
}

#[tokio::test]
async fn test_rotation_does_not_replay_previous_generation() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("Game.log");
    append(&path, "old 1\nold 2\nold 3\n");

    let mut tailer = LogTailer::new(path.clone());
    let first = tailer.read_new_lines().await.unwrap();
    assert_eq!(first.lines.len(), 3);

    std::fs::write(&path, "new 1\n").unwrap();
    let rotated = tailer.read_new_lines().await.unwrap();
    assert!(rotated.rotated);
    let texts: Vec<&str> = rotated.lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["new 1"]);
    assert_eq!(rotated.lines[0].offset, 0);

    append(&path, "new 2\n");
    let next = tailer.read_new_lines().await.unwrap();
    assert!(!next.rotated);
    let texts: Vec<&str> = next.lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["new 2"]);
}

#[tokio::test]
async fn test_missing_file_recovers_when_recreated() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("Game.log");
    append(&path, "before\n");

    let mut tailer = LogTailer::new(path.clone());
    tailer.read_new_lines().await.unwrap();

    std::fs::remove_file(&path).unwrap();
    assert!(tailer.read_new_lines().await.is_err());

    append(&path, "after\n");
    let batch = tailer.read_new_lines().await.unwrap();
    assert!(batch.rotated);
    assert_eq!(batch.lines[0].text, "after");
}

#[tokio::test]
async fn test_split_write_reassembled() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("Game.log");
    append(&path, "");

    let mut tailer = LogTailer::new(path.clone());
    for piece in ["<Actor Death> CActor::Kill: ", "'A' killed by 'B' ", "using 'W'\r\n"] {
        append(&path, piece);
        let batch = tailer.read_new_lines().await.unwrap();
        if piece.ends_with('\n') {
            assert_eq!(batch.lines.len(), 1);
            assert_eq!(batch.lines[0].text, "<Actor Death> CActor::Kill: 'A' killed by 'B' using 'W'");
        } else {
            assert!(batch.lines.is_empty());
        }
    }
}

#[tokio::test]
async fn test_recreated_larger_file_read_from_start() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("Game.log");
    append(&path, "aaaa\n");

    let mut tailer = LogTailer::new(path.clone());
    assert_eq!(tailer.read_new_lines().await.unwrap().lines.len(), 1);

    std::fs::remove_file(&path).unwrap();
    assert!(tailer.read_new_lines().await.is_err());

    append(&path, "new generation line one\nline two\n");
    let batch = tailer.read_new_lines().await.unwrap();
    assert!(batch.rotated);
    let texts: Vec<&str> = batch.lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["new generation line one", "line two"]);
    assert_eq!(batch.lines[0].offset, 0);

    append(&path, "line three\n");
    assert!(!tailer.read_new_lines().await.unwrap().rotated);
}
