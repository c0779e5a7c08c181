//! User pattern registration through the pipeline.

use std::time::Instant;

use verse_watch::config::WatchConfig;
use verse_watch::event::{EventKind, Level};
use verse_watch::pipeline::Pipeline;
use verse_watch::recognizer::{CustomPatternSpec, PatternError};

#[test]
fn test_invalid_regex_rejected_and_pipeline_survives() {
    let mut pipeline = Pipeline::new(&WatchConfig::default()).unwrap();

    let err = pipeline
        .set_custom_patterns(&[CustomPatternSpec::new("(", Level::Info)])
        .unwrap_err();
    assert_eq!(err.index, 0);
    assert!(matches!(err.source, PatternError::InvalidRegex { .. }));
    assert!(err.to_string().starts_with("Custom pattern #0"));

    let outcome = pipeline.process_line("(", Instant::now());
    assert!(!outcome.matched);
    assert_eq!(pipeline.faults(), 0);
}

#[test]
fn test_user_level_and_template_forwarded() {
    let mut pipeline = Pipeline::new(&WatchConfig::default()).unwrap();
    let spec = CustomPatternSpec::new("/beacon from (\\w+) at (\\w+)/i", Level::Critical)
        .with_message("$1 needs help at $2");
    assert_eq!(pipeline.set_custom_patterns(&[spec]).unwrap(), 1);

    let outcome = pipeline.process_line("Medical BEACON from Citizen42 at Hurston", Instant::now());
    assert!(outcome.matched);
    let custom: Vec<_> = outcome
        .events
        .iter()
        .filter(|e| e.event.kind == EventKind::Custom)
        .collect();
    assert_eq!(custom.len(), 1);
    assert_eq!(custom[0].event.level, Level::Critical);
    assert_eq!(custom[0].event.value_str(), Some("Citizen42"));
    assert_eq!(
        custom[0].event.field("message").and_then(|m| m.as_str()),
        Some("Citizen42 needs help at Hurston")
    );
    assert!(custom[0].alert);
}

#[test]
fn test_disabled_custom_patterns_do_not_match() {
    let config = WatchConfig {
        custom_patterns: vec![CustomPatternSpec::new("Beacon", Level::Info)],
        custom_patterns_enabled: false,
        ..WatchConfig::default()
    };
    let mut pipeline = Pipeline::new(&config).unwrap();
    let line = "Beacon received from someone far away";
    assert!(!pipeline.process_line(line, Instant::now()).matched);

    pipeline.set_custom_enabled(true);
    assert!(pipeline.process_line(line, Instant::now()).matched);
}

#[test]
fn test_explain_reports_custom_rule() {
    let config = WatchConfig {
        custom_patterns: vec![CustomPatternSpec::new("Beacon", Level::Info)],
        ..WatchConfig::default()
    };
    let pipeline = Pipeline::new(&config).unwrap();
    let hits = pipeline.explain("Beacon received");
    assert!(hits.iter().any(|h| h.recognizer == "custom"));
}
