//! Integration tests for the `retreat-calendar` CLI binary.
//!
//! These tests use `assert_cmd` and `predicates` to exercise the expand, check,
//! and stats subcommands through the actual binary, including stdin/stdout
//! piping, file I/O, and error handling.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;

/// Helper: path to the events.json fixture.
fn events_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/events.json")
}

/// Helper: path to the broken.json fixture.
fn broken_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/broken.json")
}

fn occurrences(stdout: &[u8]) -> Vec<serde_json::Value> {
    serde_json::from_slice(stdout).expect("stdout should be a JSON array")
}

// ─────────────────────────────────────────────────────────────────────────────
// Expand subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn expand_file_to_stdout() {
    let output = Command::cargo_bin("retreat-calendar")
        .unwrap()
        .args(["expand", "-i", events_path()])
        .output()
        .expect("expand should run");

    assert!(output.status.success());
    let occ = occurrences(&output.stdout);
    // 1 plain + 4 expanded + 1 unexpanded fallback.
    assert_eq!(occ.len(), 6);
    assert_eq!(occ[0]["id"], "evt-silent-retreat");
    assert_eq!(occ[2]["start"], "2025-01-08T17:00:00Z");
    assert_eq!(occ[2]["end"], "2025-01-08T18:00:00Z");
    assert_eq!(occ[2]["recurring"], true);
    assert_eq!(occ[5]["id"], "evt-garden-day");
    assert_eq!(occ[5]["recurring"], false);
}

#[test]
fn expand_reports_unexpanded_rules_on_stderr() {
    Command::cargo_bin("retreat-calendar")
        .unwrap()
        .args(["expand", "-i", events_path()])
        .assert()
        .success()
        .stderr(predicate::str::contains("evt-garden-day"))
        .stderr(predicate::str::contains("fortnightly"));
}

#[test]
fn expand_stdin_with_range() {
    let input = std::fs::read_to_string(events_path()).expect("events.json fixture must exist");

    let output = Command::cargo_bin("retreat-calendar")
        .unwrap()
        .args(["expand", "--range", "upcoming", "--now", "2025-03-01T00:00:00Z"])
        .write_stdin(input)
        .output()
        .expect("expand should run");

    assert!(output.status.success());
    let occ = occurrences(&output.stdout);
    assert_eq!(occ.len(), 1);
    assert_eq!(occ[0]["id"], "evt-garden-day");
}

#[test]
fn expand_file_to_file() {
    let output_path = std::env::temp_dir().join("retreat-calendar-expand-output.json");
    let _ = std::fs::remove_file(&output_path);

    Command::cargo_bin("retreat-calendar")
        .unwrap()
        .args(["expand", "-i", events_path(), "-o"])
        .arg(&output_path)
        .assert()
        .success();

    let content = std::fs::read_to_string(&output_path).expect("output file must exist");
    assert!(content.contains("Centering Prayer"));

    let _ = std::fs::remove_file(&output_path);
}

#[test]
fn expand_accepts_query_envelope() {
    let input = r#"{"result":[{"_id":"a","title":"A","start":"2025-01-01T10:00:00Z"}]}"#;

    Command::cargo_bin("retreat-calendar")
        .unwrap()
        .arg("expand")
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\": \"a\""));
}

#[test]
fn expand_invalid_record_fails() {
    Command::cargo_bin("retreat-calendar")
        .unwrap()
        .args(["expand", "-i", broken_path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("evt-no-start"));
}

#[test]
fn expand_invalid_json_fails() {
    Command::cargo_bin("retreat-calendar")
        .unwrap()
        .arg("expand")
        .write_stdin("not json {{{")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not valid JSON"));
}

#[test]
fn expand_unknown_timezone_fails() {
    Command::cargo_bin("retreat-calendar")
        .unwrap()
        .args(["expand", "-i", events_path(), "--timezone", "Mars/Olympus_Mons"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid timezone"));
}

#[test]
fn expand_unknown_range_is_a_usage_error() {
    Command::cargo_bin("retreat-calendar")
        .unwrap()
        .args(["expand", "-i", events_path(), "--range", "someday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("someday"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Check subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn check_reports_every_problem() {
    Command::cargo_bin("retreat-calendar")
        .unwrap()
        .args(["check", "-i", broken_path()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("evt-no-start"))
        .stdout(predicate::str::contains("funday"))
        .stdout(predicate::str::contains("2 of 3 records have problems"));
}

#[test]
fn check_flags_unknown_frequency() {
    Command::cargo_bin("retreat-calendar")
        .unwrap()
        .args(["check", "-i", events_path()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("evt-garden-day"));
}

#[test]
fn check_clean_input_succeeds() {
    let input = r#"[{"_id":"a","title":"A","start":"2025-01-01T10:00:00Z",
        "recurrence":{"isRecurring":true,"frequency":"daily","count":3}}]"#;

    Command::cargo_bin("retreat-calendar")
        .unwrap()
        .arg("check")
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains("ok: 1 records"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Stats subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn stats_from_file() {
    Command::cargo_bin("retreat-calendar")
        .unwrap()
        .args(["stats", "-i", events_path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Events:       3"))
        .stdout(predicate::str::contains("Recurring:    2"))
        .stdout(predicate::str::contains("Occurrences:  6"))
        .stdout(predicate::str::contains("Unexpanded:   1"));
}

#[test]
fn no_subcommand_shows_usage() {
    Command::cargo_bin("retreat-calendar")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
