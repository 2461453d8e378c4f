//! CLI binary smoke tests using assert_cmd.
//!
//! These tests exercise the compiled `healthrisk` binary to verify that
//! argument parsing, help text, and error handling work end-to-end.

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("healthrisk").unwrap()
}

// ---------------------------------------------------------------------------
// Top-level
// ---------------------------------------------------------------------------

#[test]
fn no_args_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_flag() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("train"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("healthrisk"));
}

// ---------------------------------------------------------------------------
// config subcommand
// ---------------------------------------------------------------------------

#[test]
fn config_prints_default_template() {
    let output = cmd().arg("config").output().unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["target_column"], "disease_risk");
    assert_eq!(value["random_state"], 42);
    assert_eq!(value["cv_folds"], 5);
    assert_eq!(value["model"], "Logistic Regression");
}

// ---------------------------------------------------------------------------
// train subcommand
// ---------------------------------------------------------------------------

#[test]
fn train_missing_data_file_fails() {
    cmd()
        .args(["train", "--data", "/nonexistent/health.csv"])
        .env("HEALTHRISK_LOG", "error")
        .assert()
        .failure()
        .stderr(predicate::str::contains("File does not exist"));
}

#[test]
fn train_rejects_non_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("health.tsv");
    std::fs::write(&path, "a\tb\n").unwrap();
    cmd()
        .args(["train", "--data", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains(".csv extension"));
}

#[test]
fn train_model_conflicts_with_all_models() {
    cmd()
        .args(["train", "--model", "SVC", "--all-models"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn train_logistic_regression_logs_runs_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("health.csv");
    common::write_health_csv(&data, 300);
    let root = dir.path().join("mlruns");
    let report = dir.path().join("report.html");

    cmd()
        .args([
            "train",
            "--data",
            data.to_str().unwrap(),
            "--tracking-root",
            root.to_str().unwrap(),
            "--report",
            report.to_str().unwrap(),
        ])
        .env("HEALTHRISK_LOG", "info")
        .assert()
        .success()
        .stderr(predicate::str::contains("Duplicates removed: 1"))
        .stderr(predicate::str::contains(
            "Best model based on Recall: Logistic Regression",
        ));

    let experiment = root.join("Disease_Risk_Classification_SMOTE");
    let runs: Vec<_> = std::fs::read_dir(&experiment).unwrap().collect();
    assert_eq!(runs.len(), 2, "one model run plus the comparison summary");
    let html = std::fs::read_to_string(&report).unwrap();
    assert!(html.contains("Logistic Regression"));
}

// ---------------------------------------------------------------------------
// serve subcommand
// ---------------------------------------------------------------------------

#[test]
fn serve_rejects_invalid_port() {
    cmd()
        .args(["serve", "--port", "not-a-port"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
