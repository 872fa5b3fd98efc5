//! Basic CLI E2E tests.
//!
//! Each test runs the binary against its own temporary data directory.

use std::process::Stdio;
use std::time::Duration;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cli(data_dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("pomodrift-cli");
    cmd.env("POMODRIFT_DATA_DIR", data_dir.path())
        .env("RUST_LOG", "off");
    cmd
}

/// Run a CLI command and parse every JSON document it printed.
fn run_json(data_dir: &TempDir, args: &[&str]) -> Vec<serde_json::Value> {
    let output = cli(data_dir).args(args).assert().success().get_output().stdout.clone();
    let stdout = String::from_utf8(output).unwrap();
    serde_json::Deserializer::from_str(&stdout)
        .into_iter::<serde_json::Value>()
        .map(|value| value.unwrap())
        .collect()
}

#[test]
fn test_timer_status_defaults() {
    let dir = TempDir::new().unwrap();
    let docs = run_json(&dir, &["timer", "status"]);
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["state"]["mode"], "work");
    assert_eq!(docs[0]["state"]["remaining"], 1500);
    assert_eq!(docs[0]["state"]["running"], false);
    assert_eq!(docs[0]["display"], "25:00");
}

#[test]
fn test_timer_mode_then_status() {
    let dir = TempDir::new().unwrap();
    let docs = run_json(&dir, &["timer", "mode", "work", "--duration", "10"]);
    assert_eq!(docs[0]["type"], "mode_changed");
    assert_eq!(docs[0]["state"]["workDuration"], 10);

    let docs = run_json(&dir, &["timer", "status"]);
    assert_eq!(docs[0]["state"]["duration"], 10);
    assert_eq!(docs[0]["state"]["remaining"], 10);
}

#[test]
fn test_timer_break_mode_uses_break_length() {
    let dir = TempDir::new().unwrap();
    let docs = run_json(&dir, &["timer", "mode", "break"]);
    assert_eq!(docs[0]["state"]["mode"], "break");
    assert_eq!(docs[0]["state"]["duration"], 300);
    assert_eq!(docs[0]["state"]["workDuration"], 1500);
}

#[test]
fn test_timer_start_pause_reset() {
    let dir = TempDir::new().unwrap();
    let docs = run_json(&dir, &["timer", "start"]);
    assert_eq!(docs[0]["type"], "started");
    assert_eq!(docs[0]["state"]["running"], true);
    assert!(docs[0]["state"]["startTime"].is_i64());

    let docs = run_json(&dir, &["timer", "status"]);
    assert_eq!(docs[0]["state"]["running"], true);

    let docs = run_json(&dir, &["timer", "pause"]);
    assert_eq!(docs[0]["type"], "paused");
    assert_eq!(docs[0]["state"]["running"], false);
    assert!(docs[0]["state"]["startTime"].is_null());

    let docs = run_json(&dir, &["timer", "reset"]);
    assert_eq!(docs[0]["type"], "reset");
    assert_eq!(docs[0]["state"]["remaining"], 1500);
}

#[test]
fn test_timer_progress_end_of_cycle() {
    let dir = TempDir::new().unwrap();
    let docs = run_json(&dir, &["timer", "progress", "1"]);
    assert_eq!(docs[0]["type"], "progress_changed");
    assert_eq!(docs[0]["state"]["mode"], "break");
    assert_eq!(docs[0]["state"]["remaining"], 0);

    let docs = run_json(&dir, &["timer", "progress", "-0.5"]);
    assert_eq!(docs[0]["state"]["mode"], "work");
    assert_eq!(docs[0]["state"]["remaining"], 1500);
}

#[test]
fn test_timer_tick_when_stopped_prints_status() {
    let dir = TempDir::new().unwrap();
    let docs = run_json(&dir, &["timer", "tick"]);
    assert_eq!(docs[0]["state"]["running"], false);
    assert!(docs[0].get("type").is_none());
}

#[test]
fn test_timer_run_prints_event_lines() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args(["config", "set", "timer.tick_interval_ms", "100"])
        .assert()
        .success();
    cli(&dir)
        .args(["timer", "mode", "work", "--duration", "600"])
        .assert()
        .success();

    let mut child = std::process::Command::new(assert_cmd::cargo_bin!("pomodrift-cli"))
        .args(["timer", "run"])
        .env("POMODRIFT_DATA_DIR", dir.path())
        .env("RUST_LOG", "off")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    std::thread::sleep(Duration::from_millis(1_500));
    child.kill().unwrap();
    let output = child.wait_with_output().unwrap();

    let stdout = String::from_utf8(output.stdout).unwrap();
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert!(events.len() > 1, "expected start and ticks, got {stdout:?}");
    assert_eq!(events[0]["type"], "started");
    assert!(events[1..].iter().all(|event| event["type"] == "ticked"));
    assert!(events.iter().all(|event| event["state"]["running"] == true));

    // Killed without a pause, so the persisted timer is still running.
    let docs = run_json(&dir, &["timer", "status"]);
    assert_eq!(docs[0]["state"]["running"], true);
    assert_eq!(docs[0]["state"]["duration"], 600);
}

#[test]
fn test_timer_rejects_unknown_mode() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args(["timer", "mode", "custom"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown timer mode"));
}

#[test]
fn test_config_get_set() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args(["config", "get", "timer.tick_interval_ms"])
        .assert()
        .success()
        .stdout("1000\n");
    cli(&dir)
        .args(["config", "set", "timer.work_duration_secs", "600"])
        .assert()
        .success()
        .stdout("ok\n");

    let docs = run_json(&dir, &["timer", "mode", "work"]);
    assert_eq!(docs[0]["state"]["workDuration"], 600);
}

#[test]
fn test_config_unknown_key_fails() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args(["config", "get", "timer.nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_task_add_select_delete() {
    let dir = TempDir::new().unwrap();
    let output = cli(&dir)
        .args(["task", "add", "Write report"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let id = String::from_utf8(output).unwrap().trim().to_string();
    assert!(!id.is_empty());

    cli(&dir).args(["task", "select", &id]).assert().success();
    let docs = run_json(&dir, &["task", "list"]);
    assert_eq!(docs[0]["tasks"][0]["name"], "Write report");
    assert_eq!(docs[0]["selectedTaskId"], id.as_str());

    cli(&dir).args(["task", "delete", &id]).assert().success();
    let docs = run_json(&dir, &["task", "list"]);
    assert_eq!(docs[0]["tasks"].as_array().unwrap().len(), 0);
    assert!(docs[0]["selectedTaskId"].is_null());
}

#[test]
fn test_task_edit_unknown_fails() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args(["task", "edit", "missing", "Name"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("task not found"));
}
