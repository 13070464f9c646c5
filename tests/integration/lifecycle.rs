#[path = "common/mod.rs"]
mod common;

use std::{fs, time::Instant};

use assert_cmd::Command;
use common::{
    END_MARKER, START_MARKER, count_containing, end_marker_seconds, position_of, read_lines,
    workspace,
};
use predicates::str::contains;

#[test]
fn run_writes_start_and_end_to_default_log() {
    let temp = workspace("[app]\nname = demo\n");
    let dir = temp.path();

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cli-template"));
    cmd.current_dir(dir).assert().success();

    let lines = read_lines(&dir.join("template.log"));
    assert_eq!(count_containing(&lines, START_MARKER), 1);
    assert_eq!(count_containing(&lines, END_MARKER), 1);
    assert!(position_of(&lines, START_MARKER) < position_of(&lines, END_MARKER));
}

#[test]
fn configured_log_file_is_used_and_truncated() {
    let temp = tempfile::tempdir().expect("failed to create tempdir");
    let dir = temp.path();
    let log_path = dir.join("logs/app.log");
    fs::create_dir_all(log_path.parent().unwrap()).unwrap();
    fs::write(&log_path, "line from an earlier run\n").unwrap();
    fs::write(
        dir.join("settings.ini"),
        format!("[logging]\nlog_file = {}\n", log_path.display()),
    )
    .unwrap();

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cli-template"));
    cmd.current_dir(dir)
        .arg("-c")
        .arg("settings.ini")
        .assert()
        .code(0);

    let content = fs::read_to_string(&log_path).unwrap();
    assert!(!content.contains("earlier run"));
    assert!(content.contains(START_MARKER));
    assert!(!dir.join("template.log").exists());
}

#[test]
fn unwritable_log_file_falls_back_with_warning() {
    let temp = workspace("[logging]\nlog_file = /nonexistent-dir-for-tests/app.log\n");
    let dir = temp.path();

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cli-template"));
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stderr(contains("No write access to /nonexistent-dir-for-tests/app.log"));

    let lines = read_lines(&dir.join("template.log"));
    assert_eq!(count_containing(&lines, END_MARKER), 1);
}

#[test]
fn missing_config_exits_with_one() {
    let temp = tempfile::tempdir().expect("failed to create tempdir");
    let dir = temp.path();

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cli-template"));
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg("missing.ini")
        .assert()
        .code(1)
        .stderr(contains("Cannot open configuration file"));

    assert!(!dir.join("template.log").exists());
}

#[test]
fn end_duration_is_bounded_by_wall_clock() {
    let temp = workspace("[app]\n");
    let dir = temp.path();

    let started = Instant::now();
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cli-template"));
    cmd.current_dir(dir).assert().success();
    let observed = started.elapsed().as_secs_f64();

    let lines = read_lines(&dir.join("template.log"));
    let end = position_of(&lines, END_MARKER).expect("END marker present");
    let reported = end_marker_seconds(&lines[end]);
    assert!(reported >= 0.0);
    assert!(reported <= observed, "reported {reported}s > observed {observed}s");
}

#[test]
fn log_lines_have_timestamp_level_target_message() {
    let temp = workspace("[app]\n");
    let dir = temp.path();

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cli-template"));
    cmd.current_dir(dir).assert().success();

    let lines = read_lines(&dir.join("template.log"));
    let start = &lines[position_of(&lines, START_MARKER).unwrap()];
    let fields: Vec<&str> = start.splitn(5, ' ').collect();
    assert_eq!(fields.len(), 5);
    assert_eq!(fields[0].len(), "YYYY-MM-DD".len());
    assert_eq!(fields[2], "CRITICAL");
    assert_eq!(fields[3], "cli_template::lifecycle");
    assert!(fields[4].starts_with(START_MARKER));
}

#[test]
fn log_file_records_info_and_above_only() {
    let temp = workspace("[logging]\nlevel = debug\n");
    let dir = temp.path();

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cli-template"));
    cmd.current_dir(dir).assert().success();

    let lines = read_lines(&dir.join("template.log"));
    assert!(position_of(&lines, START_MARKER).is_some());
    assert!(position_of(&lines, "lifecycle RUNNING -> SUCCESS").is_none());
    assert!(!lines.iter().any(|line| line.contains(" DEBUG ")));
}
