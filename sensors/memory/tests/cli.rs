//! End-to-end checks of the `sketchysensor-memory` binary.

use std::process::{Command, Output};

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sketchysensor-memory"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("binary should start")
}

#[test]
fn test_unparseable_interval_prints_usage_and_exits_1() {
    let output = run(&["--output", "text", "ram", "abc"]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"), "stdout was: {stdout}");
    assert!(!stdout.contains("--add event"));
}

#[test]
fn test_usage_names_required_positionals() {
    let output = run(&["ram", "abc"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("sketchysensor-memory [OPTIONS] <EVENT_NAME> <INTERVAL>"),
        "stdout was: {stdout}"
    );
    assert!(!stdout.contains("[EVENT_NAME]"));
    assert!(!stdout.contains("[INTERVAL]"));
}

#[test]
fn test_missing_arguments_exit_1() {
    let output = run(&[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Usage"));

    let output = run(&["ram"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_help_exits_successfully() {
    let output = run(&["--help"]);
    assert_eq!(output.status.code(), Some(0));
}

#[cfg(target_os = "linux")]
#[test]
fn test_once_text_output() {
    let output = run(&["--output", "text", "--once", "ram", "2.0"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2, "stdout was: {stdout}");
    assert_eq!(lines[0], "--add event 'ram'");

    let trigger = lines[1];
    assert!(trigger.starts_with("--trigger 'ram' memory_percent='"));
    assert!(trigger.contains(" used_memory='"));
    assert!(trigger.contains(" total_memory='"));

    let percent = trigger
        .split("memory_percent='")
        .nth(1)
        .and_then(|rest| rest.split('\'').next())
        .unwrap();
    assert!(percent.len() >= 2 && percent.chars().all(|c| c.is_ascii_digit()));
}

#[cfg(target_os = "linux")]
#[test]
fn test_once_json_output() {
    let output = run(&["--output", "json", "--once", "ram", "1"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut lines = stdout.lines();
    let add: serde_json::Value = serde_json::from_str(lines.next().unwrap()).unwrap();
    let trigger: serde_json::Value = serde_json::from_str(lines.next().unwrap()).unwrap();

    assert_eq!(add["command"], "add_event");
    assert_eq!(trigger["event"], "ram");
    let total: u64 = trigger["fields"]["total_memory"].as_str().unwrap().parse().unwrap();
    let used: u64 = trigger["fields"]["used_memory"].as_str().unwrap().parse().unwrap();
    assert!(total > 0);
    assert!(used > 0);
}

#[cfg(target_os = "linux")]
#[test]
fn test_check_reports_availability() {
    let output = run(&["--check"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Memory sampler is available"));
}

#[cfg(target_os = "linux")]
#[test]
fn test_logs_to_redirected_stderr_are_plain_text() {
    let output = run(&["--verbose", "--output", "text", "--once", "ram", "1"]);
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("publishing memory usage"), "stderr was: {stderr}");
    assert!(!stderr.contains('\x1b'), "stderr had escape codes: {stderr:?}");
}
