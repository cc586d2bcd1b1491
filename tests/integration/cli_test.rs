//! Command-line tests against the built binary
//!
//! Every test points HOME at a temp dir so the user's real config is never read.

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use crate::helpers::{write_sample_chat, MockCompletions};

const PLANS_ANSWER: &str = r#"{"topic": "plans", "is_new_topic": true,
    "new_topic_reason": "fresh", "importance": 8, "attitudes": "warm", "depth": 7}"#;

fn chatlens(home: &Path) -> Command {
    Command::from_std(chatlens_process(home))
}

/// Unwrapped command, for tests that need the child's pid.
fn chatlens_process(home: &Path) -> std::process::Command {
    let mut cmd = std::process::Command::new(assert_cmd::cargo::cargo_bin("chatlens"));
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG")
        .env_remove("HTTP_PROXY")
        .env_remove("http_proxy")
        .env_remove("ALL_PROXY")
        .env_remove("all_proxy");
    cmd
}

fn write_http_config(home: &Path, service: &MockCompletions) {
    write_config(
        home,
        &format!(
            "[http]\nbase_url = \"{}\"\napi_key_env = \"CHATLENS_TEST_KEY\"\n",
            service.base_url()
        ),
    );
}

fn write_config(home: &Path, contents: &str) {
    let dir = home.join(".config").join("chatlens");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), contents).unwrap();
}

// ============================================================================
// Help and config
// ============================================================================

#[test]
fn help_lists_commands() {
    let home = TempDir::new().unwrap();
    chatlens(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("sessions"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn analyze_without_user_name_is_usage_error() {
    let home = TempDir::new().unwrap();
    chatlens(home.path())
        .args(["analyze", "chat.txt"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("USER_NAME"));
}

#[cfg(unix)]
#[test]
fn config_path_points_into_home() {
    let home = TempDir::new().unwrap();
    chatlens(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("chatlens"))
        .stdout(predicate::str::contains("config.toml"));
}

#[cfg(unix)]
#[test]
fn config_show_prints_defaults() {
    let home = TempDir::new().unwrap();
    chatlens(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[analysis]"))
        .stdout(predicate::str::contains("time_threshold = 1800"))
        .stdout(predicate::str::contains("[http]"))
        .stdout(predicate::str::contains("[moments]"));
}

#[cfg(unix)]
#[test]
fn invalid_config_is_reported() {
    let home = TempDir::new().unwrap();
    write_config(home.path(), "[analysis]\ncheckpoint_interval = 0\n");

    chatlens(home.path())
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("checkpoint_interval"));
}

// ============================================================================
// sessions
// ============================================================================

#[test]
fn sessions_lists_split() {
    let home = TempDir::new().unwrap();
    let chat = write_sample_chat(home.path());

    chatlens(home.path())
        .arg("sessions")
        .arg(&chat)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "11 messages, 4 sessions (gap threshold 1800s)",
        ))
        .stdout(predicate::str::contains("I got the job offer"));
}

#[test]
fn sessions_threshold_flag_changes_split() {
    let home = TempDir::new().unwrap();
    let chat = write_sample_chat(home.path());

    chatlens(home.path())
        .arg("sessions")
        .arg(&chat)
        .args(["--time-threshold", "86400"])
        .assert()
        .success()
        .stdout(predicate::str::contains("11 messages, 2 sessions"));
}

// ============================================================================
// analyze
// ============================================================================

#[test]
fn analyze_missing_file_fails() {
    let home = TempDir::new().unwrap();
    chatlens(home.path())
        .args(["analyze", "does-not-exist.txt", "Alice"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn analyze_empty_transcript_fails_with_hint() {
    let home = TempDir::new().unwrap();
    let chat = home.path().join("empty.txt");
    fs::write(&chat, "nothing that looks like a message\n").unwrap();

    chatlens(home.path())
        .arg("analyze")
        .arg(&chat)
        .arg("Alice")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No messages found"));
}

#[cfg(unix)]
#[test]
fn analyze_http_without_api_key_is_unavailable() {
    let home = TempDir::new().unwrap();
    let chat = write_sample_chat(home.path());
    write_config(home.path(), "[http]\napi_key_env = \"CHATLENS_TEST_MISSING_KEY\"\n");

    chatlens(home.path())
        .env_remove("CHATLENS_TEST_MISSING_KEY")
        .arg("analyze")
        .arg(&chat)
        .args(["Alice", "--agent", "http", "-q"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not available"));
}

#[cfg(unix)]
#[test]
fn analyze_against_http_service_writes_reports() {
    let home = TempDir::new().unwrap();
    let chat = write_sample_chat(home.path());
    let out = home.path().join("results");
    let service = MockCompletions::answering(PLANS_ANSWER);
    write_http_config(home.path(), &service);

    chatlens(home.path())
        .env("CHATLENS_TEST_KEY", "test-key")
        .arg("analyze")
        .arg(&chat)
        .args(["Alice", "--agent", "http", "--retry-delay", "0", "-q"])
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("analysis_results.json"));
    assert_eq!(service.request_count(), 4);

    let raw = fs::read_to_string(out.join("analysis_results.json")).unwrap();
    let results: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(results["session_count"], 4);
    assert_eq!(results["message_count"], 11);
    assert_eq!(results["topic_initiation"]["user"], 2);
    assert_eq!(results["topic_initiation"]["partner"], 2);
    assert_eq!(results["key_discussions"].as_array().unwrap().len(), 4);
    assert_eq!(results["topic_counts"][0]["topic"], "plans");
    assert_eq!(results["topic_counts"][0]["count"], 4);

    let summary = fs::read_to_string(out.join("summary_report.txt")).unwrap();
    assert!(summary.starts_with("Chat Analysis Report"));
    assert!(summary.contains("plans: 4 discussions"));

    // The checkpoint stays behind so a rerun regenerates reports without calls
    assert!(out.join("intermediate_results.json").exists());
    chatlens(home.path())
        .env("CHATLENS_TEST_KEY", "test-key")
        .arg("analyze")
        .arg(&chat)
        .args(["Alice", "--agent", "http", "-q"])
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success();
    assert_eq!(service.request_count(), 4);
}

#[cfg(unix)]
#[test]
fn sigint_during_analysis_exits_130_with_checkpoint() {
    let home = TempDir::new().unwrap();
    let chat = write_sample_chat(home.path());
    let out = home.path().join("results");
    let service = MockCompletions::answering_slowly(PLANS_ANSWER, Duration::from_secs(2));
    write_http_config(home.path(), &service);

    let child = chatlens_process(home.path())
        .env("CHATLENS_TEST_KEY", "test-key")
        .arg("analyze")
        .arg(&chat)
        .args(["Alice", "--agent", "http", "--timeout", "30", "-q"])
        .arg("--output-dir")
        .arg(&out)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .unwrap();

    // Signal handlers are installed before the first request goes out
    let deadline = Instant::now() + Duration::from_secs(20);
    while service.request_count() == 0 {
        assert!(Instant::now() < deadline, "no request reached the service");
        std::thread::sleep(Duration::from_millis(50));
    }
    let rc = unsafe { libc::kill(child.id() as libc::pid_t, libc::SIGINT) };
    assert_eq!(rc, 0);

    let output = child.wait_with_output().unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(130), "stderr: {stderr}");
    assert!(stderr.contains("interrupted"), "stderr: {stderr}");
    assert!(!out.join("analysis_results.json").exists());

    // The in-flight call finished, so its session is in the checkpoint
    let raw = fs::read_to_string(out.join("intermediate_results.json")).unwrap();
    let checkpoint: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(checkpoint["analyzed_sessions"].as_array().unwrap().len(), 1);
}

#[cfg(unix)]
#[test]
fn analyze_with_key_dates_compares_around_each_date() {
    let home = TempDir::new().unwrap();
    let chat = write_sample_chat(home.path());
    let out = home.path().join("results");
    let dates = home.path().join("dates.json");
    fs::write(
        &dates,
        r#"{"relationship_start": {"date": "2023-04-02", "description": "job offer day"}}"#,
    )
    .unwrap();
    let service = MockCompletions::answering(PLANS_ANSWER);
    write_http_config(home.path(), &service);

    chatlens(home.path())
        .env("CHATLENS_TEST_KEY", "test-key")
        .arg("analyze")
        .arg(&chat)
        .args(["Alice", "--retry-delay", "0", "-q"])
        .arg("--key-dates")
        .arg(&dates)
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("key_moments_analysis.json"));

    let raw = fs::read_to_string(out.join("key_moments_analysis.json")).unwrap();
    let moments: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let moment = &moments["attitude_changes"][0];
    assert_eq!(moment["kind"], "relationship_start");
    assert_eq!(moment["description"], "job offer day");
    assert_eq!(moment["before"]["user"]["message_count"], 3);
    assert_eq!(moment["after"]["partner"]["message_count"], 3);
    assert_eq!(moment["change"]["user"]["message_count_change"], -1);
    assert_eq!(moment["before"]["sessions"]["session_count"], 2);
    assert_eq!(moment["after"]["sessions"]["attitudes"]["warm"], 2);

    let summary = fs::read_to_string(out.join("summary_report.txt")).unwrap();
    assert!(summary.contains("5. Key moments"));
}

#[test]
fn analyze_rejects_invalid_key_dates_before_classifying() {
    let home = TempDir::new().unwrap();
    let chat = write_sample_chat(home.path());
    let dates = home.path().join("dates.json");
    fs::write(&dates, r#"{"conflicts": [{"date": "yesterday"}]}"#).unwrap();

    chatlens(home.path())
        .env_remove("ZHIPUAI_API_KEY")
        .arg("analyze")
        .arg(&chat)
        .arg("Alice")
        .arg("--key-dates")
        .arg(&dates)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid key dates file"));
}
