//! mrc-bridge 命令行测试

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn bridge(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mrc-bridge").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.path())
        .env("HOME", home.path())
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_relay_without_connection() {
    let home = TempDir::new().unwrap();
    let log = home.path().join("log.txt");

    bridge(&home)
        .arg("--log-file")
        .arg(&log)
        .write_stdin("MOVJ 1 2 3 4 5 6\n")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "MRC remote\nuse CONNECT <serialport> to open a connection\nSMS:Working...\n",
        ))
        .stdout(predicate::str::ends_with(
            "use CONNECT <serialport> to open a connection\n",
        ));

    let journal = std::fs::read_to_string(&log).unwrap();
    assert!(journal.contains(" R: MOVJ 1 2 3 4 5 6"));
}

#[test]
fn test_relay_connect_failure() {
    let home = TempDir::new().unwrap();

    bridge(&home)
        .arg("--log-file")
        .arg(home.path().join("log.txt"))
        .write_stdin("CONNECT /nonexistent/ttyMRC\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("connection failed:"))
        .stdout(predicate::str::ends_with("SMS:Not connected\n"));
}

#[test]
fn test_relay_unwritable_log() {
    let home = TempDir::new().unwrap();

    bridge(&home)
        .arg("--log-file")
        .arg(home.path().join("missing").join("log.txt"))
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open log file"));
}

#[test]
fn test_config_prints_effective_values() {
    let home = TempDir::new().unwrap();

    bridge(&home)
        .args(["--baud", "19200", "--dedup-status", "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("baud_rate = 19200"))
        .stdout(predicate::str::contains("dedup_status = true"))
        .stdout(predicate::str::contains("read_timeout_ms = 500"));
}

#[test]
fn test_config_file_is_loaded() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("bridge.toml");
    std::fs::write(&path, "poll_interval_ms = 20\n").unwrap();

    bridge(&home)
        .arg("--config")
        .arg(&path)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("poll_interval_ms = 20"));
}

#[test]
fn test_send_missing_program() {
    let home = TempDir::new().unwrap();

    bridge(&home)
        .args(["send", "/nonexistent/Program.mril", "--port", "/dev/null"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read program"));
}
