//! CLI integration tests for mssql-script-backup.
//!
//! These tests verify command-line argument parsing, help output,
//! and exit codes for various error conditions.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the mssql-script-backup binary.
fn cmd() -> Command {
    Command::cargo_bin("mssql-script-backup").unwrap()
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_options() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--type"))
        .stdout(predicate::str::contains("--server"))
        .stdout(predicate::str::contains("--connection"))
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--dbs"))
        .stdout(predicate::str::contains("--silent"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mssql-script-backup"));
}

#[test]
fn test_log_format_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"));
}

#[test]
fn test_verbosity_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"));
}

// =============================================================================
// Exit Code Tests - Argument Errors (Exit Code 1)
// =============================================================================

#[test]
fn test_no_arguments_exits_with_code_1() {
    cmd()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("-server:<name> or -connection"));
}

#[test]
fn test_missing_output_exits_with_code_1() {
    cmd()
        .arg("-server:db01")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("-output:<template> is required"));
}

#[test]
fn test_server_and_connection_conflict() {
    cmd()
        .args(["-server:db01", "-connection:Server=db02", "-output:out/{1}.sql"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_unknown_type_exits_with_code_1() {
    cmd()
        .args(["-type:everything", "-server:db01", "-output:out/{1}.sql"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown export type"));
}

#[test]
fn test_bad_template_exits_with_code_1() {
    cmd()
        .args(["-server:db01", "-output:out/{9}.sql"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Template error"));
}

#[test]
fn test_missing_config_exits_with_code_1() {
    cmd()
        .args(["--config", "nonexistent_config_file.yaml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn test_invalid_yaml_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "invalid: yaml: content: [").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap()])
        .assert()
        .code(1);
}

#[test]
fn test_zero_batch_size_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "connection:").unwrap();
    writeln!(file, "  connection_string: Server=db01").unwrap();
    writeln!(file, "output: out/{{1}}.sql").unwrap();
    writeln!(file, "data:").unwrap();
    writeln!(file, "  rows_per_batch: 0").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("rows_per_batch"));
}

// =============================================================================
// Exit Code Tests - Runtime Errors (Exit Code 2)
// =============================================================================

#[test]
fn test_connection_failure_exits_with_code_2() {
    let dir = tempfile::tempdir().unwrap();
    let output = format!("-output:{}/{{1}}.sql", dir.path().display());

    cmd()
        .args([
            "-connection:Server=tcp:127.0.0.1,1;User Id=sa;Password=x;Connect Timeout=2",
            output.as_str(),
            "-silent",
        ])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Running..."))
        .stderr(predicate::str::contains("Sorry an error occurred"))
        .stderr(predicate::str::contains("Unable to connect to the server"));
}

#[test]
fn test_prompt_shown_unless_silent() {
    let dir = tempfile::tempdir().unwrap();
    let output = format!("-output:{}/{{1}}.sql", dir.path().display());

    cmd()
        .args([
            "-connection:Server=tcp:127.0.0.1,1;User Id=sa;Password=x;Connect Timeout=2",
            output.as_str(),
        ])
        .write_stdin("\n")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Press any key to continue"));
}
