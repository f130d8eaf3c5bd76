//! Integration tests for the doltrun binary.
//!
//! These tests exercise the CLI surfaces that do not need a running Dolt
//! server, plus the failure path when the server is unreachable.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A doltrun command isolated from the user's config and environment.
fn doltrun(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("doltrun").unwrap();
    cmd.env("DOLTRUN_CONFIG", dir.join("global.toml"))
        .env_remove("DOLTRUN_PASSWORD")
        .env_remove("RUST_LOG")
        .arg("--cwd")
        .arg(dir);
    cmd
}

#[test]
fn version_flag_works() {
    Command::cargo_bin("doltrun")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("doltrun"));
}

#[test]
fn help_lists_commands() {
    Command::cargo_bin("doltrun")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("log"))
        .stdout(predicate::str::contains("completion"));
}

#[test]
fn run_help_shows_examples() {
    Command::cargo_bin("doltrun")
        .unwrap()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DOLTRUN_RUN_ID"))
        .stdout(predicate::str::contains("--require-branch"));
}

mod config {
    use super::*;

    #[test]
    fn show_defaults_without_files() {
        let tmp = TempDir::new().unwrap();
        doltrun(tmp.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("host = \"localhost\""))
            .stdout(predicate::str::contains("port = 3306"))
            .stdout(predicate::str::contains("branch_policy = \"create\""))
            .stdout(predicate::str::contains("source = \"pipeline\""));
    }

    #[test]
    fn show_merges_files_and_masks_password() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("global.toml"),
            "[store]\nhost = \"dolt.internal\"\npassword = \"hunter2\"\n",
        )
        .unwrap();
        fs::write(
            tmp.path().join("doltrun.toml"),
            "[store]\ndatabase = \"analytics\"\n\n[run]\nbranch_policy = \"require\"\n",
        )
        .unwrap();

        doltrun(tmp.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("database = \"analytics\""))
            .stdout(predicate::str::contains("host = \"dolt.internal\""))
            .stdout(predicate::str::contains("branch_policy = \"require\""))
            .stdout(predicate::str::contains("hunter2").not());
    }

    #[test]
    fn path_lists_loaded_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("doltrun.toml"), "").unwrap();

        doltrun(tmp.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("project:"))
            .stdout(predicate::str::contains("doltrun.toml"))
            .stdout(predicate::str::contains("global:").not());
    }

    #[test]
    fn unknown_key_is_an_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("doltrun.toml"), "[store]\ndatabse = \"x\"\n").unwrap();

        doltrun(tmp.path())
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("doltrun.toml"));
    }
}

mod run {
    use super::*;

    #[test]
    fn requires_a_database() {
        let tmp = TempDir::new().unwrap();
        doltrun(tmp.path())
            .args(["run", "--no-lock", "--", "true"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("no database configured"));
    }

    #[test]
    fn rejects_invalid_branch_before_connecting() {
        let tmp = TempDir::new().unwrap();
        doltrun(tmp.path())
            .args(["run", "--database", "db", "--branch", "bad..name", "--", "true"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("branch name cannot contain '..'"));
    }

    #[test]
    fn requires_a_command() {
        let tmp = TempDir::new().unwrap();
        doltrun(tmp.path())
            .args(["run", "--database", "db"])
            .assert()
            .failure();
    }

    #[cfg(unix)]
    #[test]
    fn unreachable_store_skips_the_pipeline() {
        let tmp = TempDir::new().unwrap();
        let marker = tmp.path().join("ran");

        doltrun(tmp.path())
            .args([
                "run",
                "--database",
                "db",
                "--host",
                "127.0.0.1",
                "--port",
                "1",
                "--branch",
                "exp",
                "--no-lock",
                "--",
                "touch",
            ])
            .arg(&marker)
            .assert()
            .failure()
            .stderr(predicate::str::contains("versioned store unavailable"));

        assert!(!marker.exists());
    }
}

mod log {
    use super::*;

    #[test]
    fn rejects_blank_run_id() {
        let tmp = TempDir::new().unwrap();
        doltrun(tmp.path())
            .args(["log", " ", "--database", "db"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid run id"));
    }

    #[test]
    fn rejects_padded_run_id() {
        let tmp = TempDir::new().unwrap();
        doltrun(tmp.path())
            .args(["log", "run-42 ", "--database", "db"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("start or end with whitespace"));
    }
}

#[test]
fn completion_generates_script() {
    Command::cargo_bin("doltrun")
        .unwrap()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("doltrun"));
}
