//! Integration tests for the OpenTerm CLI.
//!
//! These tests exercise the binary end-to-end using `assert_cmd`.  The
//! master password is supplied through `OPENTERM_PASSWORD` and every test
//! gets its own data directory with a cheap KDF and no playback delays.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

const CONN_A: &str = "3f2b8c1e-5d4a-4e7b-9c0d-1a2b3c4d5e6f";
const CONN_B: &str = "a1b2c3d4-e5f6-4a7b-8c9d-0e1f2a3b4c5d";

const FAST_CONFIG: &str = r#"
kdf = "sha256-iterated"
kdf_iterations = 1000
inter_step_delay_ms = 0
wait_for_poll_ms = 10
connect_delay_ms = 0
"#;

/// Helper: a data directory with a fast `openterm.toml`.
fn data_dir() -> TempDir {
    let tmp = TempDir::new().unwrap();
    tmp.child("openterm.toml").write_str(FAST_CONFIG).unwrap();
    tmp
}

/// Helper: the openterm binary pointed at `dir`, with the master password set.
fn openterm(dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("openterm").expect("binary should exist");
    cmd.arg("--data-dir")
        .arg(dir.path())
        .env("OPENTERM_PASSWORD", "master-pw")
        .env_remove("OPENTERM_NEW_PASSWORD")
        .env_remove("OPENTERM_LOG");
    cmd
}

fn init(dir: &TempDir) {
    openterm(dir).arg("init").assert().success();
}

#[test]
fn help_flag_shows_usage() {
    let dir = data_dir();
    openterm(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Encrypted connection password vault"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("change-password"))
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("macro"));
}

#[test]
fn version_flag_shows_version() {
    let dir = data_dir();
    openterm(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("openterm"));
}

#[test]
fn no_args_shows_help() {
    let dir = data_dir();
    openterm(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn status_on_empty_data_dir() {
    let dir = data_dir();
    openterm(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No vault configured"));
}

#[test]
fn status_after_init_reports_locked_count() {
    let dir = data_dir();
    init(&dir);
    openterm(&dir).args(["set", CONN_A, "pw-a"]).assert().success();

    openterm(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Locked, 1 saved password(s)"));
}

#[test]
fn init_set_list_get() {
    let dir = data_dir();
    init(&dir);
    dir.child("vault.json").assert(predicate::path::exists());

    openterm(&dir).args(["set", CONN_A, "pw-a"]).assert().success();
    openterm(&dir).args(["set", CONN_B, "pw-b"]).assert().success();

    openterm(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains(CONN_A))
        .stdout(predicate::str::contains(CONN_B));

    openterm(&dir)
        .args(["get", CONN_A])
        .assert()
        .success()
        .stdout(predicate::str::contains("pw-a"));
}

#[test]
fn init_twice_fails() {
    let dir = data_dir();
    init(&dir);
    openterm(&dir)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already"));
}

#[test]
fn wrong_password_is_rejected() {
    let dir = data_dir();
    init(&dir);

    openterm(&dir)
        .env("OPENTERM_PASSWORD", "not-it")
        .arg("unlock")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid master password"));
}

#[test]
fn set_rejects_non_uuid_id() {
    let dir = data_dir();
    init(&dir);
    openterm(&dir)
        .args(["set", "my-server", "pw"])
        .assert()
        .failure();
}

#[test]
fn get_on_missing_vault_fails() {
    let dir = data_dir();
    openterm(&dir)
        .args(["get", CONN_A])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not configured"));
}

#[test]
fn remove_force_deletes_entry() {
    let dir = data_dir();
    init(&dir);
    openterm(&dir).args(["set", CONN_A, "pw-a"]).assert().success();
    openterm(&dir).args(["remove", CONN_A, "--force"]).assert().success();

    openterm(&dir).args(["get", CONN_A]).assert().failure();
}

#[test]
fn change_password_then_unlock_with_new() {
    let dir = data_dir();
    init(&dir);
    openterm(&dir).args(["set", CONN_A, "pw-a"]).assert().success();

    openterm(&dir)
        .env("OPENTERM_NEW_PASSWORD", "new-master")
        .arg("change-password")
        .assert()
        .success();

    openterm(&dir).arg("unlock").assert().failure();
    openterm(&dir)
        .env("OPENTERM_PASSWORD", "new-master")
        .args(["get", CONN_A])
        .assert()
        .success()
        .stdout(predicate::str::contains("pw-a"));
}

#[test]
fn export_then_import_into_fresh_vault() {
    let source = data_dir();
    init(&source);
    openterm(&source).args(["set", CONN_A, "pw-a"]).assert().success();

    let export_file = source.child("passwords.json");
    openterm(&source)
        .args(["export", "-o"])
        .arg(export_file.path())
        .assert()
        .success();
    export_file.assert(predicate::str::contains("pw-a"));

    let target = data_dir();
    openterm(&target)
        .arg("import")
        .arg(export_file.path())
        .assert()
        .success();

    openterm(&target)
        .args(["get", CONN_A])
        .assert()
        .success()
        .stdout(predicate::str::contains("pw-a"));
}

#[test]
fn import_rejects_invalid_json() {
    let dir = data_dir();
    let bad = dir.child("bad.json");
    bad.write_str("{ not json").unwrap();

    openterm(&dir).arg("import").arg(bad.path()).assert().failure();
    dir.child("vault.json").assert(predicate::path::missing());
}

#[test]
fn macro_add_list_show_play() {
    let dir = data_dir();
    let source = dir.child("login.macro");
    source.write_str("echo hi\nRETURN\nSLEEP=0\n").unwrap();

    openterm(&dir)
        .args(["macro", "add", "login", "--file"])
        .arg(source.path())
        .assert()
        .success();

    openterm(&dir)
        .args(["macro", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 saved macro(s)"))
        .stdout(predicate::str::contains("login"));

    openterm(&dir)
        .args(["macro", "show", "login"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0D"))
        .stdout(predicate::str::contains("(timing)"));

    openterm(&dir)
        .args(["macro", "play", "LOGIN"])
        .assert()
        .success()
        .stdout(predicate::str::contains("echo hi\r\n"));
}

#[test]
fn macro_add_from_stdin_and_remove() {
    let dir = data_dir();
    openterm(&dir)
        .args(["macro", "add", "deploy"])
        .write_stdin("make deploy\nRETURN\n")
        .assert()
        .success();

    openterm(&dir)
        .args(["macro", "add", "Deploy"])
        .write_stdin("other\n")
        .assert()
        .failure();

    openterm(&dir).args(["macro", "remove", "deploy"]).assert().success();
    openterm(&dir)
        .args(["macro", "play", "deploy"])
        .assert()
        .failure();
}
