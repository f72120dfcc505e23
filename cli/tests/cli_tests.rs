use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// `inklog` run inside `dir` with a clean environment
fn inklog(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("inklog").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("INKLOG_CONFIG")
        .env_remove("INKLOG_ENV")
        .env_remove("INKLOG_DATA_DIR")
        .env_remove("INKLOG_DATABASE_PATH")
        .env_remove("INKLOG_PORT")
        .env_remove("SESSION_SECRET_KEY")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_cli_help() {
    let dir = TempDir::new().unwrap();
    inklog(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Inklog CLI"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("user"));
}

#[test]
fn test_cli_version() {
    let dir = TempDir::new().unwrap();
    inklog(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_unknown_command_fails() {
    let dir = TempDir::new().unwrap();
    inklog(&dir).arg("publish-everything").assert().failure();
}

#[test]
fn test_config_show_reads_yaml_and_env() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("config")).unwrap();
    fs::write(
        dir.path().join("config").join("inklog.yaml"),
        "environment: test\nport: 8081\n",
    )
    .unwrap();

    let output = inklog(&dir)
        .args(["config", "show", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let settings = stdout_json(&output);
    assert_eq!(settings["environment"], "test");
    assert_eq!(settings["port"], 8081);

    let output = inklog(&dir)
        .env("INKLOG_PORT", "9091")
        .args(["config", "show", "--format", "json"])
        .output()
        .unwrap();
    assert_eq!(stdout_json(&output)["port"], 9091);

    inklog(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Inklog Configuration"))
        .stdout(predicate::str::contains("inklog.yaml"));
}

#[test]
fn test_invalid_port_is_reported() {
    let dir = TempDir::new().unwrap();
    inklog(&dir)
        .env("INKLOG_PORT", "eighty")
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("INKLOG_PORT"));
}

#[test]
fn test_user_create_and_list() {
    let dir = TempDir::new().unwrap();

    inklog(&dir)
        .args([
            "user",
            "create",
            "--email",
            "Admin@Test.fr",
            "--username",
            "admin",
            "--password",
            "password123",
            "--role",
            "admin",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("admin@test.fr"))
        .stdout(predicate::str::contains("ROLE_ADMIN"));
    assert!(dir.path().join("data").join("inklog.db").exists());

    let output = inklog(&dir)
        .args(["user", "list", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let users = stdout_json(&output);
    assert_eq!(users.as_array().unwrap().len(), 1);
    assert_eq!(users[0]["email"], "admin@test.fr");
    assert_eq!(users[0]["roles"], serde_json::json!(["ROLE_USER", "ROLE_ADMIN"]));

    // Same email again
    inklog(&dir)
        .args([
            "user", "create", "--email", "admin@test.fr", "--username", "other", "--password",
            "password123",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not create"));
}

#[test]
fn test_user_create_rejects_bad_input() {
    let dir = TempDir::new().unwrap();

    inklog(&dir)
        .args([
            "user", "create", "--email", "a@test.fr", "--username", "alice", "--password",
            "password123", "--role", "editor",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown role"));

    inklog(&dir)
        .args([
            "user", "create", "--email", "a@test.fr", "--username", "alice", "--password", "short",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 8 characters"));
}

#[test]
fn test_user_password_from_env() {
    let dir = TempDir::new().unwrap();
    inklog(&dir)
        .env("INKLOG_USER_PASSWORD", "from-the-env")
        .args(["user", "create", "--email", "b@test.fr", "--username", "bob"])
        .assert()
        .success();
}

#[test]
fn test_health_before_first_run() {
    let dir = TempDir::new().unwrap();
    let output = inklog(&dir)
        .env("INKLOG_PORT", "1")
        .args(["health", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let health = stdout_json(&output);
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["components"]["database"]["status"], "not_initialized");
    assert_eq!(health["components"]["server"]["status"], "offline");
    assert_eq!(health["components"]["configuration"]["session_secret"], "missing");
}

#[test]
fn test_health_after_migration() {
    let dir = TempDir::new().unwrap();
    inklog(&dir)
        .args([
            "user", "create", "--email", "c@test.fr", "--username", "carol", "--password",
            "password123",
        ])
        .assert()
        .success();

    let output = inklog(&dir)
        .env("INKLOG_PORT", "1")
        .args(["health", "--format", "json"])
        .output()
        .unwrap();
    let health = stdout_json(&output);
    assert_eq!(health["components"]["database"]["status"], "healthy");

    inklog(&dir)
        .env("INKLOG_PORT", "1")
        .arg("health")
        .assert()
        .success()
        .stdout(predicate::str::contains("Inklog System Health Check"));
}
