use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn leaf() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("leaf").expect("leaf binary");
    cmd.env_remove("LEAF_URL")
        .env_remove("LEAF_AUTH_TOKEN")
        .env_remove("LEAF_CONFIG");
    cmd
}

#[test]
fn help_lists_commands() {
    leaf()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("schema-ids"))
        .stdout(predicate::str::contains("set-name"));
}

#[test]
fn schema_ids_work_offline() -> Result<(), Box<dyn std::error::Error>> {
    let assert = leaf().arg("schema-ids").assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone())?;

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 9);
    for line in &lines {
        let (id, _) = line.split_once("  ").expect("id and name");
        assert_eq!(id.len(), 52);
    }
    assert!(lines.iter().any(|line| line.ends_with("  UTF-8")));
    Ok(())
}

#[test]
fn malformed_link_is_rejected() {
    leaf()
        .args(["--url", "ws://127.0.0.1:1", "read", "bogus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn missing_url_is_an_error() {
    leaf()
        .args(["secret", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no server URL"));
}

#[test]
fn unreadable_config_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("leaf.yml");
    fs::write(&path, "auth_token: [unterminated\n")?;

    leaf()
        .arg("--config")
        .arg(&path)
        .args(["secret", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("leaf.yml"));
    Ok(())
}

#[test]
fn unreachable_server_times_out() {
    leaf()
        .args(["--url", "ws://127.0.0.1:1", "--timeout", "1", "secret", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Timed out connecting"));
}
