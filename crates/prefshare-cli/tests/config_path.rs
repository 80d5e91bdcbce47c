use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_config_path_command() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("prefshare")
        .env("PREFSHARE_HOME", dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_creates_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    assert!(!config_path.exists());

    cargo_bin_cmd!("prefshare")
        .env("PREFSHARE_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config at"));

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("[backend]"));
    assert!(contents.contains("concurrency = 4"));
}

#[test]
fn test_config_init_fails_if_exists() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("config.toml"), "# existing config").unwrap();

    cargo_bin_cmd!("prefshare")
        .env("PREFSHARE_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_set_url_keeps_comments() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    cargo_bin_cmd!("prefshare")
        .env("PREFSHARE_HOME", dir.path())
        .args(["config", "set-url", "geo", "https://geo.example.com/"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set geo URL"));

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("base_url = \"https://geo.example.com/\""));
    assert!(contents.contains("# Prefshare Configuration"));
}

#[test]
fn test_config_set_url_rejects_invalid_url() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("prefshare")
        .env("PREFSHARE_HOME", dir.path())
        .args(["config", "set-url", "api", "not a url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid api URL"));
}
