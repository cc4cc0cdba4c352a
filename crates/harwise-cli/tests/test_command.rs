use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fixture_path(filename: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join(filename)
}

#[allow(deprecated)]
fn get_harwise_bin() -> PathBuf {
    assert_cmd::cargo::cargo_bin("harwise")
}

#[test]
fn test_missing_suite_fails() {
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = Command::new(get_harwise_bin());
    cmd.arg("test").arg("--tests").arg(temp_dir.path());

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid manifest"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_generate_then_run_against_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 5})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/users/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 5, "name": "ada"})))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let suite = temp_dir.path().join("suite");

    Command::new(get_harwise_bin())
        .arg("gen")
        .arg("tests")
        .arg(fixture_path("chain.har"))
        .arg("--out")
        .arg(&suite)
        .arg("--config")
        .arg(fixture_path("chain-config.json"))
        .arg("--base-url")
        .arg(server.uri())
        .assert()
        .success();

    let output = Command::new(get_harwise_bin())
        .arg("test")
        .arg("--tests")
        .arg(&suite)
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["summary"]["total"], 2);
    assert_eq!(report["summary"]["passed"], 2);
    assert_eq!(report["results"][0]["status"], "pass");

    let stored = fs::read_to_string(suite.join(".harwise.env.json")).unwrap();
    assert!(stored.contains("\"user_id\": \"5\""));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_env_file_feeds_substitution() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/users"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/users/77"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 77, "name": "eve"})))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let suite = temp_dir.path().join("suite");
    let env_file = temp_dir.path().join(".env");
    fs::write(&env_file, "user_id=77\n").unwrap();

    Command::new(get_harwise_bin())
        .arg("gen")
        .arg("tests")
        .arg(fixture_path("chain.har"))
        .arg("--out")
        .arg(&suite)
        .arg("--config")
        .arg(fixture_path("chain-config.json"))
        .arg("--base-url")
        .arg(server.uri())
        .assert()
        .success();

    // The create call fails, so the run exits 1, but the lookup still
    // falls back to the environment file for the second test.
    let output = Command::new(get_harwise_bin())
        .arg("test")
        .arg("--tests")
        .arg(&suite)
        .arg("--env")
        .arg(&env_file)
        .arg("--format")
        .arg("json")
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["results"][0]["status"], "fail");
    assert_eq!(report["results"][1]["status"], "pass");
}
