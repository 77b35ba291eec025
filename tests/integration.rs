use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn atlas_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("atlas");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    // Local schema documents stand in for remote URLs.
    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(
        files_dir.join("acme.json"),
        r#"{"openapi":"3.0.0","info":{"title":"Acme API","version":"v1"},"paths":{}}"#,
    )
    .unwrap();
    fs::write(
        files_dir.join("legacy.yaml"),
        "swagger: \"2.0\"\ninfo:\n  title: Legacy\n  version: \"1.0\"\npaths: {}\n",
    )
    .unwrap();
    fs::write(files_dir.join("junk.json"), r#"{"hello":"world"}"#).unwrap();

    let sources_dir = root.join("sources");
    fs::create_dir_all(&sources_dir).unwrap();
    let seeds = serde_json::json!([
        { "id": "acme", "schemaUrl": files_dir.join("acme.json"), "title": "Acme" },
        { "id": "legacy", "schemaUrl": files_dir.join("legacy.yaml") },
        { "id": "junk", "schemaUrl": files_dir.join("junk.json") }
    ]);
    fs::write(sources_dir.join("seeds.json"), seeds.to_string()).unwrap();

    let config_content = format!(
        r#"[paths]
root = "{}"

[fetch]
concurrency = 2
timeout_secs = 5
"#,
        root.display()
    );
    let config_path = config_dir.join("atlas.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_atlas(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = atlas_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("--progress")
        .arg("off")
        .args(args)
        .env_remove("MAX_SCHEMAS")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run atlas binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_refresh_writes_repository_and_catalog() {
    let (tmp, config_path) = setup_test_env();
    let root = tmp.path();

    let (stdout, stderr, success) = run_atlas(&config_path, &["refresh"]);
    assert!(success, "refresh failed: {}", stderr);
    assert!(stdout.contains("ok acme@latest"), "stdout: {}", stdout);
    assert!(stdout.contains("ok legacy@latest"));
    assert!(stdout.contains("fail junk@latest"));
    assert!(stdout.contains("processed 3, ok 2, failed 1"));

    assert!(root.join("schemas/acme/v1.json").exists());
    assert!(root.join("schemas/legacy/1.0.json").exists());

    let search = read_json(&root.join("catalog/search-index.json"));
    assert_eq!(search["count"], 2);
    let acme = search["records"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["id"] == "acme")
        .unwrap();
    assert_eq!(acme["objectID"], "acme:v1");
    assert_eq!(acme["_tags"], serde_json::json!(["acme", "v1", "openapi3"]));

    let plain = read_json(&root.join("catalog/index.json"));
    assert_eq!(plain["count"], 2);
    let bridge = read_json(&root.join("catalog/bridge-catalog.json"));
    assert_eq!(bridge["schemas"].as_array().unwrap().len(), 2);
}

#[test]
fn test_refresh_resume_skips_completed_items() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_atlas(&config_path, &["refresh", "--resume"]);
    assert!(success, "first refresh failed: {}", stderr);

    let (stdout, stderr, success) = run_atlas(&config_path, &["refresh", "--resume"]);
    assert!(success, "second refresh failed: {}", stderr);
    assert!(!stdout.contains("ok acme@latest"));
    assert!(stdout.contains("fail junk@latest"), "failed items are retried");
    assert!(stdout.contains("processed 1, ok 0, failed 1, skipped 2"));
}

#[test]
fn test_refresh_respects_max() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, stderr, success) = run_atlas(&config_path, &["refresh", "--max", "1"]);
    assert!(success, "refresh failed: {}", stderr);
    assert!(stdout.contains("processed 1,"), "stdout: {}", stdout);
}

#[test]
fn test_validate_fails_on_corrupt_entry() {
    let (tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_atlas(&config_path, &["refresh"]);
    assert!(success, "refresh failed: {}", stderr);

    let (stdout, _, success) = run_atlas(&config_path, &["validate"]);
    assert!(success, "validate should pass: {}", stdout);
    assert!(stdout.contains("ok schemas/acme/v1.json"));

    fs::write(tmp.path().join("schemas/acme/v1.json"), "{ truncated").unwrap();
    let (stdout, _, success) = run_atlas(&config_path, &["validate"]);
    assert!(!success, "validate should fail on a corrupt entry");
    assert!(stdout.contains("fail"));
}

#[test]
fn test_build_single_view() {
    let (tmp, config_path) = setup_test_env();
    run_atlas(&config_path, &["refresh"]);
    fs::remove_dir_all(tmp.path().join("catalog")).unwrap();

    let (_, stderr, success) = run_atlas(&config_path, &["build", "bridge"]);
    assert!(success, "build failed: {}", stderr);
    assert!(tmp.path().join("catalog/bridge-catalog.json").exists());
    assert!(!tmp.path().join("catalog/index.json").exists());

    let (_, _, success) = run_atlas(&config_path, &["build", "rss"]);
    assert!(!success);
}

#[test]
fn test_fetch_all_from_stored_index() {
    let (tmp, config_path) = setup_test_env();
    let root = tmp.path();
    let files = root.join("files");
    let index = serde_json::json!({
        "acme.com": {
            "id": "acme.com",
            "preferredVersion": "v1",
            "title": "Acme",
            "versions": {
                "v1": { "openapiUrl": files.join("acme.json"), "swaggerUrl": null },
                "v0": { "openapiUrl": null, "swaggerUrl": files.join("legacy.yaml") }
            }
        }
    });
    fs::write(root.join("sources/apis-guru-index.json"), index.to_string()).unwrap();

    let (stdout, stderr, success) = run_atlas(&config_path, &["fetch-all"]);
    assert!(success, "fetch-all failed: {}", stderr);
    assert!(stdout.contains("ok acme.com@v1"));
    assert!(stdout.contains("ok acme.com@v0"));
    assert!(root.join("schemas/acme.com/v0.json").exists());

    let report = read_json(&root.join("catalog/fetch-report.json"));
    assert_eq!(report["processed"], 2);
    assert_eq!(report["ok"], 2);
    assert_eq!(report["failed"], 0);
    assert_eq!(report["max"], 0);

    let (stdout, _, success) = run_atlas(&config_path, &["fetch-all"]);
    assert!(success);
    assert!(stdout.contains("processed 0"));

    let (stdout, _, success) = run_atlas(&config_path, &["fetch-all", "--reset"]);
    assert!(success);
    assert!(stdout.contains("processed 2"));
}

#[test]
fn test_sources_lists_health() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, stderr, success) = run_atlas(&config_path, &["sources"]);
    assert!(success, "sources failed: {}", stderr);
    assert!(stdout.contains("seeds"));
    assert!(stdout.contains("OK"));
    assert!(stdout.contains("MISSING"));
}

#[test]
fn test_stats_after_refresh() {
    let (_tmp, config_path) = setup_test_env();
    run_atlas(&config_path, &["refresh", "--resume"]);
    let (stdout, stderr, success) = run_atlas(&config_path, &["stats"]);
    assert!(success, "stats failed: {}", stderr);
    assert!(stdout.contains("APIs:        2"), "stdout: {}", stdout);
    assert!(stdout.contains("refresh"));
}

#[test]
fn test_discover_with_no_targets_writes_empty_output() {
    let (tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_atlas(&config_path, &["discover"]);
    assert!(success, "discover failed: {}", stderr);
    let out = read_json(&tmp.path().join("catalog/discovered.json"));
    assert_eq!(out["count"], 0);
}
