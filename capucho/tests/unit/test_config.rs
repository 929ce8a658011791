//! Config resolution tests

use capucho::config::{ConfigMap, ConfigResolver};
use capucho::storage::layout::{GlobalLayout, ProjectLayout};
use serde_json::{json, Value};
use tempfile::TempDir;

fn resolver(home: &TempDir, project: &TempDir) -> ConfigResolver {
    ConfigResolver::new(
        &GlobalLayout::new(home.path()),
        &ProjectLayout::new(project.path()),
    )
}

#[tokio::test]
async fn test_override_always_wins() {
    let home = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    let resolver = resolver(&home, &project)
        .with_env_vars([("CAPUCHO_DEFAULT_CHANNEL", "env-channel")]);

    resolver
        .global_file()
        .write_json(&json!({"serverUrl": "https://g", "defaultChannel": "g", "custom": 1}))
        .await
        .unwrap();
    resolver
        .project_file()
        .write_json(&json!({"apiUrl": "https://p", "channel": "p", "custom": {"nested": true}}))
        .await
        .unwrap();

    let overrides: ConfigMap = json!({
        "serverUrl": "https://override",
        "defaultChannel": "override",
        "custom": "override"
    })
    .as_object()
    .cloned()
    .unwrap();

    let config = resolver.resolve(&overrides).await;
    for (key, value) in &overrides {
        assert_eq!(config.get(key), Some(value), "key {}", key);
    }
}

#[tokio::test]
async fn test_corrupt_file_resolves_like_absent_file() {
    let home = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    let resolver = resolver(&home, &project);
    resolver
        .global_file()
        .write_json(&json!({"serverUrl": "https://global.example"}))
        .await
        .unwrap();

    let without = resolver.resolve(&ConfigMap::new()).await;

    for corrupt in ["{\"serverUrl\": ", "[1, 2, 3]", "\"just a string\""] {
        resolver.project_file().write_string(corrupt).await.unwrap();
        let with = resolver.resolve(&ConfigMap::new()).await;
        assert_eq!(with, without, "contents {:?}", corrupt);
    }
}

#[tokio::test]
async fn test_unset_round_trip_through_files() {
    let home = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    let resolver = resolver(&home, &project);

    resolver.set_global_config("api_key", json!("secret")).await.unwrap();
    let raw: Value = resolver.global_file().read_json().await.unwrap();
    assert_eq!(raw, json!({"apiKey": "secret"}));

    assert!(resolver.unset_global_config("apiKey").await.unwrap());
    assert!(!resolver.unset_global_config("apiKey").await.unwrap());
    assert!(resolver.resolve(&ConfigMap::new()).await.api_key().is_none());
}
