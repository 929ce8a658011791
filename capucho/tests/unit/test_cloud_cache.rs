//! Remote project config cache tests

use capucho::cache::cloud::RemoteConfigCache;
use capucho::config::EffectiveConfig;
use capucho::filesys::file::File;
use openapi_client::models::CloudProjectConfig;
use serde_json::json;
use tempfile::TempDir;

use crate::support::MockBackend;

fn config(value: serde_json::Value) -> EffectiveConfig {
    EffectiveConfig::from_map(value.as_object().unwrap())
}

#[tokio::test]
async fn test_fetch_refreshes_cache_then_falls_back() {
    let backend = MockBackend::start().await;
    let dir = TempDir::new().unwrap();
    let cache_file = File::new(dir.path().join(".capucho").join("cloud-cache.json"));
    let cache = RemoteConfigCache::new(
        cache_file.clone(),
        &config(json!({"serverUrl": backend.base_url, "apiKey": "k"})),
    );

    let fetched = cache.fetch_project_config().await.unwrap();
    assert_eq!(fetched.channels.len(), 2);
    assert_eq!(fetched.flavors[0].name, "acme");

    let on_disk: CloudProjectConfig = cache_file.read_json().await.unwrap();
    assert_eq!(on_disk, fetched);

    backend.set_config_status(500);
    let fallback = cache.fetch_project_config().await;
    assert_eq!(fallback, Some(fetched));
    assert_eq!(backend.config_calls(), 2);
}

#[tokio::test]
async fn test_without_api_key_no_request_is_made() {
    let backend = MockBackend::start().await;
    let dir = TempDir::new().unwrap();
    let cache_file = File::new(dir.path().join("cloud-cache.json"));
    cache_file
        .write_json(&json!({"channels": [{"id": "9", "name": "cached", "public": true}]}))
        .await
        .unwrap();

    let cache = RemoteConfigCache::new(cache_file, &config(json!({"serverUrl": backend.base_url})));
    let cached = cache.fetch_project_config().await.unwrap();

    assert_eq!(cached.channels[0].name, "cached");
    assert!(cached.flavors.is_empty());
    assert_eq!(backend.config_calls(), 0);
}

#[tokio::test]
async fn test_rejected_fetch_without_cache_is_none() {
    let backend = MockBackend::start().await;
    backend.set_config_status(401);
    let dir = TempDir::new().unwrap();

    let cache = RemoteConfigCache::new(
        File::new(dir.path().join("cloud-cache.json")),
        &config(json!({"serverUrl": backend.base_url, "apiKey": "bad"})),
    );
    assert!(cache.fetch_project_config().await.is_none());
    assert!(!cache.cache_file().exists().await);
}

#[tokio::test]
async fn test_cache_holds_payload_as_received() {
    let backend = MockBackend::start().await;
    let payload = json!({
        "channels": [{"id": 1, "name": "production", "public": true, "allowEmulator": false}],
        "flavors": [],
        "updatedAt": "2026-10-01T00:00:00Z"
    });
    backend.set_config_body(payload.clone());
    let dir = TempDir::new().unwrap();
    let cache_file = File::new(dir.path().join("cloud-cache.json"));
    let cache = RemoteConfigCache::new(
        cache_file.clone(),
        &config(json!({"serverUrl": backend.base_url, "apiKey": "k"})),
    );

    let fetched = cache.fetch_project_config().await.unwrap();
    assert_eq!(fetched.channels[0].id, "1");
    assert_eq!(fetched.channels[0].environment, None);

    let on_disk: serde_json::Value = cache_file.read_json().await.unwrap();
    assert_eq!(on_disk, payload);

    // The cached payload still decodes once the service is gone
    backend.set_config_status(503);
    assert_eq!(cache.fetch_project_config().await, Some(fetched));
}
