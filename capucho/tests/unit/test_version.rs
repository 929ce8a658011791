//! Version sync tests

use capucho::errors::CapuchoError;
use capucho::storage::layout::ProjectLayout;
use capucho::version::VersionSyncer;
use serde_json::{json, Value};
use tempfile::TempDir;

async fn project(version: &str) -> (TempDir, ProjectLayout) {
    let dir = TempDir::new().unwrap();
    let layout = ProjectLayout::new(dir.path());
    layout
        .manifest_file()
        .write_json(&json!({"name": "app", "version": version}))
        .await
        .unwrap();
    for env in ["dev", "staging", "prod"] {
        layout
            .env_file(env, None)
            .write_string(&format!(
                "VITE_API_URL=https://{env}.example\nVITE_APP_VERSION=0.0.0\nVITE_APP_VERSION_CODE=0\nVITE_APP_BUILD_NUMBER=\"0\"\n"
            ))
            .await
            .unwrap();
    }
    (dir, layout)
}

#[tokio::test]
async fn test_sync_without_bump_is_stable() {
    let (_dir, layout) = project("1.4.0").await;
    let syncer = VersionSyncer::new(layout.clone());

    let first = syncer.sync("dev", None, false).await.unwrap();
    let second = syncer.sync("dev", None, false).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.version_code, 1);

    // Defaults for every known environment are persisted
    let counters: Value = layout.version_counter_file().read_json().await.unwrap();
    assert_eq!(counters, json!({"dev": 1, "prod": 1, "staging": 1}));

    let env = layout.env_file("dev", None).read_string().await.unwrap();
    assert_eq!(
        env,
        "VITE_API_URL=https://dev.example\nVITE_APP_VERSION=1.4.0\nVITE_APP_VERSION_CODE=1\nVITE_APP_BUILD_NUMBER=\"1\"\n"
    );
}

#[tokio::test]
async fn test_bump_moves_only_target_counter() {
    let (_dir, layout) = project("2.0.1").await;
    layout
        .version_counter_file()
        .write_json(&json!({"dev": 7, "staging": 3, "prod": 12}))
        .await
        .unwrap();
    let syncer = VersionSyncer::new(layout.clone());

    let snapshot = syncer.sync("staging", None, true).await.unwrap();
    assert_eq!(snapshot.version, "2.0.1");
    assert_eq!(snapshot.version_code, 4);

    let counters = syncer.read_counters().await.unwrap();
    assert_eq!(counters["dev"], 7);
    assert_eq!(counters["staging"], 4);
    assert_eq!(counters["prod"], 12);
}

#[tokio::test]
async fn test_flavored_counter_is_separate() {
    let (_dir, layout) = project("1.0.0").await;
    layout
        .env_file("prod", Some("acme"))
        .write_string("VITE_APP_VERSION_CODE=0\n")
        .await
        .unwrap();
    let syncer = VersionSyncer::new(layout.clone());

    let snapshot = syncer.sync("prod", Some("acme"), true).await.unwrap();
    assert_eq!(snapshot.version_code, 2);

    let counters = syncer.read_counters().await.unwrap();
    assert_eq!(counters["prod"], 1);
    assert_eq!(counters["prod:acme"], 2);
}

#[tokio::test]
async fn test_missing_env_file_leaves_counters_untouched() {
    let (_dir, layout) = project("1.0.0").await;
    layout
        .version_counter_file()
        .write_string("{\"qa\": 5}\n")
        .await
        .unwrap();

    let err = VersionSyncer::new(layout.clone())
        .sync("qa", None, true)
        .await
        .unwrap_err();
    assert!(matches!(err, CapuchoError::VersionError(_)));
    assert_eq!(
        layout.version_counter_file().read_string().await.unwrap(),
        "{\"qa\": 5}\n"
    );
}

#[tokio::test]
async fn test_corrupt_counters_are_fatal() {
    let (_dir, layout) = project("1.0.0").await;
    layout
        .version_counter_file()
        .write_string("{\"dev\": ")
        .await
        .unwrap();

    let err = VersionSyncer::new(layout).sync("dev", None, false).await.unwrap_err();
    assert!(matches!(err, CapuchoError::VersionError(_)));
}
