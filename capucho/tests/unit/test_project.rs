//! Project init and endpoint helper tests

use capucho::config::EffectiveConfig;
use capucho::errors::CapuchoError;
use capucho::http::client::HttpClient;
use capucho::init::{init_project, InitOptions};
use capucho::storage::layout::ProjectLayout;
use capucho::storage::project::assert_initialized;
use secrecy::SecretString;
use serde_json::json;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

use crate::support::MockBackend;

fn options() -> InitOptions {
    InitOptions {
        app_id: "com.acme.app".to_string(),
        app_name: "Acme".to_string(),
        organization_id: Some("7".to_string()),
        pages_repo_url: Some("git@github.com:acme/pages.git".to_string()),
    }
}

#[tokio::test]
async fn test_init_writes_descriptor_once() {
    let backend = MockBackend::start().await;
    let dir = TempDir::new().unwrap();
    let layout = ProjectLayout::new(dir.path());
    let config = EffectiveConfig::from_map(
        json!({"apiUrl": backend.base_url, "token": "k"})
            .as_object()
            .unwrap(),
    );

    let descriptor = assert_ok!(init_project(&layout, &config, options()).await);
    assert_eq!(descriptor.cloud_app_id, "42");

    let stored = assert_ok!(assert_initialized(&layout.descriptor_file()).await);
    assert_eq!(stored, descriptor);
    assert_eq!(
        stored.pages_repo_url.as_deref(),
        Some("git@github.com:acme/pages.git")
    );

    let err = assert_err!(init_project(&layout, &config, options()).await);
    assert!(matches!(err, CapuchoError::ConfigError(_)));
}

#[tokio::test]
async fn test_list_endpoints_accept_both_envelopes() {
    let backend = MockBackend::start().await;
    let client = HttpClient::new(&backend.base_url).unwrap();
    let token = SecretString::from("k".to_string());

    let apps = assert_ok!(client.list_apps(&token).await);
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].app_id.as_deref(), Some("com.acme.app"));

    let organizations = assert_ok!(client.list_organizations(&token).await);
    assert_eq!(organizations[0].id, "7");

    let channels = assert_ok!(client.list_channels(&token, "42").await);
    assert_eq!(channels[0].name, "production-42");

    let me = assert_ok!(client.me(&token).await);
    assert_eq!(me.email.as_deref(), Some("dev@acme.test"));
}

#[tokio::test]
async fn test_raw_fetch_leaves_rejection_to_caller() {
    let backend = MockBackend::start().await;
    backend.set_config_status(403);
    let client = HttpClient::new(&backend.base_url).unwrap();

    let raw = assert_ok!(
        client
            .fetch_project_config(&SecretString::from("k".to_string()))
            .await
    );
    assert_eq!(raw.status, 403);
    assert!(!raw.is_success());
}

#[tokio::test]
async fn test_typed_request_rejection_is_api_error() {
    let backend = MockBackend::start().await;
    backend.set_me_status(403);
    let client = HttpClient::new(&backend.base_url).unwrap();

    let err = assert_err!(client.me(&SecretString::from("k".to_string())).await);
    match err {
        CapuchoError::ApiError { status, body } => {
            assert_eq!(status, 403);
            assert!(body.contains("dev@acme.test"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
