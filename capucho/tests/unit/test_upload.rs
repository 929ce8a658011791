//! Upload client tests

use std::net::TcpListener;

use capucho::http::upload::UploadClient;
use reqwest::Client;
use secrecy::SecretString;
use serde_json::json;
use tempfile::TempDir;

use crate::support::MockBackend;

fn artifact(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("bundle.zip");
    std::fs::write(&path, b"PK\x03\x04 bundle bytes").unwrap();
    path
}

#[tokio::test]
async fn test_upload_sends_fields_and_file() {
    let backend = MockBackend::start().await;
    let dir = TempDir::new().unwrap();
    let path = artifact(&dir);

    let client = UploadClient::new(Client::new()).with_field_name("bundle");
    let result = client
        .upload(
            &format!("{}/api/admin/upload", backend.base_url),
            &path,
            &[
                ("version", Some("1.2.3".to_string())),
                ("releaseNotes", None),
            ],
            Some(&SecretString::from("secret-key".to_string())),
        )
        .await;

    assert!(result.success);
    assert_eq!(result.status, 200);
    assert_eq!(result.data, json!({"id": "release-1", "message": "stored"}));

    let uploads = backend.uploads();
    assert_eq!(uploads.len(), 1);
    let upload = &uploads[0];
    assert_eq!(upload.authorization.as_deref(), Some("Bearer secret-key"));
    assert_eq!(upload.fields.get("version").map(String::as_str), Some("1.2.3"));
    assert!(!upload.fields.contains_key("releaseNotes"));
    assert_eq!(upload.file_field.as_deref(), Some("bundle"));
    assert_eq!(upload.file_name.as_deref(), Some("bundle.zip"));
    assert_eq!(upload.file_bytes, b"PK\x03\x04 bundle bytes");
}

#[tokio::test]
async fn test_server_error_is_captured() {
    let backend = MockBackend::start().await;
    backend.set_upload_status(500);
    backend.set_upload_body(json!({"error": "storage unavailable"}));
    let dir = TempDir::new().unwrap();

    let result = UploadClient::new(Client::new())
        .upload(
            &format!("{}/api/admin/upload", backend.base_url),
            &artifact(&dir),
            &[],
            None,
        )
        .await;

    assert!(!result.success);
    assert_eq!(result.status, 500);
    assert_eq!(result.data, json!({"error": "storage unavailable"}));
    assert_eq!(result.message(), "storage unavailable");
    assert!(backend.uploads()[0].authorization.is_none());
}

#[tokio::test]
async fn test_transport_failure_has_status_zero() {
    // Bind then drop to get a port nobody listens on
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let dir = TempDir::new().unwrap();

    let result = UploadClient::new(Client::new())
        .upload(
            &format!("http://127.0.0.1:{}/api/admin/upload", port),
            &artifact(&dir),
            &[],
            None,
        )
        .await;

    assert!(!result.success);
    assert_eq!(result.status, 0);
    assert!(!result.message().is_empty());
}
