//! In-process mock of the update service

use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

/// One multipart request as received
#[derive(Debug, Clone, Default)]
pub struct CapturedUpload {
    pub path: String,
    pub authorization: Option<String>,
    pub fields: HashMap<String, String>,
    pub file_field: Option<String>,
    pub file_name: Option<String>,
    pub file_bytes: Vec<u8>,
}

pub struct MockState {
    pub me_calls: AtomicUsize,
    pub config_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub me_status: AtomicU16,
    pub config_status: AtomicU16,
    pub upload_status: AtomicU16,
    pub config_body: Mutex<Value>,
    pub upload_body: Mutex<Value>,
    pub uploads: Mutex<Vec<CapturedUpload>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            me_calls: AtomicUsize::new(0),
            config_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            me_status: AtomicU16::new(200),
            config_status: AtomicU16::new(200),
            upload_status: AtomicU16::new(200),
            config_body: Mutex::new(json!({
                "channels": [
                    {"id": "1", "name": "production", "public": true},
                    {"id": "2", "name": "beta", "public": false, "environment": "staging"}
                ],
                "flavors": [{"id": "1", "name": "acme"}]
            })),
            upload_body: Mutex::new(json!({"id": "release-1", "message": "stored"})),
            uploads: Mutex::new(Vec::new()),
        }
    }
}

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/api/auth/me", get(me))
            .route("/api/project/config", get(project_config))
            .route("/api/apps", get(list_apps).post(create_app))
            .route("/api/organizations", get(organizations))
            .route("/api/apps/{id}/channels", get(channels))
            .route("/api/admin/upload", post(bundle_upload))
            .route("/api/admin/native-upload", post(native_upload))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn set_me_status(&self, status: u16) {
        self.state.me_status.store(status, Ordering::SeqCst);
    }

    pub fn set_config_status(&self, status: u16) {
        self.state.config_status.store(status, Ordering::SeqCst);
    }

    pub fn set_config_body(&self, body: Value) {
        *self.state.config_body.lock().unwrap() = body;
    }

    pub fn set_upload_status(&self, status: u16) {
        self.state.upload_status.store(status, Ordering::SeqCst);
    }

    pub fn set_upload_body(&self, body: Value) {
        *self.state.upload_body.lock().unwrap() = body;
    }

    pub fn config_calls(&self) -> usize {
        self.state.config_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.state.upload_calls.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> Vec<CapturedUpload> {
        self.state.uploads.lock().unwrap().clone()
    }
}

fn status(code: &AtomicU16) -> StatusCode {
    StatusCode::from_u16(code.load(Ordering::SeqCst)).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn me(State(state): State<Arc<MockState>>) -> impl IntoResponse {
    state.me_calls.fetch_add(1, Ordering::SeqCst);
    (
        status(&state.me_status),
        Json(json!({"id": "user-1", "email": "dev@acme.test"})),
    )
}

async fn project_config(State(state): State<Arc<MockState>>) -> impl IntoResponse {
    state.config_calls.fetch_add(1, Ordering::SeqCst);
    let body = state.config_body.lock().unwrap().clone();
    (status(&state.config_status), Json(body))
}

async fn list_apps() -> impl IntoResponse {
    Json(json!({"data": [{"id": "42", "name": "Acme", "appId": "com.acme.app"}]}))
}

async fn organizations() -> impl IntoResponse {
    Json(json!([{"id": 7, "name": "Acme Inc"}]))
}

async fn create_app(Json(body): Json<Value>) -> impl IntoResponse {
    (
        StatusCode::CREATED,
        Json(json!({"id": 42, "name": body["name"], "appId": body["appId"]})),
    )
}

async fn channels(Path(id): Path<String>) -> impl IntoResponse {
    Json(json!({"data": [{"id": "1", "name": format!("production-{}", id), "public": true}]}))
}

async fn bundle_upload(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> impl IntoResponse {
    capture_upload(state, "/api/admin/upload", headers, multipart).await
}

async fn native_upload(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> impl IntoResponse {
    capture_upload(state, "/api/admin/native-upload", headers, multipart).await
}

async fn capture_upload(
    state: Arc<MockState>,
    path: &str,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    state.upload_calls.fetch_add(1, Ordering::SeqCst);

    let mut captured = CapturedUpload {
        path: path.to_string(),
        authorization: headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        ..Default::default()
    };

    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                captured.file_field = Some(name);
                captured.file_name = Some(file_name);
                captured.file_bytes = field.bytes().await.unwrap().to_vec();
            }
            None => {
                let value = field.text().await.unwrap();
                captured.fields.insert(name, value);
            }
        }
    }

    state.uploads.lock().unwrap().push(captured);
    let body = state.upload_body.lock().unwrap().clone();
    (status(&state.upload_status), Json(body))
}
