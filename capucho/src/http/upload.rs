//! Artifact upload

use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::{header, Body, Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use crate::errors::CapuchoError;

/// Outcome of one upload. Server rejections and transport failures share this
/// shape; `status` is 0 when no response was received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    pub success: bool,
    pub status: u16,
    /// Parsed JSON body, the raw body as a string, or the transport error message
    pub data: Value,
}

impl UploadResult {
    fn transport_failure(message: String) -> Self {
        Self {
            success: false,
            status: 0,
            data: Value::String(message),
        }
    }

    /// Result for a response whose status arrived. A body that could not be
    /// read still reports the status, with the read error as `data`.
    fn from_response(status: StatusCode, body: Result<String, String>) -> Self {
        match body {
            Ok(body) => {
                debug!("Upload answered {} ({} bytes)", status, body.len());
                let data = serde_json::from_str(&body).unwrap_or(Value::String(body));
                Self {
                    success: status.is_success(),
                    status: status.as_u16(),
                    data,
                }
            }
            Err(e) => {
                warn!("Upload answered {} but the body was unreadable: {}", status, e);
                Self {
                    success: false,
                    status: status.as_u16(),
                    data: Value::String(e),
                }
            }
        }
    }

    /// Human readable message from the response payload
    pub fn message(&self) -> String {
        match &self.data {
            Value::String(s) => s.clone(),
            Value::Object(map) => map
                .get("message")
                .or_else(|| map.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| self.data.to_string()),
            other => other.to_string(),
        }
    }
}

/// Streams artifacts as multipart requests
#[derive(Debug, Clone)]
pub struct UploadClient {
    client: Client,
    field_name: String,
}

impl UploadClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            field_name: "file".to_string(),
        }
    }

    /// Multipart field name that carries the artifact
    pub fn with_field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = field_name.into();
        self
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Upload `file_path` to `url` with flat metadata fields. `None` values are
    /// left out of the form. Never fails: see [`UploadResult`].
    pub async fn upload(
        &self,
        url: &str,
        file_path: &Path,
        fields: &[(&str, Option<String>)],
        api_key: Option<&SecretString>,
    ) -> UploadResult {
        info!("Uploading {} to {}", file_path.display(), url);

        let response = match self.send(url, file_path, fields, api_key).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Upload to {} failed before a response: {}", url, e);
                return UploadResult::transport_failure(e.to_string());
            }
        };

        let status = response.status();
        let body = response.text().await.map_err(|e| e.to_string());
        UploadResult::from_response(status, body)
    }

    async fn send(
        &self,
        url: &str,
        file_path: &Path,
        fields: &[(&str, Option<String>)],
        api_key: Option<&SecretString>,
    ) -> Result<reqwest::Response, CapuchoError> {
        let file = tokio::fs::File::open(file_path).await?;
        let length = file.metadata().await?.len();
        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artifact".to_string());

        let part = Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), length)
            .file_name(file_name)
            .mime_str("application/octet-stream")?;

        let mut form = Form::new();
        for (name, value) in fields {
            if let Some(value) = value {
                form = form.text(name.to_string(), value.clone());
            }
        }
        form = form.part(self.field_name.clone(), part);

        let mut request = self.client.post(url).multipart(form);
        if let Some(key) = api_key {
            request = request.header(
                header::AUTHORIZATION,
                format!("Bearer {}", key.expose_secret()),
            );
        }

        Ok(request.send().await?)
    }
}
