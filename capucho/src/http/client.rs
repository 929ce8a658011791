//! HTTP client implementation

use reqwest::{header, Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::errors::CapuchoError;

/// Status and body of a response whose status the caller inspects itself
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client for the update service
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client. Requests carry no timeout beyond transport defaults.
    pub fn new(base_url: &str) -> Result<Self, CapuchoError> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| CapuchoError::ConfigError(format!("Invalid server URL {}: {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CapuchoError::ConfigError(format!(
                "Unsupported server URL scheme: {}",
                parsed.scheme()
            )));
        }

        let client = Client::builder()
            .user_agent(concat!("capucho/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Underlying reqwest client, shared with the uploader
    pub fn inner(&self) -> &Client {
        &self.client
    }

    fn authorized(&self, request: RequestBuilder, token: &SecretString) -> RequestBuilder {
        request.header(
            header::AUTHORIZATION,
            format!("Bearer {}", token.expose_secret()),
        )
    }

    /// GET without judging the status. Only transport failures are errors.
    pub async fn get_raw(&self, path: &str, token: &SecretString) -> Result<RawResponse, CapuchoError> {
        let url = self.url(path);
        debug!("GET {}", url);

        let response = self.authorized(self.client.get(&url), token).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(RawResponse { status, body })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str, token: &SecretString) -> Result<T, CapuchoError> {
        let raw = self.get_raw(path, token).await?;
        decode("GET", path, raw)
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        token: &SecretString,
        body: &B,
    ) -> Result<T, CapuchoError> {
        let url = self.url(path);
        debug!("POST {}", url);

        let response = self
            .authorized(self.client.post(&url), token)
            .json(body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        decode("POST", path, RawResponse { status, body })
    }
}

fn decode<T: DeserializeOwned>(method: &str, path: &str, raw: RawResponse) -> Result<T, CapuchoError> {
    if !raw.is_success() {
        error!("HTTP {} {} failed: {} - {}", method, path, raw.status, raw.body);
        return Err(CapuchoError::ApiError {
            status: raw.status,
            body: raw.body,
        });
    }

    Ok(serde_json::from_str(&raw.body)?)
}
