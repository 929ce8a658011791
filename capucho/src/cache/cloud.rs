//! Remote project configuration with an on-disk fallback

use openapi_client::models::CloudProjectConfig;
use secrecy::SecretString;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::resolver::EffectiveConfig;
use crate::filesys::file::File;
use crate::http::client::HttpClient;

/// Serves the channels/flavors of the project, fresh when the service answers
/// and last-known otherwise
pub struct RemoteConfigCache {
    cache_file: File,
    remote: Option<(HttpClient, SecretString)>,
}

impl RemoteConfigCache {
    /// Cache backed by `cache_file`. The network is only used when both an
    /// endpoint and an API key resolve from `config`.
    pub fn new(cache_file: File, config: &EffectiveConfig) -> Self {
        let remote = config
            .credentials()
            .and_then(|(server_url, api_key)| match HttpClient::new(&server_url) {
                Ok(client) => Some((client, api_key)),
                Err(e) => {
                    warn!("Remote config disabled: {}", e);
                    None
                }
            });

        Self { cache_file, remote }
    }

    /// Cache that reuses an existing client
    pub fn with_client(cache_file: File, client: HttpClient, api_key: SecretString) -> Self {
        Self {
            cache_file,
            remote: Some((client, api_key)),
        }
    }

    pub fn cache_file(&self) -> &File {
        &self.cache_file
    }

    /// Fetch the project config, falling back to the cache on any failure.
    /// `None` only when neither source has data.
    pub async fn fetch_project_config(&self) -> Option<CloudProjectConfig> {
        let Some((client, api_key)) = &self.remote else {
            debug!("No endpoint or API key configured, using cached project config");
            return self.read_cache().await;
        };

        let response = match client.fetch_project_config(api_key).await {
            Ok(response) => response,
            Err(e) => {
                debug!("Project config fetch failed, using cache: {}", e);
                return self.read_cache().await;
            }
        };

        if response.status != 200 || response.body.trim().is_empty() {
            debug!(
                "Project config fetch answered {}, using cache",
                response.status
            );
            return self.read_cache().await;
        }

        // The payload is cached as received, unknown fields included
        let decoded = serde_json::from_str::<Value>(&response.body).and_then(|payload| {
            serde_json::from_value::<CloudProjectConfig>(payload.clone())
                .map(|config| (payload, config))
        });

        match decoded {
            Ok((payload, config)) => {
                info!(
                    "Fetched project config: {} channels, {} flavors",
                    config.channels.len(),
                    config.flavors.len()
                );
                self.write_cache(&payload).await;
                Some(config)
            }
            Err(e) => {
                warn!("Undecodable project config, using cache: {}", e);
                self.read_cache().await
            }
        }
    }

    /// Last cached config; unreadable caches count as absent
    pub async fn read_cache(&self) -> Option<CloudProjectConfig> {
        if !self.cache_file.exists().await {
            return None;
        }

        match self.cache_file.read_json().await {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(
                    "Ignoring project config cache {}: {}",
                    self.cache_file.path().display(),
                    e
                );
                None
            }
        }
    }

    async fn write_cache(&self, payload: &Value) {
        if let Err(e) = self.cache_file.write_json(payload).await {
            warn!(
                "Unable to update project config cache {}: {}",
                self.cache_file.path().display(),
                e
            );
        }
    }
}
