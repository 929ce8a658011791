//! Layered configuration resolution
//!
//! Sources, lowest precedence first: the global file under the home directory,
//! the project file under the project root, the opt-in `CAPUCHO_*` environment
//! layer, and the caller's explicit overrides. The merge is shallow: a key from
//! a higher layer replaces the lower value whole.

use std::ffi::OsStr;

use secrecy::SecretString;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::keys::{
    self, canonical_key, normalize, ConfigMap, API_KEY, DEFAULT_CHANNEL, DEFAULT_PLATFORM,
    LOG_LEVEL, OTA_OUTPUT_DIR, SERVER_URL, UPLOAD_FIELD_NAME,
};
use crate::errors::CapuchoError;
use crate::filesys::file::File;
use crate::logs::LogLevel;
use crate::models::job::Platform;
use crate::storage::layout::{GlobalLayout, ProjectLayout};

const DEFAULT_UPLOAD_FIELD_NAME: &str = "file";

/// Merged view over all configuration layers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectiveConfig {
    values: ConfigMap,
}

impl EffectiveConfig {
    /// Build from an already merged mapping
    pub fn from_map(values: &ConfigMap) -> Self {
        Self {
            values: normalize(values),
        }
    }

    /// All resolved values, keyed by canonical names
    pub fn values(&self) -> &ConfigMap {
        &self.values
    }

    /// Raw value; legacy spellings of well-known keys are accepted
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(canonical_key(key))
    }

    /// Non-empty string value
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Base URL of the update service, without a trailing slash
    pub fn server_url(&self) -> Option<String> {
        self.get_str(SERVER_URL)
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
    }

    pub fn api_key(&self) -> Option<SecretString> {
        self.get_str(API_KEY)
            .map(|key| SecretString::from(key.to_string()))
    }

    /// Endpoint and key together, or nothing
    pub fn credentials(&self) -> Option<(String, SecretString)> {
        Some((self.server_url()?, self.api_key()?))
    }

    pub fn default_channel(&self) -> Option<&str> {
        self.get_str(DEFAULT_CHANNEL)
    }

    pub fn default_platform(&self) -> Option<Platform> {
        let raw = self.get_str(DEFAULT_PLATFORM)?;
        match raw.parse() {
            Ok(platform) => Some(platform),
            Err(e) => {
                warn!("Ignoring {}: {}", DEFAULT_PLATFORM, e);
                None
            }
        }
    }

    pub fn log_level(&self) -> Option<LogLevel> {
        let raw = self.get_str(LOG_LEVEL)?;
        match raw.parse() {
            Ok(level) => Some(level),
            Err(e) => {
                warn!("Ignoring {}: {}", LOG_LEVEL, e);
                None
            }
        }
    }

    /// OTA bundle directory, relative to the project root
    pub fn ota_output_dir(&self) -> Option<&str> {
        self.get_str(OTA_OUTPUT_DIR)
    }

    /// Multipart field that carries the artifact
    pub fn upload_field_name(&self) -> &str {
        self.get_str(UPLOAD_FIELD_NAME)
            .unwrap_or(DEFAULT_UPLOAD_FIELD_NAME)
    }
}

/// Reads and writes the configuration layers of one invocation
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    global_file: File,
    project_file: File,
    env_layer: ConfigMap,
}

impl ConfigResolver {
    pub fn new(global: &GlobalLayout, project: &ProjectLayout) -> Self {
        Self {
            global_file: global.config_file(),
            project_file: project.config_file(),
            env_layer: ConfigMap::new(),
        }
    }

    /// Add the `CAPUCHO_*` environment layer, taken from `vars`.
    /// Unrelated variables are never decoded, so non-Unicode entries elsewhere
    /// in the environment are harmless.
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        for (name, value) in vars {
            let mapped = keys::ENV_VARS
                .iter()
                .find(|(var, _)| OsStr::new(var) == name.as_ref())
                .map(|(var, key)| (*var, *key));
            let Some((var, key)) = mapped else {
                continue;
            };
            match value.as_ref().to_str() {
                Some(value) => {
                    self.env_layer
                        .insert(key.to_string(), Value::String(value.to_string()));
                }
                None => warn!("Ignoring {}: not valid UTF-8", var),
            }
        }
        self
    }

    pub fn global_file(&self) -> &File {
        &self.global_file
    }

    pub fn project_file(&self) -> &File {
        &self.project_file
    }

    /// Global layer; absent or unparsable files read as empty
    pub async fn load_global(&self) -> ConfigMap {
        load_layer(&self.global_file, "global").await
    }

    /// Project layer; absent or unparsable files read as empty
    pub async fn load_project(&self) -> ConfigMap {
        load_layer(&self.project_file, "project").await
    }

    /// Merge every layer. Never fails.
    pub async fn resolve(&self, overrides: &ConfigMap) -> EffectiveConfig {
        let layers = [
            normalize(&self.load_global().await),
            normalize(&self.load_project().await),
            normalize(&self.env_layer),
            normalize(overrides),
        ];

        let mut merged = ConfigMap::new();
        for layer in layers {
            for (key, value) in layer {
                merged.insert(key, value);
            }
        }

        debug!("Resolved {} configuration keys", merged.len());
        EffectiveConfig { values: merged }
    }

    pub async fn set_global_config(&self, key: &str, value: Value) -> Result<(), CapuchoError> {
        set_key(&self.global_file, key, value).await
    }

    pub async fn set_project_config(&self, key: &str, value: Value) -> Result<(), CapuchoError> {
        set_key(&self.project_file, key, value).await
    }

    /// Remove a key from the global file; returns whether it was present
    pub async fn unset_global_config(&self, key: &str) -> Result<bool, CapuchoError> {
        unset_key(&self.global_file, key).await
    }

    /// Remove a key from the project file; returns whether it was present
    pub async fn unset_project_config(&self, key: &str) -> Result<bool, CapuchoError> {
        unset_key(&self.project_file, key).await
    }
}

async fn load_layer(file: &File, label: &str) -> ConfigMap {
    if !file.exists().await {
        debug!("No {} config at {}", label, file.path().display());
        return ConfigMap::new();
    }

    let contents = match file.read_string().await {
        Ok(contents) => contents,
        Err(e) => {
            warn!("Unable to read {} config {}: {}", label, file.path().display(), e);
            return ConfigMap::new();
        }
    };

    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            warn!(
                "Ignoring {} config {}: not a JSON object",
                label,
                file.path().display()
            );
            ConfigMap::new()
        }
        Err(e) => {
            warn!("Ignoring {} config {}: {}", label, file.path().display(), e);
            ConfigMap::new()
        }
    }
}

/// Full current contents of a file about to be rewritten
async fn read_for_update(file: &File) -> Result<ConfigMap, CapuchoError> {
    if !file.exists().await {
        return Ok(ConfigMap::new());
    }

    let contents = file.read_string().await?;
    if contents.trim().is_empty() {
        return Ok(ConfigMap::new());
    }

    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(CapuchoError::ConfigError(format!(
            "Refusing to rewrite {}: existing contents are not a JSON object",
            file.path().display()
        ))),
    }
}

async fn set_key(file: &File, key: &str, value: Value) -> Result<(), CapuchoError> {
    let mut map = read_for_update(file).await?;
    map.insert(canonical_key(key).to_string(), value);
    file.write_json(&map).await?;
    debug!("Set {} in {}", key, file.path().display());
    Ok(())
}

async fn unset_key(file: &File, key: &str) -> Result<bool, CapuchoError> {
    let mut map = read_for_update(file).await?;
    let removed = map.remove(canonical_key(key)).is_some();
    if removed {
        file.write_json(&map).await?;
    }
    Ok(removed)
}
