//! Well-known configuration keys and their legacy spellings

use serde_json::{Map, Value};

/// Open key/value mapping as stored in a config file
pub type ConfigMap = Map<String, Value>;

pub const SERVER_URL: &str = "serverUrl";
pub const API_KEY: &str = "apiKey";
pub const DEFAULT_CHANNEL: &str = "defaultChannel";
pub const DEFAULT_PLATFORM: &str = "defaultPlatform";
pub const LOG_LEVEL: &str = "logLevel";
pub const OTA_OUTPUT_DIR: &str = "otaOutputDir";
pub const UPLOAD_FIELD_NAME: &str = "uploadFieldName";

/// Canonical key followed by the spellings older releases wrote, in lookup order
const LEGACY_ALIASES: &[(&str, &[&str])] = &[
    (SERVER_URL, &["apiUrl", "server_url", "backendUrl"]),
    (API_KEY, &["api_key", "token", "apiToken"]),
    (DEFAULT_CHANNEL, &["channel", "default_channel"]),
    (DEFAULT_PLATFORM, &["platform"]),
    (LOG_LEVEL, &["log_level"]),
];

/// Environment variables mapped onto canonical keys
pub const ENV_VARS: &[(&str, &str)] = &[
    ("CAPUCHO_SERVER_URL", SERVER_URL),
    ("CAPUCHO_API_KEY", API_KEY),
    ("CAPUCHO_LOG_LEVEL", LOG_LEVEL),
    ("CAPUCHO_DEFAULT_CHANNEL", DEFAULT_CHANNEL),
];

/// Canonical spelling of `key`; unknown keys map to themselves
pub fn canonical_key(key: &str) -> &str {
    LEGACY_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&key))
        .map(|(canonical, _)| *canonical)
        .unwrap_or(key)
}

/// Rewrite one layer so legacy spellings land on canonical keys.
///
/// Within a layer the canonical key wins over any alias, and aliases are
/// consulted in table order.
pub fn normalize(layer: &ConfigMap) -> ConfigMap {
    let mut out = ConfigMap::new();

    for (key, value) in layer {
        if canonical_key(key) == key {
            out.insert(key.clone(), value.clone());
        }
    }

    for (canonical, aliases) in LEGACY_ALIASES {
        if out.contains_key(*canonical) {
            continue;
        }
        if let Some(value) = aliases.iter().find_map(|alias| layer.get(*alias)) {
            out.insert(canonical.to_string(), value.clone());
        }
    }

    out
}
