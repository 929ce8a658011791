//! Version and build counter synchronization
//!
//! The manifest owns the semantic version; `version-code.json` owns one build
//! counter per environment. A sync writes both into the environment's variable
//! file so the web build picks them up.

use std::collections::BTreeMap;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::CapuchoError;
use crate::filesys::file::File;
use crate::storage::layout::ProjectLayout;
use crate::version::manifest::read_version;

/// Environments whose counters always exist
pub const KNOWN_ENVIRONMENTS: &[&str] = &["dev", "staging", "prod"];

pub const VERSION_VAR: &str = "VITE_APP_VERSION";
pub const VERSION_CODE_VAR: &str = "VITE_APP_VERSION_CODE";
pub const BUILD_NUMBER_VAR: &str = "VITE_APP_BUILD_NUMBER";

/// Persisted counters, keyed by [`counter_key`]
pub type VersionCounters = BTreeMap<String, u64>;

/// Version written into the environment file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSnapshot {
    pub version: String,
    pub version_code: u64,
}

/// Counter key of an environment; flavored builds count separately
pub fn counter_key(environment: &str, flavor: Option<&str>) -> String {
    match flavor {
        Some(flavor) => format!("{}:{}", environment, flavor),
        None => environment.to_string(),
    }
}

/// Keeps manifest version, counters and environment files in step
#[derive(Debug, Clone)]
pub struct VersionSyncer {
    layout: ProjectLayout,
}

impl VersionSyncer {
    pub fn new(layout: ProjectLayout) -> Self {
        Self { layout }
    }

    /// Read the counters, default-initializing missing known environments to 1
    pub async fn read_counters(&self) -> Result<VersionCounters, CapuchoError> {
        let file = self.layout.version_counter_file();
        let mut counters = if file.exists().await {
            file.read_json::<VersionCounters>().await.map_err(|e| {
                CapuchoError::VersionError(format!(
                    "Corrupt counter file {}: {}",
                    file.path().display(),
                    e
                ))
            })?
        } else {
            VersionCounters::new()
        };

        for environment in KNOWN_ENVIRONMENTS {
            counters.entry(environment.to_string()).or_insert(1);
        }
        Ok(counters)
    }

    /// Sync version metadata for one environment, bumping its counter first
    /// when asked. The counter file is always rewritten.
    pub async fn sync(
        &self,
        environment: &str,
        flavor: Option<&str>,
        bump: bool,
    ) -> Result<VersionSnapshot, CapuchoError> {
        let version = read_version(&self.layout.manifest_file()).await?;
        let mut counters = self.read_counters().await?;

        let env_file = self.layout.env_file(environment, flavor);
        if !env_file.exists().await {
            return Err(CapuchoError::VersionError(format!(
                "Environment file not found: {}",
                env_file.path().display()
            )));
        }

        let key = counter_key(environment, flavor);
        let counter = counters.entry(key.clone()).or_insert(1);
        if bump {
            *counter += 1;
            info!("Bumped build counter {} to {}", key, counter);
        }
        let version_code = *counter;

        let snapshot = VersionSnapshot {
            version,
            version_code,
        };
        write_env_file(&env_file, &snapshot).await?;

        self.layout.version_counter_file().write_json(&counters).await?;
        debug!("Synced {} -> {} ({})", key, snapshot.version, snapshot.version_code);

        Ok(snapshot)
    }
}

async fn write_env_file(env_file: &File, snapshot: &VersionSnapshot) -> Result<(), CapuchoError> {
    let original = env_file.read_string().await?;
    let code = snapshot.version_code.to_string();

    let mut contents = original.clone();
    for (name, value) in [
        (VERSION_VAR, snapshot.version.as_str()),
        (VERSION_CODE_VAR, code.as_str()),
        (BUILD_NUMBER_VAR, code.as_str()),
    ] {
        contents = replace_assignment(&contents, name, value)?;
    }

    if contents != original {
        env_file.write_string(&contents).await?;
    }
    Ok(())
}

/// Replace the value of every `NAME=...` line. Quotes, an `export ` prefix and
/// whatever follows the value (such as a trailing comment) survive; a variable
/// that is not assigned anywhere is not added.
pub fn replace_assignment(contents: &str, name: &str, value: &str) -> Result<String, CapuchoError> {
    let pattern = format!(
        r#"(?m)^([ \t]*(?:export[ \t]+)?{}[ \t]*=[ \t]*)(?:"([^"\r\n]*)"|'([^'\r\n]*)'|[^ \t#\r\n]*)"#,
        regex::escape(name)
    );
    let re = Regex::new(&pattern)
        .map_err(|e| CapuchoError::VersionError(format!("Bad pattern for {}: {}", name, e)))?;

    let replaced = re.replace_all(contents, |caps: &Captures| {
        let quote = if caps.get(2).is_some() {
            "\""
        } else if caps.get(3).is_some() {
            "'"
        } else {
            ""
        };
        format!("{}{}{}{}", &caps[1], quote, value, quote)
    });
    Ok(replaced.into_owned())
}
