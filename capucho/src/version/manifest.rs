//! Semantic version stored in the project manifest (`package.json`)

use serde_json::Value;
use tracing::info;

use crate::errors::CapuchoError;
use crate::filesys::file::File;
use crate::models::job::VersionBump;

/// Read the `version` field of the manifest
pub async fn read_version(manifest: &File) -> Result<String, CapuchoError> {
    if !manifest.exists().await {
        return Err(CapuchoError::VersionError(format!(
            "Manifest not found: {}",
            manifest.path().display()
        )));
    }

    let value: Value = manifest.read_json().await?;
    value
        .get("version")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            CapuchoError::VersionError(format!(
                "No version field in {}",
                manifest.path().display()
            ))
        })
}

/// Rewrite the `version` field, keeping every other key in place
pub async fn write_version(manifest: &File, version: &str) -> Result<(), CapuchoError> {
    let mut value: Value = manifest.read_json().await?;
    let object = value.as_object_mut().ok_or_else(|| {
        CapuchoError::VersionError(format!(
            "{} is not a JSON object",
            manifest.path().display()
        ))
    })?;
    object.insert("version".to_string(), Value::String(version.to_string()));
    manifest.write_json(&value).await
}

/// Compute the next version. Pre-release and build suffixes are dropped.
pub fn next_version(current: &str, bump: VersionBump) -> Result<String, CapuchoError> {
    let core = current
        .trim()
        .trim_start_matches('v')
        .split(['-', '+'])
        .next()
        .unwrap_or_default();

    let parts: Vec<u64> = core
        .split('.')
        .map(|part| part.parse::<u64>())
        .collect::<Result<_, _>>()
        .map_err(|_| CapuchoError::VersionError(format!("Invalid semantic version: {}", current)))?;

    let [major, minor, patch] = parts[..] else {
        return Err(CapuchoError::VersionError(format!(
            "Invalid semantic version: {}",
            current
        )));
    };

    let next = match bump {
        VersionBump::Major => (major + 1, 0, 0),
        VersionBump::Minor => (major, minor + 1, 0),
        VersionBump::Patch => (major, minor, patch + 1),
        VersionBump::Build => (major, minor, patch),
    };

    Ok(format!("{}.{}.{}", next.0, next.1, next.2))
}

/// Apply a semantic bump to the manifest and return the new version
pub async fn bump_version(manifest: &File, bump: VersionBump) -> Result<String, CapuchoError> {
    let current = read_version(manifest).await?;
    let next = next_version(&current, bump)?;
    if next != current {
        write_version(manifest, &next).await?;
        info!("Bumped version {} -> {}", current, next);
    }
    Ok(next)
}
