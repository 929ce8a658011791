//! Deploy job model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of artifact a deploy produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
    /// Platform-installable binary
    Native,
    /// Over-the-air web asset bundle
    Ota,
}

impl ArtifactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::Native => "native",
            ArtifactType::Ota => "ota",
        }
    }
}

impl FromStr for ArtifactType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "native" | "apk" => Ok(ArtifactType::Native),
            "ota" | "bundle" => Ok(ArtifactType::Ota),
            _ => Err(format!("Invalid artifact type: {}", s)),
        }
    }
}

/// Target platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            _ => Err(format!("Invalid platform: {}", s)),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Native build variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildVariant {
    #[default]
    Debug,
    Release,
}

impl BuildVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildVariant::Debug => "debug",
            BuildVariant::Release => "release",
        }
    }
}

impl FromStr for BuildVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(BuildVariant::Debug),
            "release" => Ok(BuildVariant::Release),
            _ => Err(format!("Invalid build variant: {}", s)),
        }
    }
}

/// Requested version bump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionBump {
    Major,
    Minor,
    Patch,
    /// Only the build counter moves
    Build,
}

impl VersionBump {
    /// Whether the semantic version in the manifest changes
    pub fn changes_semver(&self) -> bool {
        !matches!(self, VersionBump::Build)
    }
}

impl FromStr for VersionBump {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "major" => Ok(VersionBump::Major),
            "minor" => Ok(VersionBump::Minor),
            "patch" => Ok(VersionBump::Patch),
            "build" | "code" => Ok(VersionBump::Build),
            _ => Err(format!("Invalid version bump: {}", s)),
        }
    }
}

/// One deploy invocation. Built by the caller, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployJob {
    /// Target environment (e.g. "dev", "staging", "prod")
    pub environment: String,

    /// Release channel; falls back to the configured default
    pub channel: Option<String>,

    pub artifact_type: ArtifactType,

    pub platform: Platform,

    /// Whether the uploaded release is immediately active
    pub active: bool,

    /// Whether clients must install the update
    pub required: bool,

    /// Release notes
    pub note: Option<String>,

    pub version_bump: Option<VersionBump>,

    /// White-label flavor with its own environment files
    pub flavor: Option<String>,

    /// Native build variant
    pub variant: BuildVariant,

    /// Skip the asset generation step
    pub skip_assets: bool,

    /// Skip all build steps and package what is already built
    pub skip_build: bool,

    /// Publish web assets to the project's pages repository
    pub publish_assets: bool,
}

impl DeployJob {
    pub fn new(environment: impl Into<String>, artifact_type: ArtifactType, platform: Platform) -> Self {
        Self {
            environment: environment.into(),
            channel: None,
            artifact_type,
            platform,
            active: true,
            required: false,
            note: None,
            version_bump: None,
            flavor: None,
            variant: BuildVariant::default(),
            skip_assets: false,
            skip_build: false,
            publish_assets: false,
        }
    }
}
