//! Project descriptor management

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CapuchoError;
use crate::filesys::file::File;

/// Identity of a project in the update service, written once by `init`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDescriptor {
    /// Bundle identifier (e.g. "com.acme.app")
    pub app_id: String,

    /// Id of the app in the update service
    #[serde(deserialize_with = "openapi_client::models::string_or_number")]
    pub cloud_app_id: String,

    /// Human readable application name
    pub app_name: String,

    /// Repository that receives published web assets
    #[serde(
        rename = "ghPagesRepo",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub pages_repo_url: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl ProjectDescriptor {
    pub fn new(app_id: String, cloud_app_id: String, app_name: String) -> Self {
        Self {
            app_id,
            cloud_app_id,
            app_name,
            pages_repo_url: None,
            created_at: Utc::now(),
        }
    }
}

/// Assert that the project has been initialized and return its descriptor
pub async fn assert_initialized(descriptor_file: &File) -> Result<ProjectDescriptor, CapuchoError> {
    if !descriptor_file.exists().await {
        return Err(CapuchoError::ProjectNotInitialized(format!(
            "{} does not exist, run `capucho init` first",
            descriptor_file.path().display()
        )));
    }

    let descriptor: ProjectDescriptor = descriptor_file.read_json().await.map_err(|e| {
        CapuchoError::ProjectNotInitialized(format!("Failed to read project file: {}", e))
    })?;

    if descriptor.app_id.is_empty() {
        return Err(CapuchoError::ProjectNotInitialized(
            "Project appId is empty".to_string(),
        ));
    }

    if descriptor.cloud_app_id.is_empty() {
        return Err(CapuchoError::ProjectNotInitialized(
            "Project cloudAppId is empty".to_string(),
        ));
    }

    Ok(descriptor)
}

/// Save a new descriptor; an existing one is never overwritten
pub async fn create_descriptor(
    descriptor_file: &File,
    descriptor: &ProjectDescriptor,
) -> Result<(), CapuchoError> {
    if descriptor_file.exists().await {
        return Err(CapuchoError::ConfigError(format!(
            "Project already initialized: {}",
            descriptor_file.path().display()
        )));
    }
    descriptor_file.write_json(descriptor).await
}
