//! Project initialization

use openapi_client::models::CreateAppRequest;
use tracing::info;

use crate::config::EffectiveConfig;
use crate::errors::CapuchoError;
use crate::http::client::HttpClient;
use crate::storage::layout::ProjectLayout;
use crate::storage::project::{create_descriptor, ProjectDescriptor};

/// Parameters of `capucho init`
#[derive(Debug, Clone)]
pub struct InitOptions {
    pub app_id: String,
    pub app_name: String,
    pub organization_id: Option<String>,
    pub pages_repo_url: Option<String>,
}

/// Register the app with the update service and write the project descriptor
pub async fn init_project(
    layout: &ProjectLayout,
    config: &EffectiveConfig,
    options: InitOptions,
) -> Result<ProjectDescriptor, CapuchoError> {
    let descriptor_file = layout.descriptor_file();
    if descriptor_file.exists().await {
        return Err(CapuchoError::ConfigError(format!(
            "Project already initialized: {}",
            descriptor_file.path().display()
        )));
    }

    let (server_url, api_key) = config.credentials().ok_or_else(|| {
        CapuchoError::MissingCredentials("serverUrl and apiKey must be configured".to_string())
    })?;
    let client = HttpClient::new(&server_url)?;

    let request = CreateAppRequest {
        app_id: options.app_id.clone(),
        name: options.app_name.clone(),
        organization_id: options.organization_id,
    };
    let app = client.create_app(&api_key, &request).await?;
    info!("Created app {} ({})", app.name, app.id);

    let mut descriptor = ProjectDescriptor::new(options.app_id, app.id, options.app_name);
    descriptor.pages_repo_url = options.pages_repo_url;
    create_descriptor(&descriptor_file, &descriptor).await?;

    Ok(descriptor)
}
