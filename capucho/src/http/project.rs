//! Account, app and channel endpoints

use openapi_client::models::{
    AppInfo, Channel, CreateAppRequest, ListEnvelope, MeResponse, Organization,
};
use secrecy::SecretString;

use crate::errors::CapuchoError;
use crate::http::client::{HttpClient, RawResponse};

pub const ME_PATH: &str = "/api/auth/me";
pub const PROJECT_CONFIG_PATH: &str = "/api/project/config";
pub const APPS_PATH: &str = "/api/apps";
pub const ORGANIZATIONS_PATH: &str = "/api/organizations";
pub const NATIVE_UPLOAD_PATH: &str = "/api/admin/native-upload";
pub const BUNDLE_UPLOAD_PATH: &str = "/api/admin/upload";

impl HttpClient {
    /// Identity behind the API key
    pub async fn me(&self, token: &SecretString) -> Result<MeResponse, CapuchoError> {
        self.get(ME_PATH, token).await
    }

    /// Project configuration, status left to the caller
    pub async fn fetch_project_config(&self, token: &SecretString) -> Result<RawResponse, CapuchoError> {
        self.get_raw(PROJECT_CONFIG_PATH, token).await
    }

    /// Apps visible to the API key
    pub async fn list_apps(&self, token: &SecretString) -> Result<Vec<AppInfo>, CapuchoError> {
        let response: ListEnvelope<AppInfo> = self.get(APPS_PATH, token).await?;
        Ok(response.into_vec())
    }

    /// Register a new app
    pub async fn create_app(
        &self,
        token: &SecretString,
        request: &CreateAppRequest,
    ) -> Result<AppInfo, CapuchoError> {
        self.post(APPS_PATH, token, request).await
    }

    /// Organizations of the authenticated user
    pub async fn list_organizations(&self, token: &SecretString) -> Result<Vec<Organization>, CapuchoError> {
        let response: ListEnvelope<Organization> = self.get(ORGANIZATIONS_PATH, token).await?;
        Ok(response.into_vec())
    }

    /// Channels of one app
    pub async fn list_channels(
        &self,
        token: &SecretString,
        cloud_app_id: &str,
    ) -> Result<Vec<Channel>, CapuchoError> {
        let path = format!("{}/{}/channels", APPS_PATH, cloud_app_id);
        let response: ListEnvelope<Channel> = self.get(&path, token).await?;
        Ok(response.into_vec())
    }
}
