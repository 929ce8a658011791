//! Web asset publishing

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::deploy::commands;
use crate::deploy::runner::CommandRunner;
use crate::errors::CapuchoError;

/// What to publish
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub root: PathBuf,
    pub repo_url: String,
    pub version: String,
    pub environment: String,
    pub flavor: Option<String>,
}

/// Publishes the built web assets somewhere public
#[async_trait]
pub trait AssetPublisher: Send + Sync {
    async fn publish(&self, request: &PublishRequest) -> Result<(), CapuchoError>;
}

/// Pushes `dist/` to a pages branch of the project's repository
pub struct PagesPublisher {
    runner: Arc<dyn CommandRunner>,
}

impl PagesPublisher {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl AssetPublisher for PagesPublisher {
    async fn publish(&self, request: &PublishRequest) -> Result<(), CapuchoError> {
        let command = commands::publish_pages(
            &request.root,
            &request.repo_url,
            &request.version,
            &request.environment,
        )
        .with_flavor(request.flavor.as_deref());

        self.runner.run(&command).await?;
        info!("Published assets to {}", request.repo_url);
        Ok(())
    }
}
