//! Deploy pipeline
//!
//! One run walks the stages of [`PipelineFsm`] in order. Every stage is
//! awaited to completion before the next one starts and any failure stops the
//! run, except asset publishing which only warns.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use secrecy::SecretString;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::artifacts::{ArtifactKind, ArtifactLocator};
use crate::cache::cloud::RemoteConfigCache;
use crate::config::{ConfigMap, ConfigResolver, EffectiveConfig};
use crate::deploy::commands::{self, CommandSpec};
use crate::deploy::fsm::{PipelineFsm, PipelineStage};
use crate::deploy::progress::{ConsoleReporter, ProgressReporter};
use crate::deploy::publish::{AssetPublisher, PagesPublisher, PublishRequest};
use crate::deploy::runner::{BuildStepRunner, CommandRunner};
use crate::errors::CapuchoError;
use crate::filesys::file::File;
use crate::http::client::HttpClient;
use crate::http::project::{BUNDLE_UPLOAD_PATH, NATIVE_UPLOAD_PATH};
use crate::http::upload::{UploadClient, UploadResult};
use crate::models::job::{ArtifactType, DeployJob, Platform};
use crate::storage::layout::ProjectLayout;
use crate::storage::project::{assert_initialized, ProjectDescriptor};
use crate::utils::sha256_file;
use crate::version::manifest::bump_version;
use crate::version::{VersionSnapshot, VersionSyncer};

/// Channel used when neither the job nor the config names one
pub const FALLBACK_CHANNEL: &str = "production";

/// Result of a successful deploy
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploySummary {
    pub version: String,
    pub version_code: u64,
    pub channel: String,
    pub environment: String,
    pub artifact: PathBuf,
    pub upload: UploadResult,
    pub warnings: Vec<String>,
}

/// Why and where a deploy stopped
#[derive(Debug, Error)]
#[error("Step {step} ({stage}) failed: {error}")]
pub struct DeployFailure {
    pub step: usize,
    pub stage: PipelineStage,
    #[source]
    pub error: CapuchoError,
    /// Diagnostic log holding command output of failed steps
    pub log_file: PathBuf,
}

/// Parameters settled by the ResolveParameters stage
struct ResolvedParameters {
    config: EffectiveConfig,
    client: HttpClient,
    api_key: SecretString,
    channel: String,
}

/// Orchestrates one deploy of one project
pub struct DeployPipeline {
    layout: ProjectLayout,
    resolver: ConfigResolver,
    runner: Arc<dyn CommandRunner>,
    publisher: Option<Arc<dyn AssetPublisher>>,
    reporter: Arc<dyn ProgressReporter>,
    uploader: Option<UploadClient>,
}

impl DeployPipeline {
    pub fn new(layout: ProjectLayout, resolver: ConfigResolver) -> Self {
        let runner: Arc<dyn CommandRunner> =
            Arc::new(BuildStepRunner::new(layout.diagnostic_log_file()));
        Self {
            layout,
            resolver,
            runner,
            publisher: None,
            reporter: Arc::new(ConsoleReporter),
            uploader: None,
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Replace the default pages publisher
    pub fn with_publisher(mut self, publisher: Arc<dyn AssetPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Use a preconfigured upload client instead of one derived from the config
    pub fn with_uploader(mut self, uploader: UploadClient) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// Run the whole pipeline for `job`
    pub async fn run(
        &self,
        job: &DeployJob,
        overrides: &ConfigMap,
    ) -> Result<DeploySummary, DeployFailure> {
        info!(
            "Deploying {} {} for {} ({})",
            job.artifact_type.as_str(),
            job.platform,
            job.environment,
            self.layout.root().display()
        );

        let mut fsm = PipelineFsm::new();
        let mut warnings = Vec::new();

        match self.execute(job, overrides, &mut fsm, &mut warnings).await {
            Ok(summary) => {
                self.reporter.finished(&summary);
                Ok(summary)
            }
            Err(e) => {
                let message = e.to_string();
                if let Err(transition) = fsm.fail(message.clone()) {
                    warn!("{}", transition);
                }
                let stage = fsm.failed_at().unwrap_or(PipelineStage::Failed);
                let failure = DeployFailure {
                    step: fsm.step(),
                    stage,
                    error: e,
                    log_file: self.layout.diagnostic_log_file().path().to_path_buf(),
                };
                error!("Deploy failed at step {} ({}): {}", failure.step, stage, message);
                self.reporter
                    .failed(stage, failure.step, &message, &failure.log_file);
                Err(failure)
            }
        }
    }

    async fn execute(
        &self,
        job: &DeployJob,
        overrides: &ConfigMap,
        fsm: &mut PipelineFsm,
        warnings: &mut Vec<String>,
    ) -> Result<DeploySummary, CapuchoError> {
        // Init
        self.reporter.stage_started(PipelineStage::Init);
        let descriptor = assert_initialized(&self.layout.descriptor_file()).await?;
        self.reporter.stage_finished(PipelineStage::Init);

        self.enter(fsm, PipelineStage::ResolveParameters)?;
        let params = self.resolve_parameters(job, overrides, warnings).await?;
        self.reporter.stage_finished(PipelineStage::ResolveParameters);

        if let Some(bump) = job.version_bump.filter(|bump| bump.changes_semver()) {
            self.enter(fsm, PipelineStage::VersionBump)?;
            bump_version(&self.layout.manifest_file(), bump).await?;
            self.reporter.stage_finished(PipelineStage::VersionBump);
        }

        self.enter(fsm, PipelineStage::VersionSync)?;
        let snapshot = VersionSyncer::new(self.layout.clone())
            .sync(
                &job.environment,
                job.flavor.as_deref(),
                job.version_bump.is_some(),
            )
            .await?;
        info!("Version {} ({})", snapshot.version, snapshot.version_code);
        self.reporter.stage_finished(PipelineStage::VersionSync);

        if !job.skip_build {
            self.enter(fsm, PipelineStage::BuildSteps)?;
            for command in self.build_commands(job) {
                self.runner.run(&command).await?;
            }
            self.reporter.stage_finished(PipelineStage::BuildSteps);
        }

        self.enter(fsm, PipelineStage::Package)?;
        let artifact = self
            .package(job, &descriptor, &snapshot, &params.config)
            .await?;
        self.reporter.stage_finished(PipelineStage::Package);

        if job.publish_assets {
            match &descriptor.pages_repo_url {
                Some(repo_url) => {
                    self.enter(fsm, PipelineStage::AssetPublish)?;
                    let request = PublishRequest {
                        root: self.layout.root().to_path_buf(),
                        repo_url: repo_url.clone(),
                        version: snapshot.version.clone(),
                        environment: job.environment.clone(),
                        flavor: job.flavor.clone(),
                    };
                    match self.publisher().publish(&request).await {
                        Ok(()) => self.reporter.stage_finished(PipelineStage::AssetPublish),
                        Err(e) => self.warn(warnings, format!("Asset publish failed: {}", e)),
                    }
                }
                None => self.warn(
                    warnings,
                    "Asset publish requested but the project has no pages repository".to_string(),
                ),
            }
        }

        self.enter(fsm, PipelineStage::Upload)?;
        let upload = self
            .upload(job, &descriptor, &snapshot, &params, &artifact)
            .await?;
        self.reporter.stage_finished(PipelineStage::Upload);

        if job.artifact_type == ArtifactType::Ota {
            if let Err(e) = File::new(&artifact).delete().await {
                self.warn(
                    warnings,
                    format!("Unable to remove bundle {}: {}", artifact.display(), e),
                );
            }
        }

        fsm.advance(PipelineStage::Done)
            .map_err(CapuchoError::DeployError)?;

        Ok(DeploySummary {
            version: snapshot.version,
            version_code: snapshot.version_code,
            channel: params.channel,
            environment: job.environment.clone(),
            artifact,
            upload,
            warnings: warnings.clone(),
        })
    }

    /// Advance the FSM and report the stage plus anything jumped over
    fn enter(&self, fsm: &mut PipelineFsm, stage: PipelineStage) -> Result<(), CapuchoError> {
        let already_skipped = fsm.skipped().len();
        fsm.advance(stage).map_err(CapuchoError::DeployError)?;
        for skipped in &fsm.skipped()[already_skipped..] {
            self.reporter.stage_skipped(*skipped);
        }
        self.reporter.stage_started(stage);
        Ok(())
    }

    fn warn(&self, warnings: &mut Vec<String>, message: String) {
        warn!("{}", message);
        self.reporter.warning(&message);
        warnings.push(message);
    }

    fn publisher(&self) -> Arc<dyn AssetPublisher> {
        match &self.publisher {
            Some(publisher) => publisher.clone(),
            None => Arc::new(PagesPublisher::new(self.runner.clone())),
        }
    }

    async fn resolve_parameters(
        &self,
        job: &DeployJob,
        overrides: &ConfigMap,
        warnings: &mut Vec<String>,
    ) -> Result<ResolvedParameters, CapuchoError> {
        if job.artifact_type == ArtifactType::Native && job.platform != Platform::Android {
            return Err(CapuchoError::ConfigError(format!(
                "Native builds are not supported for {}",
                job.platform
            )));
        }

        let config = self.resolver.resolve(overrides).await;
        let server_url = config.server_url().ok_or_else(|| {
            CapuchoError::MissingCredentials("serverUrl is not configured".to_string())
        })?;
        let api_key = config.api_key().ok_or_else(|| {
            CapuchoError::MissingCredentials("apiKey is not configured".to_string())
        })?;
        let client = HttpClient::new(&server_url)?;

        match client.me(&api_key).await {
            Ok(me) => info!("Authenticated as {}", me.email.as_deref().unwrap_or(&me.id)),
            Err(e) => self.warn(warnings, format!("Could not verify credentials: {}", e)),
        }

        let cloud = RemoteConfigCache::with_client(
            self.layout.cloud_cache_file(),
            client.clone(),
            api_key.clone(),
        )
        .fetch_project_config()
        .await;

        let channel = job
            .channel
            .clone()
            .or_else(|| config.default_channel().map(str::to_string))
            .unwrap_or_else(|| FALLBACK_CHANNEL.to_string());

        if let Some(cloud) = &cloud {
            if !cloud.channels.is_empty() && cloud.channel(&channel).is_none() {
                self.warn(
                    warnings,
                    format!("Channel '{}' is not known to the project", channel),
                );
            }
            if let Some(flavor) = &job.flavor {
                if !cloud.flavors.is_empty() && cloud.flavor(flavor).is_none() {
                    self.warn(
                        warnings,
                        format!("Flavor '{}' is not known to the project", flavor),
                    );
                }
            }
        }

        Ok(ResolvedParameters {
            config,
            client,
            api_key,
            channel,
        })
    }

    fn build_commands(&self, job: &DeployJob) -> Vec<CommandSpec> {
        let root = self.layout.root();
        let mut steps = Vec::new();
        if !job.skip_assets {
            steps.push(commands::generate_assets(root, &job.environment));
        }
        steps.push(commands::build_web(root, &job.environment));
        steps.push(commands::templating_sync(root, &job.environment));
        steps.push(commands::native_sync(root, job.platform));

        steps
            .into_iter()
            .map(|command| command.with_flavor(job.flavor.as_deref()))
            .collect()
    }

    async fn package(
        &self,
        job: &DeployJob,
        descriptor: &ProjectDescriptor,
        snapshot: &VersionSnapshot,
        config: &EffectiveConfig,
    ) -> Result<PathBuf, CapuchoError> {
        let (command, kind) = match job.artifact_type {
            ArtifactType::Native => (
                commands::native_compile(
                    self.layout.native_project_dir(job.platform).path(),
                    job.variant,
                ),
                ArtifactKind::Native {
                    variant: job.variant,
                },
            ),
            ArtifactType::Ota => (
                commands::bundle_zip(self.layout.root(), &descriptor.app_id, &snapshot.version),
                ArtifactKind::Ota {
                    output_dir: config.ota_output_dir(),
                },
            ),
        };

        self.runner
            .run(&command.with_flavor(job.flavor.as_deref()))
            .await?;

        let artifact = ArtifactLocator::new(self.layout.clone())
            .find(kind)
            .await
            .ok_or_else(|| {
                CapuchoError::ArtifactNotFound(format!(
                    "No {} artifact found after packaging",
                    job.artifact_type.as_str()
                ))
            })?;
        info!("Located artifact {}", artifact.display());
        Ok(artifact)
    }

    async fn upload(
        &self,
        job: &DeployJob,
        descriptor: &ProjectDescriptor,
        snapshot: &VersionSnapshot,
        params: &ResolvedParameters,
        artifact: &Path,
    ) -> Result<UploadResult, CapuchoError> {
        let path = match job.artifact_type {
            ArtifactType::Native => NATIVE_UPLOAD_PATH,
            ArtifactType::Ota => BUNDLE_UPLOAD_PATH,
        };
        let checksum = sha256_file(artifact).await?;

        let fields = [
            ("version", Some(snapshot.version.clone())),
            ("versionCode", Some(snapshot.version_code.to_string())),
            ("platform", Some(job.platform.as_str().to_string())),
            ("channel", Some(params.channel.clone())),
            ("appId", Some(descriptor.cloud_app_id.clone())),
            (
                "environment",
                (job.artifact_type == ArtifactType::Native).then(|| job.environment.clone()),
            ),
            ("required", Some(job.required.to_string())),
            ("active", Some(job.active.to_string())),
            (
                "releaseNotes",
                job.note.clone().filter(|note| !note.trim().is_empty()),
            ),
            ("checksum", Some(checksum)),
        ];

        let uploader = match &self.uploader {
            Some(uploader) => uploader.clone(),
            None => UploadClient::new(params.client.inner().clone())
                .with_field_name(params.config.upload_field_name()),
        };

        let result = uploader
            .upload(
                &params.client.url(path),
                artifact,
                &fields,
                Some(&params.api_key),
            )
            .await;

        if !result.success {
            return Err(CapuchoError::UploadError(format!(
                "status {}: {}",
                result.status,
                result.message()
            )));
        }
        info!("Uploaded {} (status {})", artifact.display(), result.status);
        Ok(result)
    }
}
