//! Finite State Machine for the deploy pipeline

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pipeline stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Load the project descriptor
    Init,

    /// Resolve config, credentials, channel and cloud config
    ResolveParameters,

    /// Semantic version bump in the manifest
    VersionBump,

    /// Write version metadata into the environment file
    VersionSync,

    /// Asset generation, web build and platform sync
    BuildSteps,

    /// Native compile or bundle archive, then locate the artifact
    Package,

    /// Publish the web build
    AssetPublish,

    Upload,

    Done,

    Failed,
}

/// Every stage a successful run can pass through
pub const STAGE_SEQUENCE: [PipelineStage; 9] = [
    PipelineStage::Init,
    PipelineStage::ResolveParameters,
    PipelineStage::VersionBump,
    PipelineStage::VersionSync,
    PipelineStage::BuildSteps,
    PipelineStage::Package,
    PipelineStage::AssetPublish,
    PipelineStage::Upload,
    PipelineStage::Done,
];

impl PipelineStage {
    /// Position in [`STAGE_SEQUENCE`]; `Failed` sorts after everything
    pub fn ordinal(&self) -> usize {
        STAGE_SEQUENCE
            .iter()
            .position(|stage| stage == self)
            .unwrap_or(STAGE_SEQUENCE.len())
    }

    /// 1-based step number shown to the user
    pub fn step(&self) -> usize {
        self.ordinal() + 1
    }

    /// Stages a job may leave out
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            PipelineStage::VersionBump | PipelineStage::BuildSteps | PipelineStage::AssetPublish
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PipelineStage::Init => "Load project",
            PipelineStage::ResolveParameters => "Resolve parameters",
            PipelineStage::VersionBump => "Bump version",
            PipelineStage::VersionSync => "Sync version",
            PipelineStage::BuildSteps => "Build",
            PipelineStage::Package => "Package",
            PipelineStage::AssetPublish => "Publish assets",
            PipelineStage::Upload => "Upload",
            PipelineStage::Done => "Done",
            PipelineStage::Failed => "Failed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Forward-only pipeline FSM
#[derive(Debug, Clone)]
pub struct PipelineFsm {
    stage: PipelineStage,
    /// Last stage entered before a failure
    failed_at: Option<PipelineStage>,
    error: Option<String>,
    skipped: Vec<PipelineStage>,
}

impl PipelineFsm {
    /// Create a new FSM at `Init`
    pub fn new() -> Self {
        Self {
            stage: PipelineStage::Init,
            failed_at: None,
            error: None,
            skipped: Vec::new(),
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn skipped(&self) -> &[PipelineStage] {
        &self.skipped
    }

    /// Step number of the current stage, or of the stage that failed
    pub fn step(&self) -> usize {
        self.failed_at.unwrap_or(self.stage).step()
    }

    /// Stage that failed, if any
    pub fn failed_at(&self) -> Option<PipelineStage> {
        self.failed_at
    }

    /// Move forward to `next`. Every stage jumped over must be skippable.
    pub fn advance(&mut self, next: PipelineStage) -> Result<(), String> {
        if self.stage.is_terminal() {
            return Err(format!(
                "Invalid transition: {:?} -> {:?}",
                self.stage, next
            ));
        }
        if next == PipelineStage::Failed {
            return Err("Use fail() to enter Failed".to_string());
        }
        if next.ordinal() <= self.stage.ordinal() {
            return Err(format!(
                "Invalid transition: {:?} -> {:?} (backward)",
                self.stage, next
            ));
        }

        let jumped = &STAGE_SEQUENCE[self.stage.ordinal() + 1..next.ordinal()];
        if let Some(required) = jumped.iter().find(|stage| !stage.is_skippable()) {
            return Err(format!(
                "Invalid transition: {:?} -> {:?} skips {:?}",
                self.stage, next, required
            ));
        }

        self.skipped.extend_from_slice(jumped);
        self.stage = next;
        Ok(())
    }

    /// Abort at the current stage
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), String> {
        if self.stage.is_terminal() {
            return Err(format!("Invalid transition: {:?} -> Failed", self.stage));
        }
        self.failed_at = Some(self.stage);
        self.error = Some(error.into());
        self.stage = PipelineStage::Failed;
        Ok(())
    }
}

impl Default for PipelineFsm {
    fn default() -> Self {
        Self::new()
    }
}
