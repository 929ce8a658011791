//! Deploy progress display

use std::path::Path;

use colored::Colorize;

use crate::deploy::fsm::PipelineStage;
use crate::deploy::pipeline::DeploySummary;

/// Receives pipeline progress
pub trait ProgressReporter: Send + Sync {
    fn stage_started(&self, stage: PipelineStage);

    fn stage_finished(&self, stage: PipelineStage);

    fn stage_skipped(&self, stage: PipelineStage);

    fn warning(&self, message: &str);

    fn failed(&self, stage: PipelineStage, step: usize, error: &str, log_file: &Path);

    fn finished(&self, summary: &DeploySummary);
}

/// Human-facing reporter writing colored lines to stderr
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn stage_started(&self, stage: PipelineStage) {
        eprintln!("{} {}", format!("[{}]", stage.step()).cyan(), stage.label().bold());
    }

    fn stage_finished(&self, stage: PipelineStage) {
        eprintln!("{} {}", "  ✔".green(), stage.label());
    }

    fn stage_skipped(&self, stage: PipelineStage) {
        eprintln!(
            "{} {}",
            format!("[{}]", stage.step()).dimmed(),
            format!("{} (skipped)", stage.label()).dimmed()
        );
    }

    fn warning(&self, message: &str) {
        eprintln!("{} {}", "  ⚠".yellow(), message.yellow());
    }

    fn failed(&self, stage: PipelineStage, step: usize, error: &str, log_file: &Path) {
        eprintln!(
            "{} step {} ({}) failed: {}",
            "✖".red().bold(),
            step,
            stage.label(),
            error
        );
        eprintln!("  see {} for details", log_file.display());
    }

    fn finished(&self, summary: &DeploySummary) {
        eprintln!(
            "{} {} ({}) deployed to {} [{}]",
            "✔".green().bold(),
            summary.version.bold(),
            summary.version_code,
            summary.channel,
            summary.environment
        );
        for warning in &summary.warnings {
            eprintln!("{} {}", "  ⚠".yellow(), warning);
        }
    }
}

/// Discards everything
#[derive(Debug, Default)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn stage_started(&self, _stage: PipelineStage) {}

    fn stage_finished(&self, _stage: PipelineStage) {}

    fn stage_skipped(&self, _stage: PipelineStage) {}

    fn warning(&self, _message: &str) {}

    fn failed(&self, _stage: PipelineStage, _step: usize, _error: &str, _log_file: &Path) {}

    fn finished(&self, _summary: &DeploySummary) {}
}
