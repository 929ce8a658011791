//! Build step execution

use std::process::Stdio;

use async_trait::async_trait;
use chrono::Utc;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::deploy::commands::CommandSpec;
use crate::errors::CapuchoError;
use crate::filesys::file::File;

/// Captured output of a successful command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs one external command to completion
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, CapuchoError>;
}

/// Spawns real processes and records failures in the diagnostic log
pub struct BuildStepRunner {
    log_file: File,
}

impl BuildStepRunner {
    pub fn new(log_file: File) -> Self {
        Self { log_file }
    }

    pub fn log_file(&self) -> &File {
        &self.log_file
    }

    async fn record_failure(
        &self,
        command: &CommandSpec,
        message: &str,
        stdout: &str,
        stderr: &str,
    ) -> CapuchoError {
        let block = diagnostic_block(command, message, stdout, stderr);
        if let Err(e) = self.log_file.append_string(&block).await {
            error!(
                "Unable to write diagnostic log {}: {}",
                self.log_file.path().display(),
                e
            );
        }

        CapuchoError::CommandFailed {
            command: command.to_string(),
            message: message.to_string(),
            log_file: self.log_file.path().to_path_buf(),
        }
    }
}

#[async_trait]
impl CommandRunner for BuildStepRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, CapuchoError> {
        info!("Running `{}` in {}", command, command.working_dir.display());

        let output = Command::new(command.resolved_program())
            .args(&command.args)
            .current_dir(&command.working_dir)
            .envs(command.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                let message = format!("failed to start: {}", e);
                return Err(self.record_failure(command, &message, "", "").await);
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !command.silent {
            if !stdout.trim().is_empty() {
                debug!("stdout of `{}`:\n{}", command, stdout.trim_end());
            }
            if !stderr.trim().is_empty() {
                debug!("stderr of `{}`:\n{}", command, stderr.trim_end());
            }
        }

        if !output.status.success() {
            let message = match output.status.code() {
                Some(code) => format!("exited with code {}", code),
                None => "terminated by signal".to_string(),
            };
            return Err(self.record_failure(command, &message, &stdout, &stderr).await);
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

fn diagnostic_block(command: &CommandSpec, message: &str, stdout: &str, stderr: &str) -> String {
    format!(
        "==== {} ====\ncommand: {}\ncwd: {}\nerror: {}\n---- stdout ----\n{}\n---- stderr ----\n{}\n\n",
        Utc::now().to_rfc3339(),
        command,
        command.working_dir.display(),
        message,
        stdout.trim_end(),
        stderr.trim_end()
    )
}
