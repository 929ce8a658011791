//! Error types for capucho

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for capucho
#[derive(Error, Debug)]
pub enum CapuchoError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {status} - {body}")]
    ApiError { status: u16, body: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Project not initialized: {0}")]
    ProjectNotInitialized(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Version error: {0}")]
    VersionError(String),

    #[error("Command `{command}` failed: {message} (details in {})", log_file.display())]
    CommandFailed {
        command: String,
        message: String,
        log_file: PathBuf,
    },

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Upload failed: {0}")]
    UploadError(String),

    #[error("Deployment error: {0}")]
    DeployError(String),
}
