//! Build output discovery
//!
//! Lookups never fail: a missing directory, an unreadable entry or no match
//! all yield `None`, and the caller decides whether that is fatal.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::models::job::BuildVariant;
use crate::storage::layout::ProjectLayout;

pub const NATIVE_EXTENSION: &str = "apk";
pub const BUNDLE_EXTENSION: &str = "zip";

/// Name fragments of instrumentation and intermediate outputs
const TEST_ARTIFACT_PATTERNS: &[&str] = &["androidTest", "-test.", "-unaligned."];

/// What to look for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind<'a> {
    Native { variant: BuildVariant },
    /// `output_dir` is relative to the project root; `None` means the root itself
    Ota { output_dir: Option<&'a str> },
}

/// Finds build outputs inside one project
#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    layout: ProjectLayout,
}

impl ArtifactLocator {
    pub fn new(layout: ProjectLayout) -> Self {
        Self { layout }
    }

    pub async fn find(&self, kind: ArtifactKind<'_>) -> Option<PathBuf> {
        match kind {
            ArtifactKind::Native { variant } => {
                find_native_artifact(&self.layout.native_output_dir(variant)).await
            }
            ArtifactKind::Ota { output_dir } => {
                find_ota_bundle(&self.layout.ota_output_dir(output_dir)).await
            }
        }
    }
}

/// First installable binary under `dir` (searched recursively, sorted by path)
pub async fn find_native_artifact(dir: &Dir) -> Option<PathBuf> {
    if !dir.exists().await {
        debug!("Native output dir {} does not exist", dir.path().display());
        return None;
    }

    let files = match dir.list_files_recursive().await {
        Ok(files) => files,
        Err(e) => {
            debug!("Unable to scan {}: {}", dir.path().display(), e);
            return None;
        }
    };

    files
        .into_iter()
        .find(|path| has_extension(path, NATIVE_EXTENSION) && !is_test_artifact(path))
}

/// Most recently modified bundle archive directly inside `dir`
pub async fn find_ota_bundle(dir: &Dir) -> Option<PathBuf> {
    if !dir.exists().await {
        debug!("Bundle dir {} does not exist", dir.path().display());
        return None;
    }

    let files = match dir.list_files().await {
        Ok(files) => files,
        Err(e) => {
            debug!("Unable to scan {}: {}", dir.path().display(), e);
            return None;
        }
    };

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for path in files {
        if !has_extension(&path, BUNDLE_EXTENSION) {
            continue;
        }
        let Ok(modified) = File::new(&path).modified().await else {
            continue;
        };
        if newest.as_ref().map_or(true, |(best, _)| modified > *best) {
            newest = Some((modified, path));
        }
    }

    newest.map(|(_, path)| path)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

fn is_test_artifact(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    TEST_ARTIFACT_PATTERNS
        .iter()
        .any(|pattern| name.contains(pattern))
}
