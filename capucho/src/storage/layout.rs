//! Storage layout configuration

use std::path::{Path, PathBuf};

use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::models::job::{BuildVariant, Platform};

/// Name of the tool directory, both under the home directory and the project root
pub const CAPUCHO_DIR: &str = ".capucho";

/// Per-user storage, rooted at the home directory
#[derive(Debug, Clone)]
pub struct GlobalLayout {
    pub home_dir: PathBuf,
}

impl GlobalLayout {
    pub fn new(home_dir: impl Into<PathBuf>) -> Self {
        Self {
            home_dir: home_dir.into(),
        }
    }

    /// `<home>/.capucho`
    pub fn capucho_dir(&self) -> Dir {
        Dir::new(self.home_dir.join(CAPUCHO_DIR))
    }

    /// `<home>/.capucho/config.json`
    pub fn config_file(&self) -> File {
        self.capucho_dir().file("config.json")
    }
}

impl Default for GlobalLayout {
    fn default() -> Self {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(home_dir)
    }
}

/// Per-project storage and build-output conventions, rooted at the project directory
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<project>/.capucho`
    pub fn capucho_dir(&self) -> Dir {
        Dir::new(self.root.join(CAPUCHO_DIR))
    }

    /// `<project>/.capucho/config.json`
    pub fn config_file(&self) -> File {
        self.capucho_dir().file("config.json")
    }

    /// `<project>/.capucho/project.json`
    pub fn descriptor_file(&self) -> File {
        self.capucho_dir().file("project.json")
    }

    /// `<project>/.capucho/cloud-cache.json`
    pub fn cloud_cache_file(&self) -> File {
        self.capucho_dir().file("cloud-cache.json")
    }

    /// `<project>/version-code.json`
    pub fn version_counter_file(&self) -> File {
        File::new(self.root.join("version-code.json"))
    }

    /// `<project>/capucho-deploy.log`
    pub fn diagnostic_log_file(&self) -> File {
        File::new(self.root.join("capucho-deploy.log"))
    }

    /// `<project>/package.json`
    pub fn manifest_file(&self) -> File {
        File::new(self.root.join("package.json"))
    }

    /// `.env.<environment>`, or `.env.<flavor>.<environment>` for a flavored build
    pub fn env_file(&self, environment: &str, flavor: Option<&str>) -> File {
        let name = match flavor {
            Some(flavor) => format!(".env.{}.{}", flavor, environment),
            None => format!(".env.{}", environment),
        };
        File::new(self.root.join(name))
    }

    /// Native project directory for a platform
    pub fn native_project_dir(&self, platform: Platform) -> Dir {
        Dir::new(self.root.join(platform.as_str()))
    }

    /// Variant-scoped native output directory
    pub fn native_output_dir(&self, variant: BuildVariant) -> Dir {
        self.native_project_dir(Platform::Android)
            .subdir("app")
            .subdir("build")
            .subdir("outputs")
            .subdir("apk")
            .subdir(variant.as_str())
    }

    /// Directory scanned for OTA bundles; `override_dir` is relative to the root
    pub fn ota_output_dir(&self, override_dir: Option<&str>) -> Dir {
        match override_dir {
            Some(dir) => Dir::new(self.root.join(dir)),
            None => Dir::new(self.root.clone()),
        }
    }
}
