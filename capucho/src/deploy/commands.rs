//! External toolchain commands
//!
//! Command names follow a fixed convention shared with the web/native
//! toolchain of the project, so they are built here and nowhere else.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::models::job::{BuildVariant, Platform};

/// Environment variable carrying the selected flavor to every step
pub const FLAVOR_ENV_VAR: &str = "APP_FLAVOR";

/// One external command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub envs: Vec<(String, String)>,
    /// Captured output is not echoed to the log
    pub silent: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            envs: Vec::new(),
            silent: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Attach the flavor variable when a flavor is selected
    pub fn with_flavor(self, flavor: Option<&str>) -> Self {
        match flavor {
            Some(flavor) => self.env(FLAVOR_ENV_VAR, flavor),
            None => self,
        }
    }

    /// Executable actually spawned; `npm`/`npx` go through their `.cmd` shims on Windows
    pub fn resolved_program(&self) -> String {
        resolve_program(&self.program, cfg!(windows))
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

fn resolve_program(program: &str, windows: bool) -> String {
    if windows && matches!(program, "npm" | "npx") {
        format!("{}.cmd", program)
    } else {
        program.to_string()
    }
}

/// `npm run generate-assets:<env>`
pub fn generate_assets(root: &Path, environment: &str) -> CommandSpec {
    CommandSpec::new("npm", root).args(["run".to_string(), format!("generate-assets:{}", environment)])
}

/// `npm run build:<env>`
pub fn build_web(root: &Path, environment: &str) -> CommandSpec {
    CommandSpec::new("npm", root).args(["run".to_string(), format!("build:{}", environment)])
}

/// `npx trapeze run trapeze/<env>.yaml -y`
pub fn templating_sync(root: &Path, environment: &str) -> CommandSpec {
    CommandSpec::new("npx", root).args([
        "trapeze".to_string(),
        "run".to_string(),
        format!("trapeze/{}.yaml", environment),
        "-y".to_string(),
    ])
}

/// `npx cap sync <platform>`
pub fn native_sync(root: &Path, platform: Platform) -> CommandSpec {
    CommandSpec::new("npx", root).args(["cap", "sync", platform.as_str()])
}

/// `./gradlew assembleDebug|assembleRelease`, run inside the native project
pub fn native_compile(native_dir: &Path, variant: BuildVariant) -> CommandSpec {
    let task = match variant {
        BuildVariant::Debug => "assembleDebug",
        BuildVariant::Release => "assembleRelease",
    };
    let gradlew = if cfg!(windows) { "gradlew.bat" } else { "./gradlew" };
    CommandSpec::new(gradlew, native_dir).arg(task)
}

/// `npx @capgo/cli bundle zip <appId> --bundle <version> --path dist`
pub fn bundle_zip(root: &Path, app_id: &str, version: &str) -> CommandSpec {
    CommandSpec::new("npx", root).args([
        "@capgo/cli",
        "bundle",
        "zip",
        app_id,
        "--bundle",
        version,
        "--path",
        "dist",
    ])
}

/// `npx gh-pages -d dist -r <repo> -m "Deploy <version> (<env>)"`
pub fn publish_pages(root: &Path, repo_url: &str, version: &str, environment: &str) -> CommandSpec {
    CommandSpec::new("npx", root).args([
        "gh-pages".to_string(),
        "-d".to_string(),
        "dist".to_string(),
        "-r".to_string(),
        repo_url.to_string(),
        "-m".to_string(),
        format!("Deploy {} ({})", version, environment),
    ])
}
