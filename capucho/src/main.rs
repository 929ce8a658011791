//! Capucho - Entry Point
//!
//! Builds the app for one environment and publishes the result to the update
//! service.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use serde_json::Value;
use tracing::{debug, error};

use capucho::config::{ConfigMap, ConfigResolver, EffectiveConfig};
use capucho::deploy::progress::ConsoleReporter;
use capucho::deploy::DeployPipeline;
use capucho::http::client::HttpClient;
use capucho::init::{init_project, InitOptions};
use capucho::logs::{init_logging, LogLevel, LogOptions};
use capucho::models::job::{ArtifactType, BuildVariant, DeployJob, Platform, VersionBump};
use capucho::storage::layout::{GlobalLayout, ProjectLayout};
use capucho::storage::project::assert_initialized;
use capucho::utils::version_info;

const USAGE: &str = "\
Usage:
  capucho deploy --env=<env> [--type=native|ota] [--platform=android|ios] [--channel=<name>]
                 [--bump=major|minor|patch|build] [--flavor=<name>] [--variant=debug|release]
                 [--note=<text>] [--required] [--inactive] [--skip-assets] [--skip-build]
                 [--publish-assets]
  capucho init --app-id=<bundle id> --name=<app name> [--org=<id>] [--pages-repo=<url>]
  capucho config get [key] [--global]
  capucho config set <key> <value> [--global]
  capucho config unset <key> [--global]
  capucho channels
  capucho --version

Common options: --project=<dir> --server-url=<url> --api-key=<key> --log-level=<level> --json-logs";

struct CliArgs {
    positional: Vec<String>,
    options: HashMap<String, String>,
}

impl CliArgs {
    fn parse(args: impl Iterator<Item = String>) -> Self {
        let mut positional = Vec::new();
        let mut options = HashMap::new();

        for arg in args {
            if let Some(flag) = arg.strip_prefix("--") {
                match flag.split_once('=') {
                    Some((key, value)) => options.insert(key.to_string(), value.to_string()),
                    None => options.insert(flag.to_string(), "true".to_string()),
                };
            } else {
                positional.push(arg);
            }
        }

        Self {
            positional,
            options,
        }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some("true") | Some("1") | Some("yes"))
    }

    fn parsed<T: FromStr<Err = String>>(&self, key: &str) -> anyhow::Result<Option<T>> {
        self.get(key)
            .map(|value| T::from_str(value).map_err(|e| anyhow!(e)))
            .transpose()
    }

    /// Config keys given on the command line
    fn overrides(&self) -> ConfigMap {
        let mut overrides = ConfigMap::new();
        for (flag, key) in [
            ("server-url", "serverUrl"),
            ("api-key", "apiKey"),
            ("log-level", "logLevel"),
        ] {
            if let Some(value) = self.get(flag) {
                overrides.insert(key.to_string(), Value::String(value.to_string()));
            }
        }
        overrides
    }
}

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse(env::args().skip(1));

    if cli.flag("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("{}", e),
        }
        return;
    }

    if cli.flag("help") || cli.positional.is_empty() {
        println!("{}", USAGE);
        return;
    }

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: CliArgs) -> anyhow::Result<()> {
    let root = match cli.get("project") {
        Some(dir) => PathBuf::from(dir),
        None => env::current_dir().context("Unable to determine the project directory")?,
    };
    let layout = ProjectLayout::new(root);
    let resolver = ConfigResolver::new(&GlobalLayout::default(), &layout).with_env_vars(env::vars_os());

    let overrides = cli.overrides();

    // The level itself lives in the config, so this first pass runs before any
    // subscriber exists. Resolve again once logging is up so that warnings
    // about unreadable config files reach the user.
    let log_level = resolver.resolve(&overrides).await.log_level();
    let log_options = LogOptions {
        log_level: log_level.unwrap_or(LogLevel::Info),
        json_format: cli.flag("json-logs"),
        ..Default::default()
    };
    if let Err(e) = init_logging(log_options) {
        eprintln!("Failed to initialize logging: {e}");
    }
    let config = resolver.resolve(&overrides).await;
    debug!("Project root {}", layout.root().display());

    let command = cli.positional[0].as_str();
    match command {
        "deploy" => deploy(&cli, layout, resolver, &config, &overrides).await,
        "init" => init(&cli, &layout, &config).await,
        "config" => config_command(&cli, &resolver, &config).await,
        "channels" => channels(&layout, &config).await,
        other => bail!("Unknown command `{}`\n\n{}", other, USAGE),
    }
}

async fn deploy(
    cli: &CliArgs,
    layout: ProjectLayout,
    resolver: ConfigResolver,
    config: &EffectiveConfig,
    overrides: &ConfigMap,
) -> anyhow::Result<()> {
    let environment = cli
        .get("env")
        .or_else(|| cli.get("environment"))
        .ok_or_else(|| anyhow!("--env is required"))?;
    let artifact_type = cli
        .parsed::<ArtifactType>("type")?
        .unwrap_or(ArtifactType::Ota);
    let platform = match cli.parsed::<Platform>("platform")? {
        Some(platform) => platform,
        None => config.default_platform().unwrap_or(Platform::Android),
    };

    let mut job = DeployJob::new(environment.to_string(), artifact_type, platform);
    job.channel = cli.get("channel").map(str::to_string);
    job.version_bump = cli.parsed::<VersionBump>("bump")?;
    job.flavor = cli.get("flavor").map(str::to_string);
    job.variant = cli.parsed::<BuildVariant>("variant")?.unwrap_or_default();
    job.note = cli.get("note").map(str::to_string);
    job.required = cli.flag("required");
    job.active = !cli.flag("inactive");
    job.skip_assets = cli.flag("skip-assets");
    job.skip_build = cli.flag("skip-build");
    job.publish_assets = cli.flag("publish-assets");

    let pipeline =
        DeployPipeline::new(layout, resolver).with_reporter(Arc::new(ConsoleReporter));
    let summary = pipeline.run(&job, overrides).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn init(cli: &CliArgs, layout: &ProjectLayout, config: &EffectiveConfig) -> anyhow::Result<()> {
    let options = InitOptions {
        app_id: cli
            .get("app-id")
            .ok_or_else(|| anyhow!("--app-id is required"))?
            .to_string(),
        app_name: cli
            .get("name")
            .ok_or_else(|| anyhow!("--name is required"))?
            .to_string(),
        organization_id: cli.get("org").map(str::to_string),
        pages_repo_url: cli.get("pages-repo").map(str::to_string),
    };

    let descriptor = init_project(layout, config, options).await?;
    println!("{}", serde_json::to_string_pretty(&descriptor)?);
    Ok(())
}

async fn config_command(
    cli: &CliArgs,
    resolver: &ConfigResolver,
    config: &EffectiveConfig,
) -> anyhow::Result<()> {
    let global = cli.flag("global");
    let action = cli.positional.get(1).map(String::as_str);
    let key = cli.positional.get(2).map(String::as_str);

    match (action, key) {
        (Some("get"), None) => {
            let mut values = config.values().clone();
            if values.contains_key("apiKey") {
                values.insert("apiKey".to_string(), Value::String("********".to_string()));
            }
            println!("{}", serde_json::to_string_pretty(&values)?);
        }
        (Some("get"), Some(key)) => match config.get(key) {
            Some(Value::String(value)) => println!("{}", value),
            Some(value) => println!("{}", value),
            None => bail!("`{}` is not set", key),
        },
        (Some("set"), Some(key)) => {
            let raw = cli
                .positional
                .get(3)
                .ok_or_else(|| anyhow!("config set needs a value"))?;
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()));
            if global {
                resolver.set_global_config(key, value).await?;
            } else {
                resolver.set_project_config(key, value).await?;
            }
        }
        (Some("unset"), Some(key)) => {
            let removed = if global {
                resolver.unset_global_config(key).await?
            } else {
                resolver.unset_project_config(key).await?
            };
            if !removed {
                eprintln!("`{}` was not set", key);
            }
        }
        _ => bail!("{}", USAGE),
    }
    Ok(())
}

async fn channels(layout: &ProjectLayout, config: &EffectiveConfig) -> anyhow::Result<()> {
    let descriptor = assert_initialized(&layout.descriptor_file()).await?;
    let (server_url, api_key) = config
        .credentials()
        .ok_or_else(|| anyhow!("serverUrl and apiKey must be configured"))?;

    let client = HttpClient::new(&server_url)?;
    let channels = client
        .list_channels(&api_key, &descriptor.cloud_app_id)
        .await?;
    for channel in channels {
        let visibility = if channel.public { "public" } else { "private" };
        match channel.environment {
            Some(environment) => println!("{}\t{}\t{}", channel.name, visibility, environment),
            None => println!("{}\t{}", channel.name, visibility),
        }
    }
    Ok(())
}
