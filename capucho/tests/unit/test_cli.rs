//! Command line front end, run as a child process

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn capucho(home: &Path, project: &Path, args: &[&str]) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_capucho"));
    command
        .args(args)
        .arg(format!("--project={}", project.display()))
        .env("HOME", home)
        .env_remove("RUST_LOG")
        .env_remove("CAPUCHO_LOG_LEVEL")
        .env_remove("CAPUCHO_API_KEY")
        .env_remove("CAPUCHO_SERVER_URL")
        .env_remove("CAPUCHO_DEFAULT_CHANNEL");
    command
}

fn run(mut command: Command) -> Output {
    command.output().unwrap()
}

#[test]
fn test_corrupt_project_config_is_reported() {
    let home = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    std::fs::create_dir_all(project.path().join(".capucho")).unwrap();
    std::fs::write(project.path().join(".capucho").join("config.json"), "{ broken").unwrap();

    let output = run(capucho(home.path(), project.path(), &["config", "get"]));

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "{}");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Ignoring project config"), "{}", stderr);
}

#[test]
fn test_env_layer_reaches_config_get() {
    let home = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();

    let mut command = capucho(home.path(), project.path(), &["config", "get", "defaultChannel"]);
    command.env("CAPUCHO_DEFAULT_CHANNEL", "beta");
    let output = run(command);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "beta");
}

#[cfg(unix)]
#[test]
fn test_non_unicode_environment_does_not_abort() {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;

    let home = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();

    let mut command = capucho(home.path(), project.path(), &["config", "get"]);
    command.env("UNRELATED_BYTES", OsString::from_vec(vec![0xff]));
    let output = run(command);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "{}");
}
