pub mod completions;
pub mod init;
pub mod man_pages;
pub mod platforms;
pub mod resolve;
pub mod verify_lock;

use shellenv_core::{CoreError, Engine, InheritedEnv};
use shellenv_schema::{load_sources, Channel, EnvironmentSource, Platform, ResolvedEnvironment};
use std::path::PathBuf;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_SOURCE_ERROR: u8 = 2;
pub const EXIT_RESOLVE_ERROR: u8 = 3;
pub const EXIT_LOCK_ERROR: u8 = 4;

pub const DEFAULT_SOURCE: &str = "shellenv.toml";

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// Prefix the message with the error's taxonomy name so `main` can map it to
/// an exit code and users can grep for it.
pub fn core_err(e: impl Into<CoreError>) -> String {
    let e = e.into();
    format!("{}: {e}", e.kind())
}

pub fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with("UnsupportedPlatform:") || msg.starts_with("ConflictingOverlay:") {
        EXIT_RESOLVE_ERROR
    } else if msg.starts_with("SourceError:") || msg.starts_with("PlatformTableError:") {
        EXIT_SOURCE_ERROR
    } else if msg.starts_with("LockError:") || msg.starts_with("lock drift:") {
        EXIT_LOCK_ERROR
    } else {
        EXIT_FAILURE
    }
}

pub fn colorize_channel(channel: &Channel) -> String {
    use console::Style;
    match channel {
        Channel::Stable => Style::new().green().apply_to(channel).to_string(),
        Channel::Nightly => Style::new().magenta().apply_to(channel).to_string(),
        Channel::Custom(_) => Style::new().yellow().apply_to(channel).to_string(),
    }
}

pub fn make_engine(platforms_file: Option<&PathBuf>) -> Result<Engine, String> {
    Engine::from_table_file(platforms_file.map(PathBuf::as_path)).map_err(core_err)
}

pub fn read_sources(paths: &[PathBuf]) -> Result<Vec<EnvironmentSource>, String> {
    if paths.is_empty() {
        return load_sources(&[DEFAULT_SOURCE]).map_err(core_err);
    }
    load_sources(paths).map_err(core_err)
}

/// Requested platforms, or the host platform when none were given.
pub fn requested_platforms(platforms: &[String]) -> Result<Vec<String>, String> {
    if !platforms.is_empty() {
        return Ok(platforms.to_vec());
    }
    Platform::current()
        .map(|p| vec![p.to_string()])
        .ok_or_else(|| "could not detect the host platform; pass --platform".to_owned())
}

/// Capture the library-path variables named by the platform table from the
/// calling environment.
pub fn inherited_env(engine: &Engine, inherit: bool) -> InheritedEnv {
    let mut env = InheritedEnv::new();
    if !inherit {
        return env;
    }
    for set in engine.table().iter() {
        if let Ok(value) = std::env::var(&set.library_path_var) {
            env.insert(set.library_path_var.clone(), value);
        }
    }
    env
}

pub fn environment_json(env: &ResolvedEnvironment) -> serde_json::Value {
    let identity = env.identity();
    serde_json::json!({
        "platform": env.platform,
        "env_id": identity.env_id,
        "short_id": identity.short_id,
        "library_path_var": env.library_path_var,
        "library_path": env.library_path_string(),
        "init_statements": env.init_statements,
        "packages": env.packages,
    })
}
