use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "TXLOAD_CONFIG_PATH";
/// Honored after `TXLOAD_CONFIG_PATH` for deployments that already export it.
pub const LEGACY_CONFIG_PATH_ENV: &str = "CONFIG_PATH";
pub const RESULT_PATH_ENV: &str = "RESULT_PATH";
pub const DEFAULT_CONFIG_FILE: &str = "txload.toml";
pub const DEFAULT_RESULT_FILE: &str = "result.json";

/// CLI flag, then `TXLOAD_CONFIG_PATH`, then `CONFIG_PATH`, then `./txload.toml`.
pub fn resolve_config_path(cli: Option<&Path>) -> PathBuf {
    resolve_config_path_with(cli, env_value)
}

/// CLI flag, then `RESULT_PATH`, then `./result.json`.
pub fn resolve_result_path(cli: Option<&Path>) -> PathBuf {
    resolve_result_path_with(cli, env_value)
}

pub fn resolve_config_path_with(cli: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    cli.map(Path::to_path_buf)
        .or_else(|| lookup(CONFIG_PATH_ENV).map(PathBuf::from))
        .or_else(|| lookup(LEGACY_CONFIG_PATH_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

pub fn resolve_result_path_with(cli: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    cli.map(Path::to_path_buf).or_else(|| lookup(RESULT_PATH_ENV).map(PathBuf::from)).unwrap_or_else(|| PathBuf::from(DEFAULT_RESULT_FILE))
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
