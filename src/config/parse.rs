//! Configuration file parsing and discovery

use crate::config::types::{flatten, ConfigMap};
use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde_json::Value;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default configuration file names to search for
pub const CONFIG_FILE_NAMES: &[&str] = &["runkit.yml", "runkit.yaml"];

/// Find the configuration file by searching current and parent directories
pub fn find_config_file() -> ConfigResult<PathBuf> {
    find_config_file_from(env::current_dir().map_err(|e| {
        ConfigError::Invalid(format!("Failed to get current directory: {}", e))
    })?)
}

/// Find the configuration file starting from a specific directory
pub fn find_config_file_from(start_dir: PathBuf) -> ConfigResult<PathBuf> {
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        for file_name in CONFIG_FILE_NAMES {
            let config_path = current_dir.join(file_name);
            searched_paths.push(config_path.display().to_string());

            if config_path.is_file() {
                return Ok(config_path);
            }
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(ConfigError::NotFound(searched_paths.join(", "))),
        }
    }
}

/// Per-user configuration file, if the platform has a config directory
pub fn user_config_file() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("", "", "runkit")?;
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dirs.config_dir().join(name))
        .find(|path| path.is_file())
}

/// Parse a configuration file from a path
pub fn parse_config_file(path: &Path) -> ConfigResult<ConfigMap> {
    debug!(path = %path.display(), "reading config file");
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    parse_config(&contents).map_err(|e| match e {
        ConfigError::Invalid(error) => ConfigError::ReadFile {
            path: path.to_path_buf(),
            error,
        },
        other => other,
    })
}

/// Parse configuration from a YAML string into dotted names
pub fn parse_config(yaml: &str) -> ConfigResult<ConfigMap> {
    let value: Value = serde_yaml::from_str(yaml).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    match value {
        Value::Object(_) => Ok(flatten(value)),
        Value::Null => Ok(ConfigMap::new()),
        _ => Err(ConfigError::Invalid("expected a mapping at the top level".to_string())),
    }
}

/// Parse configuration with automatic file discovery.
///
/// The nearest project file wins; the per-user file is the fallback. No file
/// at all is an empty configuration.
pub fn parse_config_auto() -> ConfigResult<(ConfigMap, Option<PathBuf>)> {
    let path = match find_config_file() {
        Ok(path) => Some(path),
        Err(ConfigError::NotFound(_)) => user_config_file(),
        Err(e) => return Err(e),
    };

    match path {
        Some(path) => Ok((parse_config_file(&path)?, Some(path))),
        None => Ok((ConfigMap::new(), None)),
    }
}
