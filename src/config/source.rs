//! Configuration sources consulted before first dispatch

use crate::config::parse::{
    find_config_file_from, parse_config_auto, parse_config_file, user_config_file,
};
use crate::config::types::ConfigMap;
use crate::error::{ConfigError, ConfigResult};
use std::path::PathBuf;

/// Anything that can provide `{dotted.name: value}` configuration
pub trait ConfigSource {
    fn load(&self) -> ConfigResult<ConfigMap>;
}

/// YAML file configuration.
///
/// With an explicit path that file must exist. Otherwise `runkit.yml` or
/// `runkit.yaml` is searched for upward from the start directory, falling back
/// to the per-user config directory.
#[derive(Debug, Clone, Default)]
pub struct YamlConfig {
    path: Option<PathBuf>,
    start_dir: Option<PathBuf>,
}

impl YamlConfig {
    /// Discover the file from the current directory
    pub fn discover() -> Self {
        Self::default()
    }

    /// Use exactly this file
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        YamlConfig {
            path: Some(path.into()),
            start_dir: None,
        }
    }

    /// Discover the file starting from `dir`
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        YamlConfig {
            path: None,
            start_dir: Some(dir.into()),
        }
    }
}

impl ConfigSource for YamlConfig {
    fn load(&self) -> ConfigResult<ConfigMap> {
        if let Some(path) = &self.path {
            return parse_config_file(path);
        }

        let Some(start_dir) = &self.start_dir else {
            return parse_config_auto().map(|(config, _)| config);
        };

        let path = match find_config_file_from(start_dir.clone()) {
            Ok(path) => Some(path),
            Err(ConfigError::NotFound(_)) => user_config_file(),
            Err(e) => return Err(e),
        };
        match path {
            Some(path) => parse_config_file(&path),
            None => Ok(ConfigMap::new()),
        }
    }
}

/// In-memory configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticConfig(pub ConfigMap);

impl StaticConfig {
    pub fn new(config: ConfigMap) -> Self {
        StaticConfig(config)
    }
}

impl ConfigSource for StaticConfig {
    fn load(&self) -> ConfigResult<ConfigMap> {
        Ok(self.0.clone())
    }
}
