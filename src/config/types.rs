//! Core configuration types
//!
//! Configuration is a flat map of dotted names to JSON values. Nested
//! mappings from a file are flattened on load.

use crate::error::{ConfigError, ConfigResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Dotted name -> value
pub type ConfigMap = IndexMap<String, Value>;

/// Deepest dotted name produced by [`flatten`]; deeper structure stays a value
pub const MAX_DEPTH: usize = 3;

/// Runner settings from the `run` section
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSettings {
    /// Echo external commands before running them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub echo: Option<bool>,

    /// Output to hide: `true`, `none`, `stdout`, `stderr` or `all`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide: Option<Value>,

    /// Show debug output and full error chains
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
}

impl RunSettings {
    /// Read the `run.*` entries of a config map
    pub fn from_config(config: &ConfigMap) -> ConfigResult<Self> {
        let section: Map<String, Value> = config
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix("run.")
                    .map(|name| (name.to_string(), value.clone()))
            })
            .collect();

        serde_json::from_value(Value::Object(section))
            .map_err(|e| ConfigError::Invalid(format!("run settings: {e}")))
    }
}

/// Flatten nested mappings into dotted names, at most [`MAX_DEPTH`] deep
pub fn flatten(value: Value) -> ConfigMap {
    let mut out = ConfigMap::new();
    if let Value::Object(map) = value {
        for (key, value) in map {
            flatten_into(&mut out, key, value, 1);
        }
    }
    out
}

fn flatten_into(out: &mut ConfigMap, prefix: String, value: Value, depth: usize) {
    match value {
        Value::Object(map) if depth < MAX_DEPTH && !map.is_empty() => {
            for (key, value) in map {
                flatten_into(out, format!("{prefix}.{key}"), value, depth + 1);
            }
        }
        value => {
            out.insert(prefix, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_mapping() {
        let config = flatten(json!({
            "run": {"echo": true},
            "defaults": {"build": {"target": "release", "env": {"A": "1"}}},
            "top": 1
        }));
        assert_eq!(config["run.echo"], json!(true));
        assert_eq!(config["defaults.build.target"], json!("release"));
        assert_eq!(config["defaults.build.env"], json!({"A": "1"}));
        assert_eq!(config["top"], json!(1));
    }

    #[test]
    fn test_flatten_non_mapping_is_empty() {
        assert!(flatten(json!([1, 2])).is_empty());
    }

    #[test]
    fn test_run_settings_from_config() {
        let config = flatten(json!({"run": {"echo": true, "hide": "stdout"}}));
        let settings = RunSettings::from_config(&config).unwrap();
        assert_eq!(settings.echo, Some(true));
        assert_eq!(settings.hide, Some(json!("stdout")));
        assert_eq!(settings.debug, None);
    }

    #[test]
    fn test_run_settings_reject_unknown_keys() {
        let config = flatten(json!({"run": {"colour": true}}));
        assert!(RunSettings::from_config(&config).is_err());
    }
}
