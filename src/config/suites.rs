//! Suite discovery and per-suite settings layering.
//!
//! Suite settings are built from, lowest to highest precedence:
//! 1. Built-in suite defaults
//! 2. Selected keys of the global configuration
//! 3. `<suite>.suite.dist.yml`
//! 4. `<suite>.suite.yml`
//! 5. Environment fragments staged under `env`

use super::files::{load_file, load_optional};
use super::merge::merge_configs;
use super::params::Params;
use super::value::{ConfigTree, empty_map};
use crate::error::{ConfigurationError, Error, Result};
use serde_json::{Map, Value, json};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

const SUITE_SUFFIX: &str = ".suite.yml";
const SUITE_DIST_SUFFIX: &str = ".suite.dist.yml";
const ENV_SUFFIX: &str = ".yml";
const ENV_DIST_SUFFIX: &str = ".dist.yml";

/// Global keys copied into every suite's settings.
pub const GLOBAL_SUITE_KEYS: [&str; 6] =
    ["modules", "coverage", "namespace", "groups", "env", "gherkin"];

/// Built-in settings every suite starts from.
pub fn default_suite_settings() -> Value {
    json!({
        "class_name": "NoGuy",
        "modules": {
            "enabled": [],
            "config": {},
            "depends": []
        },
        "namespace": null,
        "path": "",
        "groups": [],
        "shuffle": false,
        "error_level": "E_ALL & ~E_STRICT & ~E_DEPRECATED"
    })
}

/// Suite name for a file name in the tests directory, if it is a suite file.
pub fn suite_name(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(SUITE_DIST_SUFFIX)
        .or_else(|| file_name.strip_suffix(SUITE_SUFFIX))
        .filter(|name| !name.is_empty())
}

/// Find suites defined directly in `tests_dir`, sorted and deduplicated.
pub fn discover_suites(tests_dir: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(tests_dir).map_err(|e| Error::io(tests_dir, e))?;

    let mut suites: Vec<String> = entries
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter_map(|entry| {
            let file_name = entry.file_name();
            suite_name(file_name.to_str()?).map(str::to_string)
        })
        .collect();
    suites.sort();
    suites.dedup();

    debug!(dir = %tests_dir.display(), suites = ?suites, "Discovered suites");
    Ok(suites)
}

/// Merge the suite's dist file and then its local file onto `settings`.
pub fn load_suite_config(
    tests_dir: &Path,
    suite: &str,
    settings: Value,
    params: Option<&Params>,
) -> Result<Value> {
    let dist = load_file(
        &tests_dir.join(format!("{}{}", suite, SUITE_DIST_SUFFIX)),
        empty_map(),
        params,
    )?;
    let local = load_file(
        &tests_dir.join(format!("{}{}", suite, SUITE_SUFFIX)),
        empty_map(),
        params,
    )?;
    Ok(merge_configs(merge_configs(settings, dist), local))
}

/// Environment name for a file name, stripping `.dist.yml` or `.yml`.
pub fn env_name(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(ENV_DIST_SUFFIX)
        .or_else(|| file_name.strip_suffix(ENV_SUFFIX))
        .filter(|name| !name.is_empty())
}

/// Load every environment fragment below `envs_dir`.
///
/// Returns `{env: {<name>: <fragment>}}`, ready to be merged onto suite
/// settings. Files are searched at most one directory deep; within a
/// directory `<name>.dist.yml` is applied before `<name>.yml`.
pub fn load_env_configs(envs_dir: &Path, params: Option<&Params>) -> Result<Value> {
    let mut environments = Map::new();

    if !envs_dir.is_dir() {
        warn!(dir = %envs_dir.display(), "Environments directory does not exist");
        return Ok(json!({ "env": environments }));
    }

    for entry in WalkDir::new(envs_dir)
        .min_depth(1)
        .max_depth(2)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        if !file_name.ends_with(ENV_SUFFIX) {
            continue;
        }
        let Some(env) = env_name(&file_name) else {
            continue;
        };
        let Some(dir) = entry.path().parent() else {
            continue;
        };

        let mut fragment = empty_map();
        for suffix in [ENV_DIST_SUFFIX, ENV_SUFFIX] {
            let path = dir.join(format!("{}{}", env, suffix));
            if let Some(conf) = load_optional(&path, params)? {
                fragment = merge_configs(fragment, conf);
            }
        }
        environments.insert(env.to_string(), fragment);
    }

    debug!(
        dir = %envs_dir.display(),
        environments = ?environments.keys().collect::<Vec<_>>(),
        "Loaded environment configs"
    );
    Ok(json!({ "env": environments }))
}

/// Expand staged `env` fragments into one settings tree per environment.
///
/// Each tree is the suite settings merged with the fragment and tagged with
/// `current_environment`. Without an `env` mapping the result is empty.
pub fn suite_environments(settings: &Value) -> Map<String, Value> {
    let Some(Value::Object(envs)) = settings.get("env") else {
        return Map::new();
    };

    let mut environments = Map::new();
    for (name, fragment) in envs {
        let mut env_settings = match fragment {
            Value::Object(map) if !map.is_empty() => {
                merge_configs(settings.clone(), fragment.clone())
            }
            _ => {
                if !is_blank(fragment) {
                    warn!(env = %name, "Ignoring environment config that is not a mapping");
                }
                settings.clone()
            }
        };
        if let Value::Object(map) = &mut env_settings {
            map.insert("current_environment".to_string(), Value::String(name.clone()));
        }
        environments.insert(name.clone(), env_settings);
    }
    environments
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
    }
}

/// Names of enabled modules, minus those listed in `modules.disabled`.
///
/// Enabled entries are either plain names or single-key mappings carrying
/// inline module config, e.g. `- WebDriver: {url: ...}`.
pub fn enabled_modules(
    settings: &Value,
) -> std::result::Result<Vec<String>, ConfigurationError> {
    let enabled = settings
        .list_at("modules.enabled")?
        .map(Vec::as_slice)
        .unwrap_or_default();
    let disabled = settings
        .list_at("modules.disabled")?
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut modules = Vec::with_capacity(enabled.len());
    for entry in enabled {
        let name = match entry {
            Value::String(name) => name.clone(),
            Value::Object(map) => match map.keys().next() {
                Some(key) => key.clone(),
                None => continue,
            },
            _ => {
                return Err(ConfigurationError::invalid_shape(
                    "modules.enabled",
                    "a list of module names",
                ));
            }
        };
        if disabled.iter().any(|d| d.as_str() == Some(name.as_str())) {
            continue;
        }
        modules.push(name);
    }
    Ok(modules)
}
