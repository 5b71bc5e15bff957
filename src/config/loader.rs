//! Global configuration context.
//!
//! Loads `codeception.dist.yml` and `codeception.yml` from the project root,
//! validates the required paths and resolves everything the rest of a run
//! needs. The context is built once and handed to consumers by reference.

use super::files::load_file;
use super::includes::expand_includes;
use super::merge::{merge_all, merge_configs};
use super::params::{ParamSource, Params, prepare_params};
use super::suites::{
    GLOBAL_SUITE_KEYS, default_suite_settings, discover_suites, enabled_modules, load_env_configs,
    load_suite_config, suite_environments,
};
use super::value::{ConfigTree, empty_map};
use crate::error::{ConfigurationError, Error, Result};
use serde_json::{Map, Value, json};
use std::cell::OnceCell;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration file name.
pub const CONFIG_FILE: &str = "codeception.yml";

/// Distributed configuration file name, overridden by [`CONFIG_FILE`].
pub const CONFIG_DIST_FILE: &str = "codeception.dist.yml";

/// Built-in global configuration.
pub fn default_config() -> Value {
    json!({
        "namespace": "",
        "include": [],
        "paths": {},
        "modules": {},
        "extensions": {
            "enabled": [],
            "config": {},
            "commands": []
        },
        "groups": {},
        "settings": {
            "colors": false,
            "bootstrap": false,
            "strict_xml": false,
            "lint": true
        },
        "coverage": {},
        "params": [],
        "gherkin": {}
    })
}

/// Resolved global configuration for one run.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Directory containing the configuration file
    dir: PathBuf,
    /// Merged global tree
    config: Value,
    /// Values for `%placeholder%` substitution
    params: Params,
    /// Suites found in the tests directory
    suites: Vec<String>,
    log_dir: String,
    tests_dir: Option<String>,
    data_dir: Option<String>,
    support_dir: Option<String>,
    envs_dir: Option<String>,
    /// Environment fragments, loaded on first use
    env_config: OnceCell<Value>,
}

impl Configuration {
    /// Load the configuration.
    ///
    /// `path` may be a configuration file or a directory containing one;
    /// without it `codeception.yml` in the current directory is used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_file = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let cwd = std::env::current_dir().map_err(|e| Error::io(".", e))?;
                cwd.join(CONFIG_FILE)
            }
        };
        let config_file = if config_file.is_dir() {
            config_file.join(CONFIG_FILE)
        } else {
            config_file
        };

        let parent = match config_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let dir = parent
            .canonicalize()
            .map_err(|_| ConfigurationError::config_not_found(&config_file))?;
        let file_name = config_file
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| CONFIG_FILE.into());
        let main_file = dir.join(file_name);
        let dist_file = dir.join(CONFIG_DIST_FILE);

        if !(dist_file.is_file() || main_file.is_file()) {
            return Err(ConfigurationError::config_not_found(&main_file).into());
        }

        let defaults = default_config();
        let config = merge_all([
            defaults.clone(),
            load_file(&dist_file, empty_map(), None)?,
            load_file(&main_file, empty_map(), None)?,
        ]);
        if config == defaults {
            return Err(ConfigurationError::invalid_config(&main_file).into());
        }

        Self::from_tree(dir, config)
    }

    /// Build a context from an already merged tree rooted at `dir`.
    pub fn from_tree(dir: PathBuf, mut config: Value) -> Result<Self> {
        let log_dir = config
            .str_at("paths.log")?
            .ok_or_else(|| ConfigurationError::missing_path("log", "Log path"))?
            .to_string();

        let includes = include_list(&config)?;
        let includes = expand_includes(&dir, &includes)?;
        let has_includes = !includes.is_empty();
        set_key(&mut config, &["include"], json!(includes))?;

        let mut context = Self {
            dir,
            config,
            params: Params::new(),
            suites: Vec::new(),
            log_dir,
            tests_dir: None,
            data_dir: None,
            support_dir: None,
            envs_dir: None,
            env_config: OnceCell::new(),
        };

        // Aggregator configs only point at other projects
        if has_includes && !context.config.is_set("paths.tests") {
            info!(dir = %context.dir.display(), "Loaded include-only configuration");
            return Ok(context);
        }

        let tests_dir = context
            .config
            .str_at("paths.tests")?
            .ok_or_else(|| ConfigurationError::missing_path("tests", "Tests directory"))?
            .to_string();
        let data_dir = context
            .config
            .str_at("paths.data")?
            .ok_or_else(|| ConfigurationError::missing_path("data", "Data path"))?
            .to_string();

        // Compatibility with the older `helpers` key
        if !context.config.is_set("paths.support")
            && let Some(helpers) = context.config.at("paths.helpers").cloned()
        {
            set_key(&mut context.config, &["paths", "support"], helpers)?;
        }
        let support_dir = context
            .config
            .str_at("paths.support")?
            .ok_or_else(|| ConfigurationError::missing_path("support", "Helpers path"))?
            .to_string();
        let envs_dir = context.config.str_at("paths.envs")?.map(str::to_string);

        let sources = ParamSource::list_from_config(context.config.get("params"))?;
        context.params = prepare_params(&sources, &context.dir)?;
        context.suites = discover_suites(&context.dir.join(&tests_dir))?;

        context.tests_dir = Some(tests_dir);
        context.data_dir = Some(data_dir);
        context.support_dir = Some(support_dir);
        context.envs_dir = envs_dir;

        info!(
            dir = %context.dir.display(),
            suites = context.suites.len(),
            params = context.params.len(),
            "Loaded configuration"
        );
        Ok(context)
    }

    /// The merged global tree.
    pub fn config(&self) -> &Value {
        &self.config
    }

    /// Parameters available for substitution in suite and environment files.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Names of all discovered suites.
    pub fn suites(&self) -> &[String] {
        &self.suites
    }

    /// Merge an extra fragment into the global tree.
    pub fn append(&mut self, fragment: Value) -> &Value {
        let current = std::mem::take(&mut self.config);
        self.config = merge_configs(current, fragment);
        &self.config
    }

    /// Whether this is an include-only configuration without tests of its own.
    pub fn is_empty(&self) -> bool {
        self.tests_dir.is_none()
    }

    /// Project root: the directory holding the configuration file.
    pub fn project_dir(&self) -> &Path {
        &self.dir
    }

    pub fn tests_dir(&self) -> Option<PathBuf> {
        self.tests_dir.as_ref().map(|d| self.dir.join(d))
    }

    /// Directory for fixtures, dumps and other test data.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|d| self.dir.join(d))
    }

    /// Directory for helpers, actors and page objects.
    pub fn support_dir(&self) -> Option<PathBuf> {
        self.support_dir.as_ref().map(|d| self.dir.join(d))
    }

    pub fn envs_dir(&self) -> Option<PathBuf> {
        self.envs_dir.as_ref().map(|d| self.dir.join(d))
    }

    /// Output directory, created on demand.
    ///
    /// Relative log paths are resolved against the project root.
    pub fn output_dir(&self) -> Result<PathBuf> {
        let log = Path::new(&self.log_dir);
        let dir = if log.is_absolute() {
            log.to_path_buf()
        } else {
            self.dir.join(log)
        };

        if !is_writable(&dir) {
            if let Err(e) = std::fs::create_dir_all(&dir) {
                debug!(dir = %dir.display(), error = %e, "Could not create output directory");
            }
            make_world_writable(&dir);
        }

        if !is_writable(&dir) {
            return Err(ConfigurationError::output_not_writable(&dir).into());
        }
        Ok(dir)
    }

    /// Alias of [`Configuration::output_dir`].
    pub fn log_dir(&self) -> Result<PathBuf> {
        self.output_dir()
    }

    /// Fully layered settings for one suite.
    pub fn suite_settings(&self, suite: &str) -> Result<Value> {
        let suite = self.strip_namespace(suite)?;
        if !self.suites.iter().any(|s| s == suite) {
            return Err(ConfigurationError::unknown_suite(suite).into());
        }

        let mut global = self.config.map_at("settings")?.cloned().unwrap_or_default();
        for key in GLOBAL_SUITE_KEYS {
            if let Some(value) = self.config.get(key)
                && !value.is_null()
            {
                global.insert(key.to_string(), value.clone());
            }
        }
        let settings = merge_configs(default_suite_settings(), Value::Object(global));

        let tests_dir = self.tests_dir().unwrap_or_else(|| self.dir.clone());
        let mut settings = load_suite_config(&tests_dir, suite, settings, Some(&self.params))?;

        if let Some(envs_dir) = self.envs_dir() {
            settings = merge_configs(settings, self.env_config(&envs_dir)?.clone());
        }

        let mut suite_path = tests_dir.join(suite).into_os_string();
        suite_path.push(std::path::MAIN_SEPARATOR_STR);
        set_key(
            &mut settings,
            &["path"],
            Value::String(suite_path.to_string_lossy().into_owned()),
        )
        .map_err(|_| ConfigurationError::invalid_shape(suite, "a mapping of suite settings"))?;

        debug!(suite = %suite, "Resolved suite settings");
        Ok(settings)
    }

    /// Settings for every environment staged for a suite.
    pub fn suite_environments(&self, suite: &str) -> Result<Map<String, Value>> {
        let settings = self.suite_settings(suite)?;
        Ok(suite_environments(&settings))
    }

    /// Enabled modules of already resolved suite settings.
    pub fn modules(&self, settings: &Value) -> Result<Vec<String>> {
        Ok(enabled_modules(settings)?)
    }

    pub fn is_extension_enabled(&self, extension: &str) -> bool {
        self.config
            .list_at("extensions.enabled")
            .ok()
            .flatten()
            .is_some_and(|enabled| enabled.iter().any(|e| e.as_str() == Some(extension)))
    }

    /// Strip the project namespace from a suite name, if it is prefixed.
    fn strip_namespace<'a>(&self, suite: &'a str) -> Result<&'a str> {
        let namespace = self.config.str_at("namespace")?.unwrap_or("");
        if !namespace.is_empty()
            && suite != namespace
            && let Some(stripped) = suite.strip_prefix(namespace)
        {
            return Ok(stripped);
        }
        Ok(suite)
    }

    fn env_config(&self, envs_dir: &Path) -> Result<&Value> {
        if let Some(cached) = self.env_config.get() {
            return Ok(cached);
        }
        let loaded = load_env_configs(envs_dir, Some(&self.params))?;
        Ok(self.env_config.get_or_init(|| loaded))
    }
}

fn include_list(config: &Value) -> Result<Vec<String>> {
    let Some(items) = config.list_at("include")? else {
        return Ok(Vec::new());
    };
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| ConfigurationError::invalid_shape("include", "a list of paths").into())
        })
        .collect()
}

/// Set a nested key, creating intermediate mappings.
fn set_key(tree: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        return Ok(());
    };
    let mut node = tree;
    for segment in parents {
        let Value::Object(map) = node else {
            return Err(ConfigurationError::invalid_shape(segment, "a mapping").into());
        };
        node = map.entry(segment.to_string()).or_insert_with(empty_map);
    }
    let Value::Object(map) = node else {
        return Err(ConfigurationError::invalid_shape(last, "a mapping").into());
    };
    map.insert(last.to_string(), value);
    Ok(())
}

/// Creates and drops an anonymous file in `dir`.
fn is_writable(dir: &Path) -> bool {
    dir.is_dir() && tempfile::tempfile_in(dir).is_ok()
}

#[cfg(unix)]
fn make_world_writable(dir: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o777)) {
        debug!(dir = %dir.display(), error = %e, "Could not change output directory mode");
    }
}

#[cfg(not(unix))]
fn make_world_writable(_dir: &Path) {}
