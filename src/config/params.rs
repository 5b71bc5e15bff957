//! Parameter sources feeding placeholder substitution.
//!
//! The `params` list of the global configuration names where values come
//! from. Sources are applied in order and later values overwrite earlier
//! ones:
//! - an inline mapping
//! - `env` / `environment`: the process environment
//! - a `*.yml` file, optionally wrapped in a top-level `parameters` key
//! - a `*.ini`, `*.env` or `*.env.<suffix>` file of `key=value` lines

use super::files::load_file;
use super::value::{empty_map, scalar_to_string};
use crate::error::{ConfigurationError, Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Flat string-to-string parameter mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Shallow merge: every key of `other` overwrites ours.
    pub fn merge(&mut self, other: Params) {
        self.0.extend(other.0);
    }

    /// Flatten a mapping into dotted keys (`db: {host: x}` becomes `db.host`).
    pub fn from_mapping(map: &Map<String, Value>) -> Self {
        let mut params = Self::new();
        flatten_into(&mut params, None, map);
        params
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn flatten_into(params: &mut Params, prefix: Option<&str>, map: &Map<String, Value>) {
    for (key, value) in map {
        let full_key = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) => flatten_into(params, Some(&full_key), nested),
            Value::Array(_) => warn!(key = %full_key, "Ignoring list value in params"),
            scalar => {
                if let Some(text) = scalar_to_string(scalar) {
                    params.insert(full_key, text);
                }
            }
        }
    }
}

/// One entry of the `params` configuration list.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamSource {
    /// Values given directly in the configuration.
    Inline(Map<String, Value>),
    /// The process environment.
    Environment,
    /// A file relative to the project root.
    File(String),
}

impl ParamSource {
    /// Interpret a single `params` list entry.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(ParamSource::Inline(map.clone())),
            Value::String(s) if s == "env" || s == "environment" => Ok(ParamSource::Environment),
            Value::String(s) => Ok(ParamSource::File(s.clone())),
            other => Err(ConfigurationError::unsupported_params(&other.to_string()).into()),
        }
    }

    /// Interpret the whole `params` value, which may be absent.
    pub fn list_from_config(value: Option<&Value>) -> Result<Vec<Self>> {
        match value {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items.iter().map(Self::from_value).collect(),
            Some(_) => Err(ConfigurationError::invalid_shape("params", "a list").into()),
        }
    }
}

/// Load every source in order into one flat mapping.
pub fn prepare_params(sources: &[ParamSource], root_dir: &Path) -> Result<Params> {
    let mut params = Params::new();

    for source in sources {
        let loaded = match source {
            ParamSource::Inline(map) => Params::from_mapping(map),
            ParamSource::Environment => environment_snapshot(),
            ParamSource::File(relative) => load_params_file(relative, root_dir)?,
        };
        debug!(source = %source_label(source), count = loaded.len(), "Loaded params");
        params.merge(loaded);
    }

    Ok(params)
}

/// Non-unicode variables are skipped.
fn environment_snapshot() -> Params {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

fn source_label(source: &ParamSource) -> &str {
    match source {
        ParamSource::Inline(_) => "inline",
        ParamSource::Environment => "environment",
        ParamSource::File(path) => path,
    }
}

fn load_params_file(relative: &str, root_dir: &Path) -> Result<Params> {
    let path = root_dir.join(relative);
    if !path.is_file() {
        return Err(ConfigurationError::params_not_found(&path).into());
    }

    if relative.ends_with(".yml") {
        return match load_file(&path, empty_map(), None)? {
            Value::Object(mut map) => Ok(match map.remove("parameters") {
                Some(Value::Object(inner)) => Params::from_mapping(&inner),
                Some(_) | None => Params::from_mapping(&map),
            }),
            _ => Err(ConfigurationError::invalid_shape(relative, "a mapping").into()),
        };
    }

    if is_ini_like(relative) {
        let content = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        return Ok(parse_ini(&content));
    }

    Err(ConfigurationError::unsupported_params(relative).into())
}

/// `*.ini`, `*.env` and `*.env.<anything>`.
fn is_ini_like(name: &str) -> bool {
    name.ends_with(".ini") || name.ends_with(".env") || name.contains(".env.")
}

/// Parse `key=value` lines with INI conventions.
///
/// Section headers are ignored and all keys land in one flat mapping.
/// Unquoted boolean-like words are normalised: `true`/`on`/`yes` become `1`,
/// `false`/`off`/`no`/`none`/`null` become the empty string.
pub fn parse_ini(content: &str) -> Params {
    let mut params = Params::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            continue;
        }
        let Some((key, raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        params.insert(key, ini_value(raw.trim()));
    }

    params
}

fn ini_value(raw: &str) -> String {
    for quote in ['"', '\''] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return raw[1..raw.len() - 1].to_string();
        }
    }

    // Inline comment after an unquoted value
    let value = match raw.find(';') {
        Some(pos) => raw[..pos].trim_end(),
        None => raw,
    };

    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" => "1".to_string(),
        "false" | "off" | "no" | "none" | "null" => String::new(),
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_inline_sources_last_writer_wins() {
        let sources = vec![
            ParamSource::from_value(&json!({"foo": "one", "bar": "b"})).unwrap(),
            ParamSource::from_value(&json!({"foo": "two"})).unwrap(),
        ];
        let params = prepare_params(&sources, Path::new(".")).unwrap();
        assert_eq!(params.get("foo"), Some("two"));
        assert_eq!(params.get("bar"), Some("b"));
    }

    #[test]
    fn test_environment_tokens() {
        assert_eq!(
            ParamSource::from_value(&json!("env")).unwrap(),
            ParamSource::Environment
        );
        assert_eq!(
            ParamSource::from_value(&json!("environment")).unwrap(),
            ParamSource::Environment
        );
        let params = prepare_params(&[ParamSource::Environment], Path::new(".")).unwrap();
        if let Ok(path) = std::env::var("PATH") {
            assert_eq!(params.get("PATH"), Some(path.as_str()));
        }
    }

    #[test]
    fn test_yaml_file_with_parameters_wrapper() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("params.yml"),
            "parameters:\n  db_user: root\n  db:\n    port: 3306\n",
        )
        .unwrap();

        let sources = vec![ParamSource::File("params.yml".to_string())];
        let params = prepare_params(&sources, temp.path()).unwrap();
        assert_eq!(params.get("db_user"), Some("root"));
        assert_eq!(params.get("db.port"), Some("3306"));
        assert_eq!(params.get("parameters.db_user"), None);
    }

    #[test]
    fn test_yaml_file_without_wrapper() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("plain.yml"), "host: example.test\n").unwrap();

        let sources = vec![ParamSource::File("plain.yml".to_string())];
        let params = prepare_params(&sources, temp.path()).unwrap();
        assert_eq!(params.get("host"), Some("example.test"));
    }

    #[test]
    fn test_env_file_and_ini_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(".env.testing"),
            "# local overrides\nAPP_URL=http://localhost:8000\nDEBUG=true\n",
        )
        .unwrap();
        std::fs::write(
            temp.path().join("db.ini"),
            "[database]\nuser = \"admin\"\npass = secret ; inline comment\n",
        )
        .unwrap();

        let sources = vec![
            ParamSource::File(".env.testing".to_string()),
            ParamSource::File("db.ini".to_string()),
        ];
        let params = prepare_params(&sources, temp.path()).unwrap();
        assert_eq!(params.get("APP_URL"), Some("http://localhost:8000"));
        assert_eq!(params.get("DEBUG"), Some("1"));
        assert_eq!(params.get("user"), Some("admin"));
        assert_eq!(params.get("pass"), Some("secret"));
    }

    #[test]
    fn test_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let sources = vec![ParamSource::File("nope.yml".to_string())];
        let err = prepare_params(&sources, temp.path()).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ParamsNotFound));
    }

    #[test]
    fn test_unsupported_file_type_fails() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("params.txt"), "a=b").unwrap();
        let sources = vec![ParamSource::File("params.txt".to_string())];
        let err = prepare_params(&sources, temp.path()).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::UnsupportedParams));
        assert!(err.to_string().contains("params.txt"));
    }

    #[test]
    fn test_non_string_entry_rejected() {
        let err = ParamSource::list_from_config(Some(&json!([42]))).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::UnsupportedParams));
    }

    #[test]
    fn test_ini_value_normalisation() {
        let params = parse_ini("a=yes\nb=Off\nc='quoted ; kept'\nd=\n");
        assert_eq!(params.get("a"), Some("1"));
        assert_eq!(params.get("b"), Some(""));
        assert_eq!(params.get("c"), Some("quoted ; kept"));
        assert_eq!(params.get("d"), Some(""));
    }
}
