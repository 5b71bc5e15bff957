//! Reading YAML configuration fragments from disk.

use super::params::Params;
use super::template::Template;
use super::value::empty_map;
use crate::error::{Error, Result};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Load a YAML file, or return `fallback` if it does not exist.
///
/// When `params` is given the raw text goes through placeholder
/// substitution before parsing. An empty document loads as an empty
/// mapping.
pub fn load_file(path: &Path, fallback: Value, params: Option<&Params>) -> Result<Value> {
    Ok(load_optional(path, params)?.unwrap_or(fallback))
}

/// Load a YAML file, distinguishing a missing file (`None`) from an empty one.
pub fn load_optional(path: &Path, params: Option<&Params>) -> Result<Option<Value>> {
    if !path.is_file() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let text = match params {
        Some(params) if !params.is_empty() => Template::new(&raw).produce(params),
        _ => raw,
    };

    if is_blank_document(&text) {
        debug!(path = %path.display(), "Loaded empty configuration file");
        return Ok(Some(empty_map()));
    }

    let mut document: serde_yaml::Value = serde_yaml::from_str(&text)?;
    document.apply_merge()?;
    let value = serde_json::to_value(document)?;
    debug!(path = %path.display(), "Loaded configuration file");

    Ok(Some(match value {
        Value::Null => empty_map(),
        other => other,
    }))
}

/// Only blank lines, comments and document markers.
fn is_blank_document(text: &str) -> bool {
    text.lines().map(str::trim).all(|line| {
        line.is_empty() || line.starts_with('#') || line == "---" || line == "..."
    })
}
