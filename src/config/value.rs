//! Typed accessors over the untyped configuration tree.
//!
//! The tree stays a plain [`Value`] until a consumer asks for a key; the
//! accessors here fail with [`ErrorCode::InvalidShape`](crate::error::ErrorCode)
//! when the value at a path has the wrong type.

use crate::error::ConfigurationError;
use serde_json::{Map, Value};

/// Dotted-path access into a configuration tree.
pub trait ConfigTree {
    /// Look up a dotted path such as `paths.tests`.
    fn at(&self, path: &str) -> Option<&Value>;

    /// String at `path`; absent and null are `None`, other types are an error.
    fn str_at(&self, path: &str) -> Result<Option<&str>, ConfigurationError>;

    /// Mapping at `path`; absent and null are `None`, other types are an error.
    fn map_at(&self, path: &str) -> Result<Option<&Map<String, Value>>, ConfigurationError>;

    /// List at `path`; absent and null are `None`, other types are an error.
    fn list_at(&self, path: &str) -> Result<Option<&Vec<Value>>, ConfigurationError>;

    /// Whether `path` resolves to a value other than null.
    fn is_set(&self, path: &str) -> bool {
        self.at(path).is_some_and(|v| !v.is_null())
    }
}

impl ConfigTree for Value {
    fn at(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(self, |node, segment| node.as_object()?.get(segment))
    }

    fn str_at(&self, path: &str) -> Result<Option<&str>, ConfigurationError> {
        match self.at(path) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(ConfigurationError::invalid_shape(path, "a string")),
        }
    }

    fn map_at(&self, path: &str) -> Result<Option<&Map<String, Value>>, ConfigurationError> {
        match self.at(path) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(_) => Err(ConfigurationError::invalid_shape(path, "a mapping")),
        }
    }

    fn list_at(&self, path: &str) -> Result<Option<&Vec<Value>>, ConfigurationError> {
        match self.at(path) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items)),
            Some(_) => Err(ConfigurationError::invalid_shape(path, "a list")),
        }
    }
}

/// Render a scalar the way it would appear in YAML source.
///
/// Returns `None` for lists and mappings.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Create an empty mapping value.
pub fn empty_map() -> Value {
    Value::Object(Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_dotted_lookup() {
        let tree = json!({"paths": {"tests": "tests", "log": "tests/_output"}});
        assert_eq!(tree.at("paths.tests"), Some(&json!("tests")));
        assert_eq!(tree.at("paths.missing"), None);
        assert_eq!(tree.at("paths.tests.deeper"), None);
    }

    #[test]
    fn test_str_at_shape_mismatch() {
        let tree = json!({"paths": {"tests": ["a"]}});
        let err = tree.str_at("paths.tests").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidShape);
    }

    #[test]
    fn test_null_counts_as_unset() {
        let tree = json!({"namespace": null, "paths": {}});
        assert!(!tree.is_set("namespace"));
        assert!(tree.is_set("paths"));
        assert_eq!(tree.str_at("namespace").unwrap(), None);
    }

    #[test]
    fn test_scalar_rendering() {
        assert_eq!(scalar_to_string(&json!(3306)), Some("3306".to_string()));
        assert_eq!(scalar_to_string(&json!(true)), Some("true".to_string()));
        assert_eq!(scalar_to_string(&json!(null)), Some(String::new()));
        assert_eq!(scalar_to_string(&json!({"a": 1})), None);
    }
}
