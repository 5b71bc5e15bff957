//! Deep merge for layered configuration trees.
//!
//! Implements key-by-key merging where the overlay wins on collision.
//! Lists are replaced entirely, not concatenated.

use serde_json::{Map, Value};

/// Merge `overlay` onto `base`, with `overlay` taking precedence.
///
/// - Mappings are merged recursively: overlay keys come first, followed by
///   keys that only exist in `base`
/// - Lists, strings, numbers, booleans and nulls replace the base value
/// - If either side is not a mapping the overlay is returned as-is
///
/// # Example
/// ```
/// use serde_json::json;
/// use codecept_config::config::merge_configs;
///
/// let base = json!({"a": {"x": 1, "y": 2}, "modules": ["Db"]});
/// let overlay = json!({"a": {"y": 3}, "modules": ["WebDriver"]});
/// let merged = merge_configs(base, overlay);
/// assert_eq!(merged, json!({"a": {"x": 1, "y": 3}, "modules": ["WebDriver"]}));
/// ```
pub fn merge_configs(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            let mut merged = Map::with_capacity(base_map.len() + overlay_map.len());
            for (key, overlay_value) in overlay_map {
                let value = match base_map.remove(&key) {
                    Some(base_value) => merge_configs(base_value, overlay_value),
                    None => overlay_value,
                };
                merged.insert(key, value);
            }
            // Only keys unique to base are left
            merged.extend(base_map);
            Value::Object(merged)
        }
        (_, overlay) => overlay,
    }
}

/// Merge fragments in order, with later fragments taking precedence.
///
/// Starts from an empty mapping, so an empty iterator yields `{}`.
pub fn merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values
        .into_iter()
        .fold(Value::Object(Map::new()), merge_configs)
}
