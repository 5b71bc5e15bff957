//! Output formatting for resolved configuration trees.

use crate::error::Result;
use clap::ValueEnum;
use serde_json::Value;
use std::path::Path;

/// Output format for printed trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl OutputFormat {
    /// Render a tree in this format.
    pub fn render(&self, value: &Value) -> Result<String> {
        let mut out = match self {
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
        };
        if !out.ends_with('\n') {
            out.push('\n');
        }
        Ok(out)
    }
}

/// Render a list of names, one per line.
pub fn format_names<S: AsRef<str>>(names: &[S]) -> String {
    let mut out = String::new();
    for name in names {
        out.push_str(name.as_ref());
        out.push('\n');
    }
    out
}

/// Render labelled directories, skipping unset ones.
pub fn format_paths(paths: &[(&str, Option<&Path>)]) -> String {
    let width = paths.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (label, path) in paths {
        if let Some(path) = path {
            out.push_str(&format!("{:width$}  {}\n", label, path.display(), width = width));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_value_enum_names() {
        assert_eq!(OutputFormat::from_str("yaml", true), Ok(OutputFormat::Yaml));
        assert_eq!(OutputFormat::from_str("JSON", true), Ok(OutputFormat::Json));
        assert!(OutputFormat::from_str("xml", true).is_err());
    }

    #[test]
    fn test_render_yaml_keeps_key_order() {
        let tree = json!({"paths": {"tests": "tests", "output": "tests/_output"}});
        let out = OutputFormat::Yaml.render(&tree).unwrap();
        let tests = out.find("tests: tests").unwrap();
        let output = out.find("output: tests/_output").unwrap();
        assert!(tests < output);
    }

    #[test]
    fn test_render_json() {
        let out = OutputFormat::Json.render(&json!({"a": 1})).unwrap();
        assert_eq!(out, "{\n  \"a\": 1\n}\n");
    }

    #[test]
    fn test_format_paths_skips_unset() {
        let tests = PathBuf::from("/p/tests");
        let out = format_paths(&[("tests", Some(tests.as_path())), ("envs", None)]);
        assert_eq!(out, "tests  /p/tests\n");
    }

    #[test]
    fn test_format_names() {
        assert_eq!(format_names(&["unit", "api"]), "unit\napi\n");
    }
}
