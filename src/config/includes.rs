//! Expansion of wildcard entries in the `include` list.
//!
//! An entry such as `modules/*` stands for every directory below the
//! matched directories that holds its own `codeception.yml` or
//! `codeception.dist.yml`.

use crate::error::{ConfigurationError, Result};
use globset::Glob;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// File names that mark a directory as an includable project.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["codeception.yml", "codeception.dist.yml"];

/// Characters that turn an include entry into a search pattern.
const WILDCARD_CHARS: [char; 3] = ['?', '.', '*'];

/// Characters with meaning to the glob matcher.
const GLOB_META: [char; 4] = ['?', '*', '[', '{'];

/// Replace wildcard entries with the project directories they match.
///
/// Entries without wildcard characters are returned unchanged.
pub fn expand_includes(root: &Path, includes: &[String]) -> Result<Vec<String>> {
    let mut expanded = Vec::with_capacity(includes.len());
    for include in includes {
        if include.contains(WILDCARD_CHARS) {
            expanded.extend(expand_wildcard(root, include)?);
        } else {
            expanded.push(include.clone());
        }
    }
    Ok(expanded)
}

fn expand_wildcard(root: &Path, include: &str) -> Result<Vec<String>> {
    let search_roots = matching_dirs(root, include)?;
    if search_roots.is_empty() {
        return Err(ConfigurationError::include_not_found(include).into());
    }

    let mut found = BTreeSet::new();
    for (relative_root, absolute_root) in search_roots {
        for entry in WalkDir::new(&absolute_root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if !CONFIG_FILE_NAMES.contains(&name.as_ref()) {
                continue;
            }
            let Some(dir) = entry.path().parent() else {
                continue;
            };
            let Ok(below) = dir.strip_prefix(&absolute_root) else {
                continue;
            };
            let project = if below.as_os_str().is_empty() {
                relative_root.clone()
            } else {
                relative_root.join(below)
            };
            found.insert(to_forward_slashes(&project));
        }
    }

    debug!(include = %include, matches = found.len(), "Expanded wildcard include");
    Ok(found.into_iter().collect())
}

/// Directories matched by an include entry, as (relative, absolute) pairs.
///
/// Leading components without glob metacharacters form a literal base;
/// the rest is matched against directories at the same depth below it.
fn matching_dirs(root: &Path, include: &str) -> Result<Vec<(PathBuf, PathBuf)>> {
    let components: Vec<&str> = include
        .split(['/', '\\'])
        .filter(|c| !c.is_empty())
        .collect();
    let split = components
        .iter()
        .position(|c| c.contains(GLOB_META))
        .unwrap_or(components.len());

    let base_relative: PathBuf = components[..split].iter().collect();
    let base_absolute = root.join(&base_relative);
    if !base_absolute.is_dir() {
        return Ok(Vec::new());
    }

    let pattern = &components[split..];
    if pattern.is_empty() {
        return Ok(vec![(base_relative, base_absolute)]);
    }

    let matcher = Glob::new(&pattern.join("/"))?.compile_matcher();
    let depth = pattern.len();

    let mut dirs = Vec::new();
    for entry in WalkDir::new(&base_absolute)
        .min_depth(depth)
        .max_depth(depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_dir() {
            continue;
        }
        let Ok(below) = entry.path().strip_prefix(&base_absolute) else {
            continue;
        };
        if matcher.is_match(below) {
            dirs.push((base_relative.join(below), entry.path().to_path_buf()));
        }
    }
    Ok(dirs)
}

fn to_forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tempfile::TempDir;

    fn project(temp: &TempDir, dirs: &[&str]) {
        for dir in dirs {
            let path = temp.path().join(dir);
            std::fs::create_dir_all(&path).unwrap();
            std::fs::write(path.join("codeception.yml"), "paths: {}\n").unwrap();
        }
    }

    #[test]
    fn test_star_expands_to_project_dirs() {
        let temp = TempDir::new().unwrap();
        project(&temp, &["tests/moduleA"]);

        let result = expand_includes(temp.path(), &["tests/*".to_string()]).unwrap();
        assert_eq!(result, vec!["tests/moduleA".to_string()]);
    }

    #[test]
    fn test_literal_entry_passes_through() {
        let temp = TempDir::new().unwrap();
        let result =
            expand_includes(temp.path(), &["frontend".to_string(), "tests/*".to_string()]);
        // Literal entries are never checked, the wildcard one fails
        assert!(result.is_err());

        let result = expand_includes(temp.path(), &["frontend".to_string()]).unwrap();
        assert_eq!(result, vec!["frontend".to_string()]);
    }

    #[test]
    fn test_nested_and_dist_files_are_deduplicated() {
        let temp = TempDir::new().unwrap();
        project(&temp, &["apps/api", "apps/web/admin"]);
        std::fs::write(
            temp.path().join("apps/api/codeception.dist.yml"),
            "paths: {}\n",
        )
        .unwrap();

        let result = expand_includes(temp.path(), &["apps/*".to_string()]).unwrap();
        assert_eq!(
            result,
            vec!["apps/api".to_string(), "apps/web/admin".to_string()]
        );
    }

    #[test]
    fn test_unmatched_glob_fails() {
        let temp = TempDir::new().unwrap();
        let err = expand_includes(temp.path(), &["missing/*".to_string()]).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::IncludeNotFound));
    }

    #[test]
    fn test_dot_entry_searches_literal_directory() {
        let temp = TempDir::new().unwrap();
        project(&temp, &["packages/core"]);
        std::fs::create_dir_all(temp.path().join("packages/v1.2")).unwrap();

        let result = expand_includes(temp.path(), &["packages".to_string()]).unwrap();
        assert_eq!(result, vec!["packages".to_string()]);

        let result = expand_includes(temp.path(), &["packages/v1.2".to_string()]).unwrap();
        assert!(result.is_empty());
    }
}
