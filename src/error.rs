//! Structured error types for configuration and database failures.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Missing inputs
    ConfigNotFound,
    MissingPath,
    ParamsNotFound,
    IncludeNotFound,

    // Invalid inputs
    InvalidConfig,
    InvalidShape,
    UnknownSuite,
    UnsupportedParams,
    UnsupportedDialect,

    // Environment
    OutputNotWritable,
}

/// Structured configuration error.
///
/// Every failure of the loader is reported with this single kind; the code
/// only exists so callers and tests can tell the cases apart.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl ConfigurationError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    // Convenience constructors

    pub fn config_not_found(path: &Path) -> Self {
        Self::new(
            ErrorCode::ConfigNotFound,
            "Configuration file could not be found.\nRun `bootstrap` to initialize the project.",
        )
        .with_path(path)
    }

    pub fn invalid_config(path: &Path) -> Self {
        Self::new(ErrorCode::InvalidConfig, "Configuration file is invalid").with_path(path)
    }

    pub fn missing_path(key: &str, description: &str) -> Self {
        Self::new(
            ErrorCode::MissingPath,
            format!("{} is not defined by key \"paths: {}\"", description, key),
        )
    }

    pub fn unknown_suite(suite: &str) -> Self {
        Self::new(
            ErrorCode::UnknownSuite,
            format!("Suite {} was not loaded", suite),
        )
    }

    pub fn include_not_found(include: &str) -> Self {
        Self::new(
            ErrorCode::IncludeNotFound,
            format!("Configuration file(s) could not be found in \"{}\".", include),
        )
    }

    pub fn params_not_found(path: &Path) -> Self {
        Self::new(
            ErrorCode::ParamsNotFound,
            format!("Params file {} not found", path.display()),
        )
        .with_path(path)
    }

    pub fn unsupported_params(source: &str) -> Self {
        Self::new(
            ErrorCode::UnsupportedParams,
            format!("Params can't be loaded from `{}`.", source),
        )
    }

    pub fn output_not_writable(path: &Path) -> Self {
        Self::new(
            ErrorCode::OutputNotWritable,
            "Path for output is not writable. Please, set appropriate access mode for output path.",
        )
        .with_path(path)
    }

    pub fn invalid_shape(key: &str, expected: &str) -> Self {
        Self::new(
            ErrorCode::InvalidShape,
            format!("Configuration key \"{}\" must be {}", key, expected),
        )
    }

    pub fn unsupported_dialect(provider: &str) -> Self {
        Self::new(
            ErrorCode::UnsupportedDialect,
            format!(
                "No client available for `{}` connections; attach an executor instead",
                provider
            ),
        )
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ConfigurationError {}

/// Every error the crate can surface.
///
/// Parser failures are passed through untouched so callers see the YAML
/// location information.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Pattern(#[from] globset::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// The configuration error code, if this is a configuration error.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Error::Configuration(err) => Some(err.code),
            _ => None,
        }
    }
}

/// Result type for loader and driver operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_is_exposed_for_configuration_errors() {
        let err: Error = ConfigurationError::unknown_suite("unit").into();
        assert_eq!(err.code(), Some(ErrorCode::UnknownSuite));
        assert_eq!(err.to_string(), "Suite unit was not loaded");
    }

    #[test]
    fn test_io_error_has_no_code() {
        let err = Error::io(
            "missing.yml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code(), None);
        assert!(err.to_string().starts_with("missing.yml"));
    }

    #[test]
    fn test_error_code_serializes_screaming_snake() {
        let err = ConfigurationError::missing_path("log", "Log path");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "MISSING_PATH");
        assert!(json.get("path").is_none());
    }
}
