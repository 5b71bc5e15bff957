//! Placeholder substitution applied to raw YAML text before parsing.

use super::params::Params;
use regex_lite::Regex;

/// Default placeholder delimiter.
pub const DEFAULT_DELIMITER: &str = "%";

/// A text template with `%name%` style placeholders.
#[derive(Debug, Clone)]
pub struct Template<'a> {
    text: &'a str,
    start: String,
    end: String,
}

impl<'a> Template<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            start: DEFAULT_DELIMITER.to_string(),
            end: DEFAULT_DELIMITER.to_string(),
        }
    }

    /// Use custom opening and closing delimiters.
    pub fn with_delimiters(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start = start.into();
        self.end = end.into();
        self
    }

    /// Replace every known placeholder with its value.
    ///
    /// Unknown placeholders are left as literal text. Substitution is a
    /// single pass, so values containing delimiters are not expanded again.
    pub fn produce(&self, params: &Params) -> String {
        if params.is_empty() {
            return self.text.to_string();
        }

        let pattern = format!(
            "{}([A-Za-z0-9_.]+){}",
            regex_lite::escape(&self.start),
            regex_lite::escape(&self.end)
        );
        let Ok(re) = Regex::new(&pattern) else {
            return self.text.to_string();
        };

        re.replace_all(self.text, |caps: &regex_lite::Captures<'_>| {
            match params.get(&caps[1]) {
                Some(value) => value.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
    }
}
