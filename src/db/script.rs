//! Splitting SQL dump scripts into executable statements.
//!
//! Scripts may switch the statement terminator with a `DELIMITER <token>`
//! line, as MySQL dumps of stored routines do.

use regex_lite::Regex;
use std::sync::LazyLock;

/// Default statement terminator.
pub const DEFAULT_DELIMITER: &str = ";";

static DELIMITER_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)DELIMITER ([;$|\\]+)").ok());

/// Incremental statement splitter fed one line at a time.
#[derive(Debug, Clone)]
pub struct ScriptSplitter {
    delimiter: String,
    buffer: String,
}

impl Default for ScriptSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptSplitter {
    pub fn new() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            buffer: String::new(),
        }
    }

    /// The active statement terminator.
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Feed one line; returns a statement once its terminator is seen.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        if let Some(delimiter) = parse_delimiter(line) {
            self.delimiter = delimiter.to_string();
            return None;
        }

        if is_skippable(line) {
            return None;
        }

        self.buffer.push('\n');
        self.buffer.push_str(line.trim_end());

        let statement = self.buffer.strip_suffix(self.delimiter.as_str())?;
        let statement = statement.trim_start_matches('\n').to_string();
        self.buffer.clear();
        Some(statement)
    }

    /// Text collected after the last terminator, if any.
    pub fn remainder(&self) -> Option<&str> {
        let rest = self.buffer.trim();
        (!rest.is_empty()).then_some(rest)
    }
}

/// Split a whole script into statements.
///
/// A trailing statement without a terminator is not returned.
pub fn split_statements<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut splitter = ScriptSplitter::new();
    lines
        .into_iter()
        .filter_map(|line| splitter.push_line(line))
        .collect()
}

fn parse_delimiter(line: &str) -> Option<&str> {
    let re = DELIMITER_RE.as_ref()?;
    re.captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Blank lines, bare terminators and comment lines.
fn is_skippable(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line == ";" || line.starts_with("--") || line.starts_with('#')
}
