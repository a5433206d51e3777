//! Domain primitive types used across the buildprobe workspace.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Handle of an image produced by a build engine.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ImageId(String);

impl ImageId {
    /// Creates a new image ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single build submission: a source tree plus named build arguments.
///
/// Builder methods consume and return the request, so a request handed to
/// an engine is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    source_path: PathBuf,
    build_args: BTreeMap<String, String>,
}

impl BuildRequest {
    /// Creates a request for the given source directory with no build arguments.
    #[must_use]
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            build_args: BTreeMap::new(),
        }
    }

    /// Adds a build argument, replacing any previous value for the same name.
    #[must_use]
    pub fn build_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.build_args.insert(name.into(), value.into());
        self
    }

    /// Adds every `(name, value)` pair as a build argument.
    #[must_use]
    pub fn build_args<I, K, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.build_args
            .extend(args.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Returns the source directory.
    #[must_use]
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Returns all build arguments, ordered by name.
    #[must_use]
    pub const fn args(&self) -> &BTreeMap<String, String> {
        &self.build_args
    }

    /// Returns the value of one build argument.
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.build_args.get(name).map(String::as_str)
    }
}

/// Structured error detail attached to a failing log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Engine-specific error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    /// Error message.
    #[serde(default)]
    pub message: String,
}

/// One structured record emitted during a build attempt.
///
/// Mirrors the JSON objects of the Docker build stream. Only `stream` is
/// inspected by the verifier; unknown fields are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildLogEntry {
    /// Human-readable build output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
    /// Error summary, present on the terminal entry of a failed build.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Structured error detail.
    #[serde(
        rename = "errorDetail",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub error_detail: Option<ErrorDetail>,
    /// Any other fields the engine emitted.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BuildLogEntry {
    /// Creates an entry carrying only stream text.
    #[must_use]
    pub fn stream(text: impl Into<String>) -> Self {
        Self {
            stream: Some(text.into()),
            ..Self::default()
        }
    }

    /// Creates a terminal error entry.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            error: Some(message.clone()),
            error_detail: Some(ErrorDetail {
                code: Some(1),
                message,
            }),
            ..Self::default()
        }
    }

    /// Parses one line of engine output.
    ///
    /// JSON objects are decoded as structured entries; anything else becomes
    /// a plain stream entry holding the line and its newline.
    #[must_use]
    pub fn parse_line(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.starts_with('{') {
            if let Ok(entry) = serde_json::from_str::<Self>(trimmed) {
                return entry;
            }
        }
        Self::stream(format!("{line}\n"))
    }

    /// Returns the stream text, or the empty string when absent.
    #[must_use]
    pub fn stream_text(&self) -> &str {
        self.stream.as_deref().unwrap_or("")
    }
}

/// Ordered log of a build attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildLog(Vec<BuildLogEntry>);

impl BuildLog {
    /// Creates an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Parses raw engine output, one entry per non-empty line.
    #[must_use]
    pub fn from_output(output: &str) -> Self {
        output
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(BuildLogEntry::parse_line)
            .collect()
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: BuildLogEntry) {
        self.0.push(entry);
    }

    /// Keeps only the entries for which `keep` returns true.
    pub fn retain(&mut self, keep: impl FnMut(&BuildLogEntry) -> bool) {
        self.0.retain(keep);
    }

    /// Returns the entries in emission order.
    #[must_use]
    pub fn entries(&self) -> &[BuildLogEntry] {
        &self.0
    }

    /// Iterates over the entries in emission order.
    pub fn iter(&self) -> std::slice::Iter<'_, BuildLogEntry> {
        self.0.iter()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the log holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the last error reported in the log, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.0.iter().rev().find_map(|e| e.error.as_deref())
    }
}

impl FromIterator<BuildLogEntry> for BuildLog {
    fn from_iter<T: IntoIterator<Item = BuildLogEntry>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a BuildLog {
    type Item = &'a BuildLogEntry;
    type IntoIter = std::slice::Iter<'a, BuildLogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for BuildLog {
    type Item = BuildLogEntry;
    type IntoIter = std::vec::IntoIter<BuildLogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Renders every entry as one JSON object per line.
impl fmt::Display for BuildLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.0 {
            let line = serde_json::to_string(entry).map_err(|_| fmt::Error)?;
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
