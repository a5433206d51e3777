//! Expected build-failure diagnostics.

use std::fmt;

use buildprobe_common::error::{ProbeError, Result};
use buildprobe_common::types::{BuildLog, BuildLogEntry};
use regex::Regex;

/// How a diagnostic is recognised in a log entry's stream text.
#[derive(Debug, Clone)]
pub enum MessagePattern {
    /// The stream text contains this substring.
    Literal(String),
    /// The regular expression matches somewhere in the stream text.
    Regex(Regex),
}

/// The diagnostic a failing build is expected to log.
#[derive(Debug, Clone)]
pub struct ExpectedFailure {
    pattern: MessagePattern,
}

impl ExpectedFailure {
    /// Expects a log entry containing `text`.
    #[must_use]
    pub fn contains(text: impl Into<String>) -> Self {
        Self {
            pattern: MessagePattern::Literal(text.into()),
        }
    }

    /// Expects a log entry matching the regular expression `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::InvalidPattern`] if `pattern` does not compile.
    pub fn regex(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| ProbeError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            pattern: MessagePattern::Regex(regex),
        })
    }

    /// Returns the underlying pattern.
    #[must_use]
    pub const fn pattern(&self) -> &MessagePattern {
        &self.pattern
    }

    /// Returns whether `text` carries the expected diagnostic.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        match &self.pattern {
            MessagePattern::Literal(needle) => text.contains(needle.as_str()),
            MessagePattern::Regex(regex) => regex.is_match(text),
        }
    }

    /// Finds the first entry whose stream text carries the diagnostic.
    ///
    /// Entries without a stream are never matched.
    #[must_use]
    pub fn find_in<'a>(&self, log: &'a BuildLog) -> Option<(usize, &'a BuildLogEntry)> {
        log.iter()
            .enumerate()
            .find(|(_, entry)| entry.stream.as_deref().is_some_and(|s| self.matches(s)))
    }
}

impl fmt::Display for ExpectedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pattern {
            MessagePattern::Literal(text) => write!(f, "'{text}'"),
            MessagePattern::Regex(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}
