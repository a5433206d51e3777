//! Unified error types for the buildprobe workspace.
//!
//! A build that fails is reported through [`ProbeError::BuildFailed`], which
//! carries the captured log. Every other variant is an infrastructure fault
//! and must never be interpreted as the failure under test.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::BuildLog;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The build engine reported that the image could not be built.
    #[error("build failed: {message}")]
    BuildFailed {
        /// Short reason reported by the engine.
        message: String,
        /// Ordered log captured during the build attempt.
        log: BuildLog,
    },

    /// The build engine cannot be reached or started.
    #[error("{engine} engine unavailable: {message}")]
    EngineUnavailable {
        /// Name of the engine that failed.
        engine: &'static str,
        /// Description of the fault.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// An expected-failure pattern is not a valid regular expression.
    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern {
        /// Pattern as supplied.
        pattern: String,
        /// Compiler diagnostic.
        message: String,
    },

    /// A verification did not observe the expected failure.
    #[error("verification failed: {message}")]
    Verification {
        /// Expected pattern and captured log.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl ProbeError {
    /// Wraps an I/O error with the path it occurred at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns whether this error is the engine's build-failure signal.
    #[must_use]
    pub const fn is_build_failure(&self) -> bool {
        matches!(self, Self::BuildFailed { .. })
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, ProbeError>;
