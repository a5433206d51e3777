//! Configuration model for build probes.
//!
//! Values come from [`ProbeConfig::default`], an optional JSON file, and
//! finally the `BUILDPROBE_*` environment variables, in that order.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{ProbeError, Result};

/// Root configuration for a probe run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Docker CLI binary, resolved through `PATH` when not absolute.
    pub docker_binary: PathBuf,
    /// Fixture tree the image is built from.
    pub fixture_dir: PathBuf,
    /// Build argument selecting the release.
    pub release_arg: String,
    /// Release the Dockerfile falls back to when the argument is absent.
    pub default_release: String,
    /// Release used to provoke a mismatch.
    pub mismatched_release: String,
    /// Message written into the trigger file for the install failure scenario.
    pub install_failure_message: String,
    /// Directory receiving captured logs of failed verifications.
    pub log_dir: Option<PathBuf>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            docker_binary: PathBuf::from(constants::DEFAULT_DOCKER_BINARY),
            fixture_dir: constants::default_fixture_dir(),
            release_arg: constants::RELEASE_BUILD_ARG.to_string(),
            default_release: constants::DEFAULT_RELEASE.to_string(),
            mismatched_release: constants::MISMATCHED_RELEASE.to_string(),
            install_failure_message: "Failure message".to_string(),
            log_dir: None,
        }
    }
}

impl ProbeConfig {
    /// Loads a configuration file, filling missing fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading probe configuration");
        let content = std::fs::read_to_string(path).map_err(|e| ProbeError::io(path, e))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `BUILDPROBE_*` environment overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(docker) = non_empty(constants::ENV_DOCKER) {
            self.docker_binary = PathBuf::from(docker);
        }
        if let Some(fixture) = non_empty(constants::ENV_FIXTURE) {
            self.fixture_dir = PathBuf::from(fixture);
        }
        if let Some(log_dir) = non_empty(constants::ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(log_dir));
        }
        self
    }

    /// Checks the invariants the scenarios rely on.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is empty or the mismatched
    /// release equals the default release.
    pub fn validate(&self) -> Result<()> {
        if self.release_arg.trim().is_empty() {
            return Err(ProbeError::Config {
                message: "release_arg must not be empty".into(),
            });
        }
        if self.install_failure_message.trim().is_empty() {
            return Err(ProbeError::Config {
                message: "install_failure_message must not be empty".into(),
            });
        }
        if self
            .mismatched_release
            .eq_ignore_ascii_case(&self.default_release)
        {
            return Err(ProbeError::Config {
                message: format!(
                    "mismatched_release {:?} must differ from default_release",
                    self.mismatched_release
                ),
            });
        }
        Ok(())
    }
}
