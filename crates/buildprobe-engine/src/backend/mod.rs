//! Build engine abstraction.

pub mod docker;
pub mod fixture;

use std::fmt;
use std::str::FromStr;

use buildprobe_common::config::ProbeConfig;
use buildprobe_common::error::{ProbeError, Result};
use buildprobe_common::types::{BuildRequest, ImageId};
use serde::{Deserialize, Serialize};

/// Options applied to every build submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Remove intermediate containers even when the build fails.
    pub force_rm: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { force_rm: true }
    }
}

/// An external service that builds images from a source tree.
///
/// A build that cannot produce an image must return
/// [`ProbeError::BuildFailed`] with the captured log. Any other error is an
/// infrastructure fault.
pub trait BuildEngine: Send + Sync {
    /// Short engine name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Builds an image from the request and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::BuildFailed`] if the build fails, or another
    /// variant if the engine itself is at fault.
    fn build(&self, request: &BuildRequest, options: BuildOptions) -> Result<ImageId>;

    /// Removes an image. Removing an image that no longer exists succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot remove the image.
    fn remove_image(&self, image: &ImageId) -> Result<()>;

    /// Releases resources held by the engine. Further builds fail.
    ///
    /// # Errors
    ///
    /// Returns an error if resources cannot be released.
    fn close(&mut self) -> Result<()>;

    /// Returns whether the engine can currently accept builds.
    fn is_available(&self) -> bool;
}

/// Selects a build engine implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// The Docker CLI talking to a Docker daemon.
    Docker,
    /// In-process emulation of the fixture Dockerfile.
    Fixture,
}

impl EngineKind {
    /// Creates the engine described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be initialised.
    pub fn connect(self, config: &ProbeConfig) -> Result<Box<dyn BuildEngine>> {
        tracing::debug!(engine = %self, "connecting build engine");
        match self {
            Self::Docker => Ok(Box::new(docker::DockerEngine::locate(&config.docker_binary)?)),
            Self::Fixture => Ok(Box::new(fixture::FixtureEngine::from_config(config))),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Docker => write!(f, "docker"),
            Self::Fixture => write!(f, "fixture"),
        }
    }
}

impl FromStr for EngineKind {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docker" => Ok(Self::Docker),
            "fixture" => Ok(Self::Fixture),
            other => Err(ProbeError::Config {
                message: format!("unknown build engine: {other}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_force_rm_by_default() {
        assert!(BuildOptions::default().force_rm);
    }

    #[test]
    fn engine_kind_parses_case_insensitively() {
        assert_eq!("Docker".parse::<EngineKind>().expect("parse"), EngineKind::Docker);
        assert_eq!(" fixture ".parse::<EngineKind>().expect("parse"), EngineKind::Fixture);
        assert!("podman".parse::<EngineKind>().is_err());
    }

    #[test]
    fn engine_kind_display_round_trips() {
        for kind in [EngineKind::Docker, EngineKind::Fixture] {
            assert_eq!(kind.to_string().parse::<EngineKind>().expect("parse"), kind);
        }
    }

    #[test]
    fn fixture_engine_connects_without_daemon() {
        let engine = EngineKind::Fixture
            .connect(&ProbeConfig::default())
            .expect("connect");
        assert_eq!(engine.name(), "fixture");
        assert!(engine.is_available());
    }
}
