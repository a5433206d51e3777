//! In-process emulation of the fixture Dockerfile.
//!
//! Replays the installer check of a scaffolded fixture tree without a
//! daemon: the release build argument is compared with `VersionInfo.xml`,
//! then the `FAIL` trigger file is honoured. Successful builds yield a
//! content-addressed image id that stays live until removed.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use buildprobe_common::config::ProbeConfig;
use buildprobe_common::constants::{self, release_mismatch_message};
use buildprobe_common::error::{ProbeError, Result};
use buildprobe_common::types::{BuildLog, BuildLogEntry, BuildRequest, ImageId};
use buildprobe_fixture::FixtureTree;
use buildprobe_fixture::scaffold::{BASE_IMAGE, CHECK_SCRIPT_NAME};
use sha2::{Digest, Sha256};

use super::{BuildEngine, BuildOptions};

const ENGINE: &str = "fixture";

/// Build engine that emulates the fixture installer check.
#[derive(Debug)]
pub struct FixtureEngine {
    release_arg: String,
    default_release: String,
    images: Mutex<BTreeSet<ImageId>>,
    fault: Option<String>,
    closed: bool,
}

impl FixtureEngine {
    /// Creates an engine reading `release_arg`, defaulting to `default_release`.
    #[must_use]
    pub fn new(release_arg: impl Into<String>, default_release: impl Into<String>) -> Self {
        Self {
            release_arg: release_arg.into(),
            default_release: default_release.into(),
            images: Mutex::new(BTreeSet::new()),
            fault: None,
            closed: false,
        }
    }

    /// Creates an engine using the configured release argument and default.
    #[must_use]
    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(&config.release_arg, &config.default_release)
    }

    /// Makes every call fail as if the engine were unreachable.
    #[must_use]
    pub fn with_fault(mut self, message: impl Into<String>) -> Self {
        self.fault = Some(message.into());
        self
    }

    /// Returns the images built and not yet removed.
    #[must_use]
    pub fn images(&self) -> Vec<ImageId> {
        self.images
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    fn check_reachable(&self) -> Result<()> {
        if self.closed {
            return Err(ProbeError::EngineUnavailable {
                engine: ENGINE,
                message: "engine has been closed".into(),
            });
        }
        if let Some(message) = &self.fault {
            return Err(ProbeError::EngineUnavailable {
                engine: ENGINE,
                message: message.clone(),
            });
        }
        Ok(())
    }

    fn steps(&self) -> [String; 6] {
        let arg = &self.release_arg;
        let install = constants::INSTALL_DIR;
        [
            format!("ARG {arg}={}", self.default_release),
            format!("FROM {BASE_IMAGE}"),
            format!("ARG {arg}"),
            format!("COPY {install} /tmp/{install}"),
            format!("COPY {CHECK_SCRIPT_NAME} /tmp/{CHECK_SCRIPT_NAME}"),
            format!("RUN sh /tmp/{CHECK_SCRIPT_NAME} \"${{{arg}}}\" /tmp/{install}"),
        ]
    }
}

/// Derives a stable image id from the build inputs.
fn image_digest(request: &BuildRequest, release: &str) -> ImageId {
    let mut hasher = Sha256::new();
    hasher.update(request.source_path().to_string_lossy().as_bytes());
    for (name, value) in request.args() {
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\0");
    }
    hasher.update(release.as_bytes());
    let hex: String = hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();
    ImageId::new(format!("sha256:{hex}"))
}

fn short_id(seed: &str) -> String {
    let digest = Sha256::digest(seed.as_bytes());
    digest.iter().take(6).map(|b| format!("{b:02x}")).collect()
}

fn run_failure(log: &mut BuildLog, step: &str) -> String {
    let message = format!("The command '/bin/sh -c {step}' returned a non-zero code: 1");
    log.push(BuildLogEntry::error(message.clone()));
    message
}

impl BuildEngine for FixtureEngine {
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn build(&self, request: &BuildRequest, options: BuildOptions) -> Result<ImageId> {
        self.check_reachable()?;
        let tree = FixtureTree::open(request.source_path())?;
        let provided = request
            .arg(&self.release_arg)
            .unwrap_or(&self.default_release)
            .to_string();
        tracing::info!(
            path = %tree.root().display(),
            release = %provided,
            "emulating fixture build"
        );

        let steps = self.steps();
        let mut log = BuildLog::new();
        for (i, step) in steps.iter().enumerate() {
            log.push(BuildLogEntry::stream(format!(
                "Step {}/{} : {step}\n",
                i + 1,
                steps.len()
            )));
        }
        let container = short_id(&format!("{}{provided}", tree.root().display()));
        log.push(BuildLogEntry::stream(format!(" ---> Running in {container}\n")));

        let found = tree.release()?;
        let failure = if provided.eq_ignore_ascii_case(&found) {
            tree.trigger_message()?
        } else {
            Some(format!("{}\n", release_mismatch_message(&provided, &found)))
        };

        if options.force_rm || failure.is_none() {
            log.push(BuildLogEntry::stream(format!(
                "Removing intermediate container {container}\n"
            )));
        }

        if let Some(output) = failure {
            log.push(BuildLogEntry::stream(output));
            let message = run_failure(&mut log, &steps[5]);
            tracing::info!(%message, "fixture build failed");
            return Err(ProbeError::BuildFailed { message, log });
        }

        log.push(BuildLogEntry::stream(format!(
            "Installation of {found} complete\n"
        )));
        let image = image_digest(request, &found);
        let short: String = image
            .as_str()
            .trim_start_matches("sha256:")
            .chars()
            .take(12)
            .collect();
        log.push(BuildLogEntry::stream(format!("Successfully built {short}\n")));
        tracing::debug!(entries = log.len(), "fixture build log");
        let _ = self
            .images
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(image.clone());
        tracing::info!(image = %image, "fixture build produced an image");
        Ok(image)
    }

    fn remove_image(&self, image: &ImageId) -> Result<()> {
        self.check_reachable()?;
        let removed = self
            .images
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(image);
        if removed {
            tracing::info!(image = %image, "removed image");
        } else {
            tracing::debug!(image = %image, "image already removed");
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        tracing::debug!("fixture engine closed");
        Ok(())
    }

    fn is_available(&self) -> bool {
        !self.closed && self.fault.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> FixtureEngine {
        FixtureEngine::new("MATLAB_RELEASE", "latest")
    }

    fn fixture(release: &str) -> (tempfile::TempDir, FixtureTree) {
        let dir = tempfile::tempdir().expect("tempdir");
        let tree = buildprobe_fixture::scaffold::scaffold(dir.path(), release).expect("scaffold");
        (dir, tree)
    }

    fn failure_log(result: Result<ImageId>) -> BuildLog {
        match result {
            Err(ProbeError::BuildFailed { log, .. }) => log,
            other => panic!("expected build failure, got {other:?}"),
        }
    }

    #[test]
    fn mismatched_release_fails_with_both_values() {
        let (_dir, tree) = fixture("latest");
        let req = BuildRequest::new(tree.root()).build_arg("MATLAB_RELEASE", "R2019b");
        let log = failure_log(engine().build(&req, BuildOptions::default()));
        assert!(log.iter().any(|e| e.stream_text().contains(
            "Provided release (R2019b) does not match release found in VersionInfo.xml (latest)"
        )));
        assert!(log.last_error().is_some());
    }

    #[test]
    fn trigger_content_appears_in_log() {
        let (_dir, tree) = fixture("latest");
        let _guard = tree.install_trigger("Failure message").expect("trigger");
        let req = BuildRequest::new(tree.root()).build_arg("MATLAB_RELEASE", "latest");
        let log = failure_log(engine().build(&req, BuildOptions::default()));
        assert!(log.iter().any(|e| e.stream_text().contains("Failure message")));
    }

    #[test]
    fn missing_argument_uses_default_release() {
        let (_dir, tree) = fixture("latest");
        let engine = engine();
        let image = engine
            .build(&BuildRequest::new(tree.root()), BuildOptions::default())
            .expect("default release matches fixture");
        assert_eq!(engine.images(), vec![image]);
    }

    #[test]
    fn release_comparison_ignores_case() {
        let (_dir, tree) = fixture("R2023a");
        let req = BuildRequest::new(tree.root()).build_arg("MATLAB_RELEASE", "r2023a");
        assert!(engine().build(&req, BuildOptions::default()).is_ok());
    }

    #[test]
    fn identical_builds_share_an_image_id() {
        let (_dir, tree) = fixture("latest");
        let engine = engine();
        let req = BuildRequest::new(tree.root());
        let a = engine.build(&req, BuildOptions::default()).expect("build");
        let b = engine.build(&req, BuildOptions::default()).expect("build");
        assert_eq!(a, b);
        assert_eq!(engine.images().len(), 1);
    }

    #[test]
    fn remove_image_is_idempotent() {
        let (_dir, tree) = fixture("latest");
        let engine = engine();
        let image = engine
            .build(&BuildRequest::new(tree.root()), BuildOptions::default())
            .expect("build");
        engine.remove_image(&image).expect("remove");
        engine.remove_image(&image).expect("remove again");
        assert!(engine.images().is_empty());
    }

    #[test]
    fn intermediate_container_kept_without_force_rm() {
        let (_dir, tree) = fixture("latest");
        let req = BuildRequest::new(tree.root()).build_arg("MATLAB_RELEASE", "R2019b");
        let log = failure_log(engine().build(&req, BuildOptions { force_rm: false }));
        assert!(!log
            .iter()
            .any(|e| e.stream_text().starts_with("Removing intermediate container")));
    }

    #[test]
    fn fault_is_infrastructure_error() {
        let (_dir, tree) = fixture("latest");
        let engine = engine().with_fault("connection refused");
        let err = engine
            .build(&BuildRequest::new(tree.root()), BuildOptions::default())
            .expect_err("fault");
        assert!(matches!(err, ProbeError::EngineUnavailable { .. }));
        assert!(!engine.is_available());
    }

    #[test]
    fn missing_fixture_is_not_a_build_failure() {
        let err = engine()
            .build(&BuildRequest::new("/nonexistent/fixture"), BuildOptions::default())
            .expect_err("missing");
        assert!(!err.is_build_failure());
    }

    #[test]
    fn closed_engine_rejects_builds() {
        let (_dir, tree) = fixture("latest");
        let mut engine = engine();
        engine.close().expect("close");
        assert!(engine
            .build(&BuildRequest::new(tree.root()), BuildOptions::default())
            .is_err());
    }
}
