//! Build failure verification.
//!
//! A verification is a single linear attempt: build once, then judge. Only
//! the engine's build-failure signal is interpreted; every other error is
//! returned unchanged.

use std::fmt;

use buildprobe_common::error::{ProbeError, Result};
use buildprobe_common::types::{BuildLog, BuildLogEntry, BuildRequest, ImageId};
use buildprobe_engine::BuildClient;

use crate::expectation::ExpectedFailure;

/// Outcome of verifying one build request.
#[derive(Debug, Clone)]
pub enum Verification {
    /// The build failed and logged the expected diagnostic.
    Passed {
        /// Expected diagnostic, as displayed.
        expected: String,
        /// Position of the first matching entry.
        index: usize,
        /// The matching entry.
        entry: BuildLogEntry,
        /// Full captured log.
        log: BuildLog,
    },
    /// The build produced an image; the image has been removed.
    UnexpectedSuccess {
        /// Expected diagnostic, as displayed.
        expected: String,
        /// Image that was built and removed.
        image: ImageId,
    },
    /// The build failed but no entry carried the expected diagnostic.
    MessageNotFound {
        /// Expected diagnostic, as displayed.
        expected: String,
        /// Full captured log.
        log: BuildLog,
    },
}

impl Verification {
    /// Returns whether the build failed for the expected reason.
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed { .. })
    }

    /// Short outcome label used in reports.
    #[must_use]
    pub const fn outcome(&self) -> &'static str {
        match self {
            Self::Passed { .. } => "passed",
            Self::UnexpectedSuccess { .. } => "unexpected-success",
            Self::MessageNotFound { .. } => "message-not-found",
        }
    }

    /// Returns the captured log, if the build failed.
    #[must_use]
    pub const fn log(&self) -> Option<&BuildLog> {
        match self {
            Self::Passed { log, .. } | Self::MessageNotFound { log, .. } => Some(log),
            Self::UnexpectedSuccess { .. } => None,
        }
    }

    /// Turns a failed verification into an error.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Verification`] describing the expected
    /// diagnostic and the full log unless the verification passed.
    pub fn ensure(self) -> Result<Self> {
        if self.is_passed() {
            Ok(self)
        } else {
            Err(ProbeError::Verification {
                message: self.to_string(),
            })
        }
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed {
                expected,
                index,
                entry,
                ..
            } => write!(
                f,
                "build failed as expected: {expected} found in log entry {index}: {}",
                entry.stream_text().trim_end()
            ),
            Self::UnexpectedSuccess { expected, image } => write!(
                f,
                "build succeeded (image {image} removed) but was expected to fail with {expected}"
            ),
            Self::MessageNotFound { expected, log } => write!(
                f,
                "expected error message {expected} not found in build log\n{log}"
            ),
        }
    }
}

/// Drives one build against a client and judges the result.
#[derive(Debug, Clone, Copy)]
pub struct BuildFailureVerifier<'c> {
    client: &'c BuildClient,
}

impl<'c> BuildFailureVerifier<'c> {
    /// Creates a verifier using `client`.
    #[must_use]
    pub const fn new(client: &'c BuildClient) -> Self {
        Self { client }
    }

    /// Builds `request` and checks that it fails with `expected`.
    ///
    /// An image produced by an unexpectedly successful build is removed
    /// before returning.
    ///
    /// # Errors
    ///
    /// Returns any engine error other than the build-failure signal, and
    /// any error raised while removing an unexpected image.
    pub fn verify(
        &self,
        request: &BuildRequest,
        expected: &ExpectedFailure,
    ) -> Result<Verification> {
        tracing::info!(
            engine = self.client.engine_name(),
            path = %request.source_path().display(),
            args = ?request.args(),
            %expected,
            "verifying build failure"
        );

        let log = match self.client.build(request) {
            Ok(image) => {
                tracing::warn!(image = %image, "build succeeded; removing unexpected image");
                self.client.remove_image(&image)?;
                return Ok(Verification::UnexpectedSuccess {
                    expected: expected.to_string(),
                    image,
                });
            }
            Err(ProbeError::BuildFailed { log, .. }) => log,
            Err(other) => return Err(other),
        };

        let verification = match expected.find_in(&log) {
            Some((index, entry)) => Verification::Passed {
                expected: expected.to_string(),
                index,
                entry: entry.clone(),
                log,
            },
            None => Verification::MessageNotFound {
                expected: expected.to_string(),
                log,
            },
        };
        tracing::info!(outcome = verification.outcome(), "verification finished");
        Ok(verification)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use buildprobe_engine::{BuildEngine, BuildOptions};

    use super::*;

    /// Engine replaying one canned response.
    struct CannedEngine {
        response: fn() -> Result<ImageId>,
        removed: Arc<Mutex<Vec<ImageId>>>,
    }

    impl BuildEngine for CannedEngine {
        fn name(&self) -> &'static str {
            "canned"
        }

        fn build(&self, _request: &BuildRequest, _options: BuildOptions) -> Result<ImageId> {
            (self.response)()
        }

        fn remove_image(&self, image: &ImageId) -> Result<()> {
            self.removed.lock().expect("lock").push(image.clone());
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            Ok(())
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn client(response: fn() -> Result<ImageId>) -> (BuildClient, Arc<Mutex<Vec<ImageId>>>) {
        let removed = Arc::new(Mutex::new(Vec::new()));
        let engine = CannedEngine {
            response,
            removed: Arc::clone(&removed),
        };
        (BuildClient::new(Box::new(engine)), removed)
    }

    fn failing_build() -> Result<ImageId> {
        Err(ProbeError::BuildFailed {
            message: "non-zero code".into(),
            log: vec![
                BuildLogEntry::stream("Step 6/6 : RUN sh /tmp/check-install.sh\n"),
                BuildLogEntry::stream("Failure message\n"),
                BuildLogEntry::error("returned a non-zero code: 1"),
            ]
            .into_iter()
            .collect(),
        })
    }

    fn successful_build() -> Result<ImageId> {
        Ok(ImageId::new("sha256:built"))
    }

    fn unreachable_engine() -> Result<ImageId> {
        Err(ProbeError::EngineUnavailable {
            engine: "canned",
            message: "connection refused".into(),
        })
    }

    fn request() -> BuildRequest {
        BuildRequest::new("/fixture").build_arg("MATLAB_RELEASE", "latest")
    }

    #[test]
    fn matching_failure_passes() {
        let (client, _) = client(failing_build);
        let v = BuildFailureVerifier::new(&client)
            .verify(&request(), &ExpectedFailure::contains("Failure message"))
            .expect("verify");
        assert!(v.is_passed());
        assert!(matches!(v, Verification::Passed { index: 1, .. }));
    }

    #[test]
    fn missing_message_reports_full_log() {
        let (client, _) = client(failing_build);
        let v = BuildFailureVerifier::new(&client)
            .verify(&request(), &ExpectedFailure::contains("something else"))
            .expect("verify");
        assert_eq!(v.outcome(), "message-not-found");
        let rendered = v.to_string();
        assert!(rendered.contains("'something else'"));
        assert!(rendered.contains("Failure message"));
        assert!(rendered.contains("Step 6/6"));
    }

    #[test]
    fn unexpected_success_removes_image() {
        let (client, removed) = client(successful_build);
        let v = BuildFailureVerifier::new(&client)
            .verify(&request(), &ExpectedFailure::contains("Failure message"))
            .expect("verify");
        assert_eq!(v.outcome(), "unexpected-success");
        assert_eq!(*removed.lock().expect("lock"), vec![ImageId::new("sha256:built")]);
        assert!(matches!(
            v.ensure(),
            Err(ProbeError::Verification { .. })
        ));
    }

    #[test]
    fn infrastructure_fault_propagates_unchanged() {
        let (client, removed) = client(unreachable_engine);
        let err = BuildFailureVerifier::new(&client)
            .verify(&request(), &ExpectedFailure::contains("Failure message"))
            .expect_err("fault");
        assert!(matches!(
            err,
            ProbeError::EngineUnavailable { engine: "canned", .. }
        ));
        assert!(removed.lock().expect("lock").is_empty());
    }

    #[test]
    fn ensure_keeps_passed_verification() {
        let (client, _) = client(failing_build);
        let v = BuildFailureVerifier::new(&client)
            .verify(&request(), &ExpectedFailure::contains("Failure message"))
            .expect("verify")
            .ensure()
            .expect("passed");
        assert!(v.log().is_some_and(|log| log.len() == 3));
    }
}
