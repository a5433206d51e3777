//! Negative build scenarios.

use std::collections::BTreeMap;

use buildprobe_common::constants::{VERSION_INFO_FILE, release_mismatch_message};
use buildprobe_common::error::Result;
use buildprobe_common::types::BuildRequest;
use buildprobe_fixture::FixtureTree;

use crate::expectation::ExpectedFailure;

/// A build expected to fail, with the diagnostic it must log.
#[derive(Debug, Clone)]
pub struct Scenario {
    name: String,
    build_args: BTreeMap<String, String>,
    trigger: Option<String>,
    expected: ExpectedFailure,
}

impl Scenario {
    /// Creates a scenario with no build arguments and no trigger file.
    #[must_use]
    pub fn new(name: impl Into<String>, expected: ExpectedFailure) -> Self {
        Self {
            name: name.into(),
            build_args: BTreeMap::new(),
            trigger: None,
            expected,
        }
    }

    /// Adds a build argument.
    #[must_use]
    pub fn build_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.build_args.insert(name.into(), value.into());
        self
    }

    /// Writes `message` into the trigger file for the duration of the build.
    #[must_use]
    pub fn trigger(mut self, message: impl Into<String>) -> Self {
        self.trigger = Some(message.into());
        self
    }

    /// A release argument that differs from the fixture's recorded release.
    ///
    /// Expects the literal diagnostic naming both releases.
    #[must_use]
    pub fn release_mismatch(arg: &str, provided: &str, found: &str) -> Self {
        Self::new(
            format!("release-mismatch-message-{provided}"),
            ExpectedFailure::contains(release_mismatch_message(provided, found)),
        )
        .build_arg(arg, provided)
    }

    /// A release argument that differs from the fixture's recorded release.
    ///
    /// Expects any diagnostic of the mismatch shape, whatever the releases.
    ///
    /// # Errors
    ///
    /// Returns an error if the diagnostic pattern fails to compile.
    pub fn release_mismatch_pattern(arg: &str, provided: &str) -> Result<Self> {
        let pattern = format!(
            r"Provided release \(.*\) does not match release found in {}",
            regex::escape(VERSION_INFO_FILE)
        );
        Ok(Self::new(
            format!("release-mismatch-pattern-{provided}"),
            ExpectedFailure::regex(&pattern)?,
        )
        .build_arg(arg, provided))
    }

    /// A matching release with an injected installation failure.
    ///
    /// Expects the trigger message itself in the log.
    #[must_use]
    pub fn install_failure(arg: &str, release: &str, message: &str) -> Self {
        Self::new("install-failure", ExpectedFailure::contains(message))
            .build_arg(arg, release)
            .trigger(message)
    }

    /// Returns the scenario name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the trigger message, if the scenario injects a failure.
    #[must_use]
    pub fn trigger_message(&self) -> Option<&str> {
        self.trigger.as_deref()
    }

    /// Returns the expected diagnostic.
    #[must_use]
    pub const fn expected(&self) -> &ExpectedFailure {
        &self.expected
    }

    /// Builds the request submitted for this scenario.
    #[must_use]
    pub fn request(&self, fixture: &FixtureTree) -> BuildRequest {
        BuildRequest::new(fixture.root()).build_args(self.build_args.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_mismatch_expects_both_values() {
        let s = Scenario::release_mismatch("MATLAB_RELEASE", "R2019b", "latest");
        assert!(s.expected().matches(
            "Provided release (R2019b) does not match release found in VersionInfo.xml (latest)"
        ));
        assert!(s.trigger_message().is_none());
    }

    #[test]
    fn release_mismatch_pattern_accepts_any_release() {
        let s = Scenario::release_mismatch_pattern("MATLAB_RELEASE", "R2019b").expect("scenario");
        assert!(s.expected().matches(
            "Provided release (R2020a) does not match release found in VersionInfo.xml (R2023b)"
        ));
        assert!(!s.expected().matches("Provided release (R2020a) does not match release found in VersionInfoxxml"));
    }

    #[test]
    fn install_failure_uses_trigger_as_expectation() {
        let s = Scenario::install_failure("MATLAB_RELEASE", "latest", "Failure message");
        assert_eq!(s.trigger_message(), Some("Failure message"));
        assert!(s.expected().matches("Failure message\n"));
    }

    #[test]
    fn request_targets_fixture_root_with_args() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tree = buildprobe_fixture::scaffold::scaffold(dir.path(), "latest").expect("scaffold");
        let req = Scenario::release_mismatch("MATLAB_RELEASE", "R2019b", "latest").request(&tree);
        assert_eq!(req.source_path(), tree.root());
        assert_eq!(req.arg("MATLAB_RELEASE"), Some("R2019b"));
    }
}
