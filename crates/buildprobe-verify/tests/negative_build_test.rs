//! Negative build scenarios run end to end against a scaffolded fixture tree.
//!
//! The in-process fixture engine replays the installer check, so these run
//! without a Docker daemon. The `docker_*` tests exercise the real engine and
//! are ignored by default: `cargo test -- --ignored`.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;

use buildprobe_common::config::ProbeConfig;
use buildprobe_common::error::{ProbeError, Result};
use buildprobe_common::types::{BuildLog, BuildRequest, ImageId};
use buildprobe_engine::backend::fixture::FixtureEngine;
use buildprobe_engine::{BuildClient, BuildEngine, BuildOptions, EngineKind};
use buildprobe_fixture::FixtureTree;
use buildprobe_verify::expectation::ExpectedFailure;
use buildprobe_verify::scenario::Scenario;
use buildprobe_verify::suite::{Suite, run_scenario};
use buildprobe_verify::verifier::{BuildFailureVerifier, Verification};

fn fixture(release: &str) -> (tempfile::TempDir, FixtureTree) {
    let dir = tempfile::tempdir().expect("tempdir");
    let tree = buildprobe_fixture::scaffold::scaffold(dir.path(), release).expect("scaffold");
    (dir, tree)
}

fn fixture_client() -> BuildClient {
    BuildClient::new(Box::new(FixtureEngine::new("MATLAB_RELEASE", "latest")))
}

fn captured_log(engine: &FixtureEngine, request: &BuildRequest) -> BuildLog {
    match engine.build(request, BuildOptions::default()) {
        Err(ProbeError::BuildFailed { log, .. }) => log,
        other => panic!("expected build failure, got {other:?}"),
    }
}

// ── Release mismatch ─────────────────────────────────────────────────

#[test]
fn mismatching_releases_raises_error() {
    let (_dir, tree) = fixture("latest");
    let client = fixture_client();
    let scenario = Scenario::release_mismatch_pattern("MATLAB_RELEASE", "R2019b").expect("scenario");

    let verification = run_scenario(&client, &tree, &scenario).expect("verify");
    assert!(verification.is_passed(), "{verification}");
}

#[test]
fn mismatching_releases_displays_err_msg_with_both_values() {
    let (_dir, tree) = fixture("latest");
    let client = fixture_client();
    let scenario = Scenario::release_mismatch("MATLAB_RELEASE", "R2019b", "latest");

    let verification = run_scenario(&client, &tree, &scenario).expect("verify");
    let Verification::Passed { entry, .. } = &verification else {
        panic!("expected pass, got {verification}");
    };
    assert!(entry.stream_text().contains("R2019b"));
    assert!(entry.stream_text().contains("latest"));
}

#[test]
fn every_mismatching_release_cites_both_values() {
    let (_dir, tree) = fixture("latest");
    let client = fixture_client();
    for provided in ["R2019b", "R2020a", "R2023b", "r2024a", "nightly"] {
        let scenario = Scenario::release_mismatch("MATLAB_RELEASE", provided, "latest");
        let verification = run_scenario(&client, &tree, &scenario).expect("verify");
        assert!(verification.is_passed(), "{provided}: {verification}");
    }
}

// ── Injected installation failure ────────────────────────────────────

#[test]
fn install_error_message() {
    let (_dir, tree) = fixture("latest");
    let client = fixture_client();
    let scenario = Scenario::install_failure("MATLAB_RELEASE", "latest", "Failure message");

    let verification = run_scenario(&client, &tree, &scenario).expect("verify");
    assert!(verification.is_passed(), "{verification}");
    assert!(!tree.trigger_path().exists(), "trigger file must be removed");
}

#[test]
fn install_error_trigger_removed_when_verification_fails() {
    let (_dir, tree) = fixture("latest");
    let client = fixture_client();
    let scenario = Scenario::new("wrong-expectation", ExpectedFailure::contains("not logged"))
        .build_arg("MATLAB_RELEASE", "latest")
        .trigger("Failure message");

    let verification = run_scenario(&client, &tree, &scenario).expect("verify");
    assert_eq!(verification.outcome(), "message-not-found");
    assert!(verification.to_string().contains("Failure message"));
    assert!(!tree.trigger_path().exists());
}

// ── Matcher soundness ────────────────────────────────────────────────

#[test]
fn removing_matching_entries_makes_verification_fail() {
    let (_dir, tree) = fixture("latest");
    let engine = FixtureEngine::new("MATLAB_RELEASE", "latest");
    let request = BuildRequest::new(tree.root()).build_arg("MATLAB_RELEASE", "R2019b");
    let expected = ExpectedFailure::regex(r"Provided release \(.*\) does not match").expect("regex");

    let mut log = captured_log(&engine, &request);
    assert!(expected.find_in(&log).is_some());

    log.retain(|e| !expected.matches(e.stream_text()));
    assert!(expected.find_in(&log).is_none());
    assert!(!log.is_empty());
}

// ── Idempotence and cleanup ──────────────────────────────────────────

#[test]
fn repeated_failing_scenario_fails_each_time_without_residue() {
    let (_dir, tree) = fixture("latest");
    let engine = FixtureEngine::new("MATLAB_RELEASE", "latest");
    let request = BuildRequest::new(tree.root()).build_arg("MATLAB_RELEASE", "R2019b");

    for _ in 0..2 {
        let log = captured_log(&engine, &request);
        assert!(!log.is_empty());
    }
    assert!(engine.images().is_empty());
}

#[test]
fn empty_build_args_fall_back_to_default_release() {
    let (_dir, tree) = fixture("latest");
    let engine = FixtureEngine::new("MATLAB_RELEASE", "latest");
    let image = engine
        .build(&BuildRequest::new(tree.root()), BuildOptions::default())
        .expect("default release matches the fixture");
    engine.remove_image(&image).expect("remove");
    assert!(engine.images().is_empty());
}

/// Fixture engine shared with the test so its live images stay observable.
struct SharedEngine(Arc<FixtureEngine>);

impl BuildEngine for SharedEngine {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn build(&self, request: &BuildRequest, options: BuildOptions) -> Result<ImageId> {
        self.0.build(request, options)
    }

    fn remove_image(&self, image: &ImageId) -> Result<()> {
        self.0.remove_image(image)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.0.is_available()
    }
}

#[test]
fn unexpected_success_is_a_failed_verification_and_leaves_no_image() {
    let (_dir, tree) = fixture("latest");
    let engine = Arc::new(FixtureEngine::new("MATLAB_RELEASE", "latest"));
    let client = BuildClient::new(Box::new(SharedEngine(Arc::clone(&engine))));
    let expected = ExpectedFailure::contains("Failure message");

    let verification = BuildFailureVerifier::new(&client)
        .verify(&BuildRequest::new(tree.root()), &expected)
        .expect("verify");
    let Verification::UnexpectedSuccess { image, .. } = &verification else {
        panic!("expected unexpected success, got {verification}");
    };
    assert!(image.as_str().starts_with("sha256:"));
    assert!(engine.images().is_empty(), "left {:?}", engine.images());
    assert!(verification.ensure().is_err());
}

// ── Infrastructure faults ────────────────────────────────────────────

#[test]
fn engine_fault_propagates_and_restores_fixture() {
    let (_dir, tree) = fixture("latest");
    let client = BuildClient::new(Box::new(
        FixtureEngine::new("MATLAB_RELEASE", "latest").with_fault("connection refused"),
    ));
    let scenario = Scenario::install_failure("MATLAB_RELEASE", "latest", "Failure message");

    let err = run_scenario(&client, &tree, &scenario).expect_err("fault");
    assert!(matches!(err, ProbeError::EngineUnavailable { .. }));
    assert!(!tree.trigger_path().exists());
}

#[test]
fn scoped_client_runs_the_negative_suite() {
    let (_dir, tree) = fixture("latest");
    let config = ProbeConfig::default();
    let report = BuildClient::scoped(EngineKind::Fixture.connect(&config).expect("connect"), |client| {
        Suite::negative(&config, &tree)?.run(client, &tree, None)
    })
    .expect("suite");
    assert!(report.passed(), "{report:#?}");
    assert_eq!(report.scenarios.len(), 3);
}

// ── Docker ───────────────────────────────────────────────────────────

#[test]
#[ignore = "requires a Docker daemon"]
fn docker_negative_suite_passes() {
    let (_dir, tree) = fixture("latest");
    let config = ProbeConfig::default().with_env_overrides();
    let report = BuildClient::scoped(EngineKind::Docker.connect(&config).expect("connect"), |client| {
        Suite::negative(&config, &tree)?.run(client, &tree, None)
    })
    .expect("suite");
    assert!(report.passed(), "{report:#?}");
    assert!(!tree.trigger_path().exists());
}
