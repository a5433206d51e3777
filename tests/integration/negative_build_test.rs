//! Integration tests for negative build verification.
//!
//! These tests are implemented in:
//! `crates/buildprobe-verify/tests/negative_build_test.rs`
//!
//! Covered scenarios:
//! - `mismatching_releases_raises_error`: Release argument differs from the payload, pattern match
//! - `mismatching_releases_displays_err_msg_with_both_values`: Literal message names both releases
//! - `install_error_message`: Trigger file content surfaces in the build log
//! - `removing_matching_entries_makes_verification_fail`: Matcher does not pass on a scrubbed log
//! - `repeated_failing_scenario_fails_each_time_without_residue`: No images left behind
//! - `unexpected_success_is_a_failed_verification_and_leaves_no_image`: Built image is removed
//! - `engine_fault_propagates_and_restores_fixture`: Infrastructure faults are not verdicts
//! - `docker_negative_suite_passes`: Full suite against a Docker daemon (`--ignored`)
