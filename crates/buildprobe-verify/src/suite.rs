//! The negative build suite and its report.

use std::path::{Path, PathBuf};
use std::time::Instant;

use buildprobe_common::config::ProbeConfig;
use buildprobe_common::error::{ProbeError, Result};
use buildprobe_engine::BuildClient;
use buildprobe_fixture::FixtureTree;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::scenario::Scenario;
use crate::verifier::{BuildFailureVerifier, Verification};

/// Runs one scenario against a fixture tree.
///
/// The trigger file, if any, is installed before the build and removed on
/// every exit path, including infrastructure faults and panics.
///
/// # Errors
///
/// Returns an error if the trigger cannot be written or the engine fails
/// for a reason other than the build failing.
pub fn run_scenario(
    client: &BuildClient,
    fixture: &FixtureTree,
    scenario: &Scenario,
) -> Result<Verification> {
    tracing::info!(scenario = scenario.name(), "running scenario");
    let _trigger = scenario
        .trigger_message()
        .map(|message| fixture.install_trigger(message))
        .transpose()?;
    let request = scenario.request(fixture);
    BuildFailureVerifier::new(client).verify(&request, scenario.expected())
}

/// Result of one scenario within a suite run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub name: String,
    /// Outcome label (`passed`, `unexpected-success`, `message-not-found`).
    pub outcome: &'static str,
    /// Human-readable verdict, including the full log on mismatch.
    pub detail: String,
    /// Wall-clock duration of the build.
    pub duration_ms: u64,
    /// Saved build log, when a log directory was configured.
    pub log_path: Option<PathBuf>,
}

impl ScenarioReport {
    /// Returns whether the scenario passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcome == "passed"
    }
}

/// Result of a whole suite run.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    /// Engine the suite ran against.
    pub engine: String,
    /// Fixture tree root.
    pub fixture: PathBuf,
    /// Start of the run.
    pub started_at: DateTime<Utc>,
    /// End of the run.
    pub finished_at: DateTime<Utc>,
    /// Per-scenario results, in run order.
    pub scenarios: Vec<ScenarioReport>,
}

impl SuiteReport {
    /// Returns whether every scenario passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.scenarios.iter().all(ScenarioReport::passed)
    }

    /// Returns the number of failed scenarios.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.scenarios.iter().filter(|s| !s.passed()).count()
    }
}

/// An ordered list of scenarios run against one fixture tree.
#[derive(Debug, Clone, Default)]
pub struct Suite {
    scenarios: Vec<Scenario>,
}

impl Suite {
    /// Creates a suite from explicit scenarios.
    #[must_use]
    pub const fn new(scenarios: Vec<Scenario>) -> Self {
        Self { scenarios }
    }

    /// The standard negative scenarios for `fixture`.
    ///
    /// Uses the release recorded in the fixture as the matching release and
    /// the configured mismatched release for the two mismatch scenarios.
    ///
    /// # Errors
    ///
    /// Returns an error if the fixture release cannot be read, if it equals
    /// the configured mismatched release, or if a pattern fails to compile.
    pub fn negative(config: &ProbeConfig, fixture: &FixtureTree) -> Result<Self> {
        let found = fixture.release()?;
        let arg = config.release_arg.as_str();
        let provided = config.mismatched_release.as_str();
        if provided.eq_ignore_ascii_case(&found) {
            return Err(ProbeError::Config {
                message: format!(
                    "mismatched_release {provided:?} matches the release recorded in {}",
                    fixture.version_info_path().display()
                ),
            });
        }
        Ok(Self::new(vec![
            Scenario::release_mismatch_pattern(arg, provided)?,
            Scenario::release_mismatch(arg, provided, &found),
            Scenario::install_failure(arg, &found, &config.install_failure_message),
        ]))
    }

    /// Returns the scenarios in run order.
    #[must_use]
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Keeps only scenarios whose name contains `filter`.
    #[must_use]
    pub fn filtered(mut self, filter: &str) -> Self {
        self.scenarios.retain(|s| s.name().contains(filter));
        self
    }

    /// Runs every scenario in order.
    ///
    /// Captured logs of failed scenarios are written to `log_dir` when set.
    /// The run stops at the first infrastructure fault.
    ///
    /// # Errors
    ///
    /// Returns the first infrastructure fault, or an error saving a log.
    pub fn run(
        &self,
        client: &BuildClient,
        fixture: &FixtureTree,
        log_dir: Option<&Path>,
    ) -> Result<SuiteReport> {
        let started_at = Utc::now();
        let mut scenarios = Vec::with_capacity(self.scenarios.len());

        for scenario in &self.scenarios {
            let start = Instant::now();
            let verification = run_scenario(client, fixture, scenario)?;
            let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            let log_path = match (log_dir, verification.log()) {
                (Some(dir), Some(log)) if !verification.is_passed() => Some(
                    buildprobe_engine::logs::save_build_log(dir, scenario.name(), log)?,
                ),
                _ => None,
            };
            if verification.is_passed() {
                tracing::info!(scenario = scenario.name(), duration_ms, "scenario passed");
            } else {
                tracing::warn!(
                    scenario = scenario.name(),
                    outcome = verification.outcome(),
                    "scenario failed"
                );
            }

            scenarios.push(ScenarioReport {
                name: scenario.name().to_string(),
                outcome: verification.outcome(),
                detail: verification.to_string(),
                duration_ms,
                log_path,
            });
        }

        Ok(SuiteReport {
            engine: client.engine_name().to_string(),
            fixture: fixture.root().to_path_buf(),
            started_at,
            finished_at: Utc::now(),
            scenarios,
        })
    }
}
