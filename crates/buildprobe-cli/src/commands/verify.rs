//! `buildprobe verify`: Build once and check the failure diagnostic.

use buildprobe_common::config::ProbeConfig;
use buildprobe_common::types::BuildRequest;
use buildprobe_engine::{BuildClient, EngineKind};
use buildprobe_fixture::{FixtureTree, TriggerGuard};
use buildprobe_verify::expectation::ExpectedFailure;
use buildprobe_verify::verifier::BuildFailureVerifier;
use clap::Args;

use crate::output;

/// Arguments for the `verify` command.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Build argument as `NAME=VALUE`; repeatable.
    #[arg(long = "build-arg", value_parser = parse_build_arg)]
    pub build_args: Vec<(String, String)>,

    /// Substring the failing build must log.
    #[arg(long, conflicts_with = "expect_regex", required_unless_present = "expect_regex")]
    pub expect: Option<String>,

    /// Regular expression the failing build must log.
    #[arg(long)]
    pub expect_regex: Option<String>,

    /// Write this message into the fixture's trigger file for the build.
    #[arg(long)]
    pub trigger: Option<String>,
}

/// Executes the `verify` command.
///
/// # Errors
///
/// Returns an error on an infrastructure fault or when the build does not
/// fail with the expected message.
pub fn execute(args: VerifyArgs, engine: EngineKind, config: &ProbeConfig) -> anyhow::Result<()> {
    let expected = expectation(&args)?;
    let fixture = super::open_fixture(config)?;
    let request = BuildRequest::new(fixture.root()).build_args(args.build_args);

    let _trigger = arm_trigger(&fixture, args.trigger.as_deref())?;

    let verification = BuildClient::scoped(engine.connect(config)?, |client| {
        BuildFailureVerifier::new(client).verify(&request, &expected)
    })?;

    match (&config.log_dir, verification.log()) {
        (Some(dir), Some(log)) if !verification.is_passed() => {
            let path = buildprobe_engine::logs::save_build_log(dir, "verify", log)?;
            tracing::info!(path = %path.display(), "saved build log");
        }
        _ => {}
    }

    output::print_verification(&verification);
    let _ = verification.ensure()?;
    Ok(())
}

/// Writes the trigger file, if requested, with interrupt cleanup.
///
/// A trigger file already present in the fixture is left alone when no
/// message is given, interrupt included.
fn arm_trigger(fixture: &FixtureTree, message: Option<&str>) -> anyhow::Result<Option<TriggerGuard>> {
    let Some(message) = message else {
        return Ok(None);
    };
    super::restore_fixture_on_interrupt(fixture)?;
    Ok(Some(fixture.install_trigger(message)?))
}

fn expectation(args: &VerifyArgs) -> anyhow::Result<ExpectedFailure> {
    match (&args.expect, &args.expect_regex) {
        (Some(text), None) => Ok(ExpectedFailure::contains(text.as_str())),
        (None, Some(pattern)) => Ok(ExpectedFailure::regex(pattern)?),
        _ => Err(anyhow::anyhow!("pass exactly one of --expect or --expect-regex")),
    }
}

fn parse_build_arg(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {s:?}"))?;
    if name.trim().is_empty() {
        return Err(format!("empty build argument name in {s:?}"));
    }
    Ok((name.to_string(), value.to_string()))
}
