//! `buildprobe suite`: Run the standard negative scenarios.

use buildprobe_common::config::ProbeConfig;
use buildprobe_engine::{BuildClient, EngineKind};
use buildprobe_verify::suite::Suite;
use clap::Args;

use crate::output;

/// Arguments for the `suite` command.
#[derive(Args, Debug)]
pub struct SuiteArgs {
    /// Only run scenarios whose name contains this text.
    #[arg(long)]
    pub filter: Option<String>,

    /// Print the report as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// List the scenarios without running them.
    #[arg(long)]
    pub list: bool,
}

/// Executes the `suite` command.
///
/// # Errors
///
/// Returns an error on an infrastructure fault or when any scenario fails.
pub fn execute(args: SuiteArgs, engine: EngineKind, config: &ProbeConfig) -> anyhow::Result<()> {
    let fixture = super::open_fixture(config)?;
    let mut suite = Suite::negative(config, &fixture)?;
    if let Some(filter) = &args.filter {
        suite = suite.filtered(filter);
    }
    if suite.scenarios().is_empty() {
        return Err(anyhow::anyhow!("no scenarios selected"));
    }

    if args.list {
        for scenario in suite.scenarios() {
            println!("{}\t{}", scenario.name(), scenario.expected());
        }
        return Ok(());
    }

    super::restore_fixture_on_interrupt(&fixture)?;
    let report = BuildClient::scoped(engine.connect(config)?, |client| {
        suite.run(client, &fixture, config.log_dir.as_deref())
    })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_suite_report(&report);
    }

    if report.passed() {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "{} of {} scenario(s) failed",
            report.failed_count(),
            report.scenarios.len()
        ))
    }
}
