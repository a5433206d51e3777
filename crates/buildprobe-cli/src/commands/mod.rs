//! CLI command definitions and dispatch.

pub mod fixture;
pub mod suite;
pub mod verify;

use std::path::PathBuf;

use buildprobe_common::config::ProbeConfig;
use buildprobe_common::constants;
use buildprobe_engine::EngineKind;
use buildprobe_fixture::FixtureTree;
use clap::{Parser, Subcommand};

/// buildprobe: negative-path container build verification.
#[derive(Parser, Debug)]
#[command(name = "buildprobe", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// JSON configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Build engine to run builds on (`docker` or `fixture`).
    #[arg(long, global = true, default_value = "docker")]
    pub engine: EngineKind,

    /// Fixture directory holding the Dockerfile and install payload.
    #[arg(long, global = true, env = constants::ENV_FIXTURE)]
    pub fixture: Option<PathBuf>,

    /// Docker CLI binary.
    #[arg(long, global = true, env = constants::ENV_DOCKER)]
    pub docker: Option<PathBuf>,

    /// Directory receiving captured logs of failed verifications.
    #[arg(long, global = true, env = constants::ENV_LOG_DIR)]
    pub log_dir: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build once and check the build fails with an expected message.
    Verify(verify::VerifyArgs),
    /// Run the standard negative scenarios against the fixture.
    Suite(suite::SuiteArgs),
    /// Create or inspect a fixture directory.
    Fixture(fixture::FixtureArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;
    match cli.command {
        Command::Verify(args) => verify::execute(args, cli.engine, &config),
        Command::Suite(args) => suite::execute(args, cli.engine, &config),
        Command::Fixture(args) => fixture::execute(args, &config),
    }
}

/// Merges the config file, environment, and command-line flags.
///
/// Flags win over the environment, which wins over the file.
fn resolve_config(cli: &Cli) -> anyhow::Result<ProbeConfig> {
    let mut config = match &cli.config {
        Some(path) => ProbeConfig::load(path)?,
        None => ProbeConfig::default(),
    }
    .with_env_overrides();

    if let Some(fixture) = &cli.fixture {
        config.fixture_dir.clone_from(fixture);
    }
    if let Some(docker) = &cli.docker {
        config.docker_binary.clone_from(docker);
    }
    if let Some(log_dir) = &cli.log_dir {
        config.log_dir = Some(log_dir.clone());
    }
    config.validate()?;
    tracing::debug!(?config, "resolved configuration");
    Ok(config)
}

/// Opens the configured fixture tree with a hint on failure.
fn open_fixture(config: &ProbeConfig) -> anyhow::Result<FixtureTree> {
    FixtureTree::open(&config.fixture_dir).map_err(|e| {
        anyhow::anyhow!(
            "{e}\nCreate one with: buildprobe fixture init {}",
            config.fixture_dir.display()
        )
    })
}

/// Removes the trigger file and exits when the user interrupts a build.
///
/// The engine subprocess receives the same signal, so only the fixture
/// needs restoring here.
fn restore_fixture_on_interrupt(fixture: &FixtureTree) -> anyhow::Result<()> {
    let trigger = fixture.trigger_path();
    match ctrlc::set_handler(move || {
        if let Err(e) = buildprobe_fixture::trigger::remove_file(&trigger) {
            tracing::warn!(error = %e, "failed to remove trigger file on interrupt");
        }
        std::process::exit(130);
    }) {
        Ok(()) => Ok(()),
        // Already installed by an earlier command in this process.
        Err(ctrlc::Error::MultipleHandlers) => {
            tracing::debug!("Ctrl+C handler already installed");
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("failed to set Ctrl+C handler: {e}")),
    }
}
