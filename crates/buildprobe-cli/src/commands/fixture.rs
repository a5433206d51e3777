//! `buildprobe fixture`: Create or inspect a fixture directory.

use std::path::PathBuf;

use buildprobe_common::config::ProbeConfig;
use buildprobe_fixture::FixtureTree;
use clap::{Args, Subcommand};

/// Arguments for the `fixture` command.
#[derive(Args, Debug)]
pub struct FixtureArgs {
    /// Fixture action.
    #[command(subcommand)]
    pub action: FixtureAction,
}

/// Fixture actions.
#[derive(Subcommand, Debug)]
pub enum FixtureAction {
    /// Write a Dockerfile, check script, and install payload.
    Init {
        /// Target directory; defaults to the configured fixture directory.
        dir: Option<PathBuf>,

        /// Release recorded in the payload's version file.
        #[arg(long)]
        release: Option<String>,
    },
    /// Print the release recorded in the fixture.
    Release,
    /// Show the fixture layout and any pending trigger file.
    Show,
}

/// Executes the `fixture` command.
///
/// # Errors
///
/// Returns an error if the fixture cannot be written or read.
pub fn execute(args: FixtureArgs, config: &ProbeConfig) -> anyhow::Result<()> {
    match args.action {
        FixtureAction::Init { dir, release } => {
            let root = dir.unwrap_or_else(|| config.fixture_dir.clone());
            let release = release.unwrap_or_else(|| config.default_release.clone());
            let tree = buildprobe_fixture::scaffold::scaffold(&root, &release)?;
            eprintln!("Created fixture at {} (release {release})", tree.root().display());
            Ok(())
        }
        FixtureAction::Release => {
            let tree = super::open_fixture(config)?;
            println!("{}", tree.release()?);
            Ok(())
        }
        FixtureAction::Show => {
            let tree = super::open_fixture(config)?;
            show(&tree)
        }
    }
}

fn show(tree: &FixtureTree) -> anyhow::Result<()> {
    println!("root          {}", tree.root().display());
    println!("dockerfile    {}", tree.dockerfile().display());
    println!("version info  {}", tree.version_info_path().display());
    println!("release       {}", tree.release()?);
    match tree.trigger_message()? {
        Some(message) => println!(
            "trigger       {} ({:?})",
            tree.trigger_path().display(),
            message.trim_end()
        ),
        None => println!("trigger       none"),
    }
    Ok(())
}
