// mash/src/cli.rs
//! Defines the command-line argument structure using clap.
use clap::{ArgAction, Parser, Subcommand};
use mash_common::error::Result;
use mash_common::Config;

// Module declarations
pub mod fetch;
pub mod info;
pub mod install;
pub mod list;

use crate::cli::fetch::FetchArgs;
use crate::cli::info::InfoArgs;
use crate::cli::install::InstallArgs;
use crate::cli::list::ListArgs;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "mash", bin_name = "mash")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch, verify, build, install and test formulae
    Install(InstallArgs),
    /// Download and verify a formula's source without building it
    Fetch(FetchArgs),
    /// Show a formula definition
    Info(InfoArgs),
    /// List installed formulae
    List(ListArgs),
}

impl Command {
    pub async fn run(&self, config: &Config) -> Result<()> {
        match self {
            Self::Install(command) => command.run(config).await,
            Self::Fetch(command) => command.run(config).await,
            Self::Info(command) => command.run(config).await,
            Self::List(command) => command.run(config).await,
        }
    }
}
