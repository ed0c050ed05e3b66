use clap::{Parser, Subcommand};

use crate::check::{CheckArgs, run_check};
use crate::error::Result;
use crate::hash::{HashArgs, run_hash};
use crate::logging::init_logging;
use crate::normalize::{NormalizeArgs, run_normalize};
use crate::render::{RenderArgs, run_render};

#[derive(Debug, Parser)]
#[command(
    name = "fstr",
    about = "Check, render and normalize fstr string table documents",
    version
)]
pub struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace). FSTR_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compile every entry and report what a table load would reject.
    Check(CheckArgs),

    /// Render one entry with NAME=VALUE placeholder arguments.
    Render(RenderArgs),

    /// Rewrite a document sorted by key with fresh hashes.
    Normalize(NormalizeArgs),

    /// Print content hashes as written to the Hash attribute.
    Hash(HashArgs),
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Check(args) => run_check(args),
        Commands::Render(args) => run_render(args),
        Commands::Normalize(args) => run_normalize(args),
        Commands::Hash(args) => run_hash(args),
    }
}
