mod cli;
mod commands;
mod dedup;
mod error;
mod event;
mod gazetteer;
mod model;
mod region;
mod sources;
mod spatial;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::error::PipelineError;

const EXIT_FAILURE: i32 = 1;
const EXIT_EMPTY_RESULT: i32 = 2;

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }

        let code = match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::EmptyResult { .. }) => EXIT_EMPTY_RESULT,
            _ => EXIT_FAILURE,
        };
        std::process::exit(code);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Combine(args) => commands::combine::run(args),
        Commands::Inventory(args) => commands::inventory::run(args),
        Commands::Locate(args) => commands::locate::run(args),
        Commands::Status(args) => commands::status::run(args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
