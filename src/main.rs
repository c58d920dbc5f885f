//! # Application Entry Point
//!
//! Parses the CLI, initializes logging, dispatches to the requested
//! pipeline, and maps failures to process exit codes.

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use prgmap::config::{Cli, Command};
use prgmap::error::Result;
use prgmap::pipelines::{BuildPipeline, QuasimapPipeline};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        error!("{err}");
        std::process::exit(err.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Build(args) => {
            args.validate()?;
            BuildPipeline::new(args).run()
        }
        Command::Quasimap(args) => {
            args.validate()?;
            QuasimapPipeline::new(args).run().map(|_| ())
        }
    }
}
