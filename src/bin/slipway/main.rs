//! Slipway CLI - a declarative build driver for cross-platform native plugins

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use slipway::util::Shell;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "slipway=debug"
    } else {
        "slipway=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Diagnostics share stderr with status lines; stdout carries only
    // machine-readable results.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let shell = Arc::new(Shell::from_flags(cli.verbose, cli.no_color));

    match cli.command {
        Commands::Build(args) => commands::build::execute(args, shell),
        Commands::Test(args) => commands::test::execute(args, shell),
        Commands::List(args) => commands::list::execute(args),
        Commands::Matrix(args) => commands::matrix::execute(args, &shell),
        Commands::FilterTests(args) => commands::filter_tests::execute(args, &shell),
        Commands::ReleaseMatrix(args) => commands::release_matrix::execute(args, &shell),
        Commands::RecordBuild(args) => commands::record_build::execute(args, &shell),
        Commands::RecordTest(args) => commands::record_test::execute(args, &shell),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
