//! Codelineage CLI entry point.

use clap::Parser;
use codelineage::cli::{self, Cli, Commands, EXIT_ERROR};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    codelineage::init();

    let result = match cli.command {
        Commands::Symbols(args) => cli::run_symbols(&args),
        Commands::References(args) => cli::run_references(&args),
        Commands::Evolution(args) => cli::run_evolution(&args),
        Commands::Compare(args) => cli::run_compare(&args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
