mod assembler;
mod classifier;
mod cli;
mod error;
mod export;
mod fmt;
mod importer;
mod models;
mod normalizer;
mod pipeline;
mod reports;
mod settings;

use clap::Parser;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Report { input, table } => cli::report::run(config, &input, table.as_deref()),
        Commands::Export {
            input,
            output,
            format,
            no_reconciliation,
        } => cli::export::run(config, &input, output, format.as_deref(), no_reconciliation),
        Commands::Check { input } => cli::check::run(config, &input),
        Commands::Init { force } => cli::init::run(config, force),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
