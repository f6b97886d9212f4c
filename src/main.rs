//! cxxdoc CLI entry point

use anyhow::Result;
use clap::Parser;
use cxxdoc::cli::{Cli, Commands};
use cxxdoc::core::config::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };

    // CXXDOC_LOG wins over the configured level
    let filter = EnvFilter::try_from_env("CXXDOC_LOG")
        .unwrap_or_else(|_| EnvFilter::new(&config.log.filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Inspect(args) => cxxdoc::cli::inspect::run(args, &config),
    }
}
