//! Store Sales - Main Entry Point
//!
//! Batch prediction and per-store forecasts from the command line.

use clap::Parser;
use store_sales::cli::{cmd_forecast, cmd_info, cmd_predict, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "store_sales=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Predict { input, output } => {
            cmd_predict(&cli.global, &input, output.as_deref())?;
        }
        Commands::Forecast { store, test, stores } => {
            cmd_forecast(&cli.global, store, &test, &stores)?;
        }
        Commands::Info => {
            cmd_info(&cli.global)?;
        }
    }

    Ok(())
}
