//! Extracto CLI - Bank statement to QIF converter
//!
//! Usage:
//!   extracto statement.xlsx                      Write statement.qif
//!   extracto statement.xls -o out.qif            Choose the output path
//!   extracto statement.csv --encoding cp1252     Legacy encoding for older tools

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;
use commands::ConvertOptions;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let options = ConvertOptions {
        input: &cli.input,
        output: cli.output.as_deref(),
        encoding: cli.encoding,
        payee_policy: cli.payee_policy,
        config_path: cli.config.as_deref(),
    };
    let today = chrono::Local::now().date_naive();

    commands::cmd_convert(&options, today)?;
    Ok(())
}
