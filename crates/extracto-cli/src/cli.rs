//! CLI argument definitions using clap
//!
//! The conversion itself lives in the `commands` module.

use std::path::PathBuf;

use clap::Parser;
use extracto_core::{OutputEncoding, PayeePolicy};

/// Extracto - Convert bank statement exports to QIF
#[derive(Parser, Debug)]
#[command(name = "extracto")]
#[command(about = "Convert Spanish bank statement exports to QIF", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Statement export (.xls, .xlsx, .ods or .csv)
    pub input: PathBuf,

    /// Output QIF file (defaults to the input path with a .qif extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output encoding: utf-8, cp1252 or iso-8859-1
    ///
    /// Non-UTF-8 encodings replace characters they cannot represent with '?'.
    #[arg(long, default_value = "utf-8")]
    pub encoding: OutputEncoding,

    /// Where extracted payee text goes: memo or payee (overrides config)
    #[arg(long)]
    pub payee_policy: Option<PayeePolicy>,

    /// Configuration file (defaults to ~/.config/extracto/config.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
