//! Error types for Extracto
//!
//! Only run-level failures live here. Per-row problems (missing dates,
//! unparseable amounts) are reported as [`crate::process::SkipReason`] values
//! and never abort a conversion.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Expected header row not found in the first {searched_rows} rows")]
    HeaderNotFound { searched_rows: usize },

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("No transactions could be processed ({skipped} rows skipped)")]
    NoTransactions { skipped: usize },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<calamine::Error> for Error {
    fn from(err: calamine::Error) -> Self {
        Self::Spreadsheet(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
