//! Extracto Core Library
//!
//! Converts Spanish bank statement exports into QIF:
//! - Statement loading (xls/xlsx/ods via calamine, CSV) with header detection
//! - Amount and date normalization for locale-formatted cells
//! - Payee/memo extraction from free-text descriptions
//! - Row processing with per-row skip reasons
//! - QIF serialization in UTF-8, cp1252 or ISO-8859-1

pub mod amount;
pub mod config;
pub mod date;
pub mod description;
pub mod error;
pub mod export;
pub mod import;
pub mod models;
pub mod process;

pub use config::{ColumnMap, Config};
pub use date::DateWindow;
pub use description::{DescriptionParser, ParsedDescription, TransactionKind};
pub use error::{Error, Result};
pub use export::{render_qif, write_qif};
pub use import::{load_statement, Statement};
pub use models::{
    AccountMetadata, CellValue, OutputEncoding, PayeePolicy, RawRow, TransactionRecord,
};
pub use process::{run_batch, BatchResult, RowOutcome, RowProcessor, SkipReason};
