//! Row processing and the batch pipeline
//!
//! Each statement row becomes either a [`TransactionRecord`] or a
//! [`SkipReason`]. Rows without a date or amount are normal in bank exports
//! (balance lines, notes), so skipping is never an error. Only a batch that
//! yields no records at all fails.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::amount::{parse_amount, AmountError};
use crate::config::{ColumnMap, Config};
use crate::date::{parse_date, DateWindow};
use crate::description::{DescriptionParser, ParsedDescription};
use crate::error::{Error, Result};
use crate::models::{PayeePolicy, RawRow, TransactionRecord};

/// Why a row did not produce a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingDate,
    InvalidDate { raw: String },
    MissingAmount,
    InvalidAmount { raw: String, cleaned: String },
    Unexpected { message: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDate => write!(f, "missing date"),
            Self::InvalidDate { raw } => write!(f, "invalid date '{}'", raw),
            Self::MissingAmount => write!(f, "missing amount"),
            Self::InvalidAmount { raw, cleaned } => {
                write!(f, "invalid amount '{}' (cleaned: '{}')", raw, cleaned)
            }
            Self::Unexpected { message } => write!(f, "unexpected error: {}", message),
        }
    }
}

/// Result of processing one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Record(TransactionRecord),
    Skipped(SkipReason),
}

/// A skipped row with its source position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub row_number: usize,
    pub reason: SkipReason,
}

/// Output of a whole batch
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    /// Valid records, sorted by date (stable)
    pub records: Vec<TransactionRecord>,
    pub skipped: Vec<SkippedRow>,
}

impl BatchResult {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Turns raw rows into transaction records
pub struct RowProcessor {
    columns: ColumnMap,
    parser: DescriptionParser,
    window: DateWindow,
    policy: PayeePolicy,
}

impl RowProcessor {
    /// Build a processor; `window` is fixed for the whole run
    pub fn new(config: &Config, window: DateWindow) -> Result<Self> {
        Ok(Self {
            columns: config.columns.clone(),
            parser: DescriptionParser::new()?,
            window,
            policy: config.payee_policy,
        })
    }

    pub fn policy(&self) -> PayeePolicy {
        self.policy
    }

    /// Process one row
    pub fn process(&self, row: &RawRow) -> RowOutcome {
        let raw_date = row.get(&self.columns.date);
        if raw_date.is_blank() {
            return RowOutcome::Skipped(SkipReason::MissingDate);
        }
        let Some(date) = parse_date(raw_date) else {
            return RowOutcome::Skipped(SkipReason::InvalidDate {
                raw: raw_date.to_text(),
            });
        };

        if !self.window.contains(date) {
            warn!(
                "Row {}: date {} outside plausible range",
                row.row_number,
                date.format("%d/%m/%Y")
            );
        }

        let amount = match parse_amount(row.get(&self.columns.amount)) {
            Ok(amount) => amount,
            Err(AmountError::Missing) => return RowOutcome::Skipped(SkipReason::MissingAmount),
            Err(AmountError::Invalid { raw, cleaned }) => {
                return RowOutcome::Skipped(SkipReason::InvalidAmount { raw, cleaned })
            }
        };

        let category = row.text(&self.columns.category);
        let subcategory = row.text(&self.columns.subcategory);
        let description = row.text(&self.columns.description);
        let comment = row.text(&self.columns.comment);

        let parsed = self.parser.parse(&description);
        let (payee, memo) = self.route_extracted(parsed, &comment);

        let category = [category, subcategory]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(":");

        debug!(
            "Row {}: payee={:?} category={:?} memo={:?}",
            row.row_number, payee, category, memo
        );

        RowOutcome::Record(TransactionRecord {
            date,
            amount,
            payee,
            category,
            memo,
        })
    }

    /// Place the extracted text according to the payee policy
    fn route_extracted(
        &self,
        parsed: ParsedDescription,
        comment: &str,
    ) -> (Option<String>, Option<String>) {
        match self.policy {
            PayeePolicy::Memo => (None, parsed.extracted),
            PayeePolicy::Payee => {
                let kind_tag = parsed.kind.map(|kind| format!("Tipo: {}", kind.keyword()));
                let memo = [Some(comment.to_string()), kind_tag]
                    .into_iter()
                    .flatten()
                    .filter(|item| !item.is_empty())
                    .collect::<Vec<_>>()
                    .join(" // ");
                (parsed.extracted, Some(memo).filter(|m| !m.is_empty()))
            }
        }
    }
}

/// Process all rows in order, then sort the records by date
///
/// Fails only when no row produced a record.
pub fn run_batch<'a>(
    processor: &RowProcessor,
    rows: impl IntoIterator<Item = &'a RawRow>,
) -> Result<BatchResult> {
    collect_outcomes(rows, |row| processor.process(row))
}

fn collect_outcomes<'a, F>(
    rows: impl IntoIterator<Item = &'a RawRow>,
    process: F,
) -> Result<BatchResult>
where
    F: Fn(&RawRow) -> RowOutcome,
{
    let mut result = BatchResult::default();

    for row in rows {
        match guarded(row, &process) {
            RowOutcome::Record(record) => result.records.push(record),
            RowOutcome::Skipped(reason) => {
                log_skip(row, &reason);
                result.skipped.push(SkippedRow {
                    row_number: row.row_number,
                    reason,
                });
            }
        }
    }

    if result.records.is_empty() {
        return Err(Error::NoTransactions {
            skipped: result.skipped_count(),
        });
    }

    // Stable: records sharing a date keep their input order
    result.records.sort_by_key(|record| record.date);

    debug!(
        "Batch complete: {} records, {} skipped",
        result.records.len(),
        result.skipped_count()
    );
    Ok(result)
}

/// Run one row step; a panic becomes `SkipReason::Unexpected`
fn guarded<F>(row: &RawRow, process: F) -> RowOutcome
where
    F: FnOnce(&RawRow) -> RowOutcome,
{
    panic::catch_unwind(AssertUnwindSafe(|| process(row))).unwrap_or_else(|payload| {
        RowOutcome::Skipped(SkipReason::Unexpected {
            message: panic_message(payload.as_ref()),
        })
    })
}

fn log_skip(row: &RawRow, reason: &SkipReason) {
    match reason {
        SkipReason::MissingDate | SkipReason::MissingAmount => {
            debug!("Skipping row {}: {}", row.row_number, reason)
        }
        SkipReason::InvalidDate { .. } | SkipReason::InvalidAmount { .. } => {
            warn!("Skipping row {}: {}", row.row_number, reason)
        }
        SkipReason::Unexpected { .. } => {
            warn!(
                "Skipping row {}: {}. Row data: {}",
                row.row_number,
                reason,
                row.describe()
            )
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
