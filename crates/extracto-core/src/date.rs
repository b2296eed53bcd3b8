//! Date normalization for statement cells
//!
//! Dates arrive as typed spreadsheet dates, as serial day counts, or as text
//! in one of a handful of day-first and year-first layouts.

use chrono::{Days, Duration, NaiveDate};

use crate::models::CellValue;

/// Text layouts tried in order; the first successful parse wins
const DATE_FORMATS: [&str; 4] = ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%Y/%m/%d"];

/// Day zero of spreadsheet serial dates
fn serial_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

/// Convert a cell to a calendar date, or `None` when it cannot be read
pub fn parse_date(value: &CellValue) -> Option<NaiveDate> {
    match value {
        CellValue::DateTime(dt) => Some(dt.date()),
        CellValue::Number(serial) => from_serial(*serial),
        CellValue::Empty | CellValue::Bool(_) => None,
        CellValue::Text(s) => parse_date_str(s),
    }
}

/// Convert a spreadsheet serial day count; any fraction (time of day) is dropped
pub fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let days = Duration::try_days(serial.floor() as i64)?;
    serial_epoch().checked_add_signed(days)
}

/// Parse date text, ignoring any time component after the date
pub fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let token = s.split_whitespace().next()?;
    let token = token.split('T').next().unwrap_or(token);

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(token, fmt).ok())
}

/// Window of believable transaction dates
///
/// Dates outside the window only produce a warning; the row is still kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub earliest: NaiveDate,
    pub latest: NaiveDate,
}

impl DateWindow {
    pub fn new(earliest: NaiveDate, latest: NaiveDate) -> Self {
        Self { earliest, latest }
    }

    /// Window ending `horizon_days` after `today`, fixed for the whole run
    pub fn ending_after(earliest: NaiveDate, today: NaiveDate, horizon_days: u64) -> Self {
        let latest = today
            .checked_add_days(Days::new(horizon_days))
            .unwrap_or(NaiveDate::MAX);
        Self { earliest, latest }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.earliest <= date && date <= self.latest
    }
}
