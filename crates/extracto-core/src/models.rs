//! Domain models for Extracto

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Deserialize;

/// A single cell as handed over by the tabular loader
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
    Bool(bool),
}

impl CellValue {
    /// True for empty cells and text cells containing only whitespace
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Render the cell the way it reads in the spreadsheet
    pub fn to_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s.to_string())
        }
    }
}

/// One data row of the statement, keyed by header label
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRow {
    /// 1-based row number in the source sheet, used in diagnostics
    pub row_number: usize,
    pub cells: HashMap<String, CellValue>,
}

impl RawRow {
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            cells: HashMap::new(),
        }
    }

    pub fn with_cell(mut self, label: &str, value: impl Into<CellValue>) -> Self {
        self.cells.insert(label.to_string(), value.into());
        self
    }

    /// Cell under `label`, or `Empty` when the column is absent
    pub fn get(&self, label: &str) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cells.get(label).unwrap_or(&EMPTY)
    }

    /// Trimmed text of the cell under `label` (absent -> empty string)
    pub fn text(&self, label: &str) -> String {
        self.get(label).to_text().trim().to_string()
    }

    /// Row contents sorted by label, for diagnostics
    pub fn describe(&self) -> String {
        let mut labels: Vec<&String> = self.cells.keys().collect();
        labels.sort();
        labels
            .into_iter()
            .map(|label| format!("{}={:?}", label, self.get(label).to_text()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        Self::DateTime(dt)
    }
}

/// A converted transaction, ready for QIF output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub date: NaiveDate,
    /// Negative amounts are debits
    pub amount: Decimal,
    pub payee: Option<String>,
    /// Colon-joined category hierarchy, empty when the row had none
    pub category: String,
    pub memo: Option<String>,
}

/// Account details found above the statement header (best effort)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountMetadata {
    pub account_number: Option<String>,
    pub holder_name: Option<String>,
    pub export_date: Option<String>,
}

impl AccountMetadata {
    pub fn is_empty(&self) -> bool {
        self.account_number.is_none() && self.holder_name.is_none() && self.export_date.is_none()
    }
}

/// Where the extracted description text ends up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayeePolicy {
    /// Extracted text goes to the memo, payee stays unset
    #[default]
    Memo,
    /// Extracted text goes to the payee, memo holds comment and transaction kind
    Payee,
}

impl PayeePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memo => "memo",
            Self::Payee => "payee",
        }
    }
}

impl std::str::FromStr for PayeePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memo" => Ok(Self::Memo),
            "payee" => Ok(Self::Payee),
            _ => Err(format!("Unknown payee policy: {} (use memo or payee)", s)),
        }
    }
}

impl std::fmt::Display for PayeePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Supported QIF output encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputEncoding {
    #[default]
    Utf8,
    Cp1252,
    Iso8859_1,
}

impl OutputEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Cp1252 => "cp1252",
            Self::Iso8859_1 => "iso-8859-1",
        }
    }
}

impl std::str::FromStr for OutputEncoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "cp1252" | "windows-1252" => Ok(Self::Cp1252),
            "iso-8859-1" | "latin-1" | "latin1" => Ok(Self::Iso8859_1),
            _ => Err(format!(
                "Unknown encoding: {} (use utf-8, cp1252 or iso-8859-1)",
                s
            )),
        }
    }
}

impl std::fmt::Display for OutputEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_row_missing_column_is_empty() {
        let row = RawRow::new(5).with_cell("DESCRIPCIÓN", "  Pago en BAR  ");
        assert_eq!(row.get("CATEGORÍA"), &CellValue::Empty);
        assert_eq!(row.text("CATEGORÍA"), "");
        assert_eq!(row.text("DESCRIPCIÓN"), "Pago en BAR");
    }

    #[test]
    fn test_cell_blank() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::Text("   ".into()).is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
    }

    #[test]
    fn test_payee_policy_from_str() {
        assert_eq!("memo".parse::<PayeePolicy>().unwrap(), PayeePolicy::Memo);
        assert_eq!("PAYEE".parse::<PayeePolicy>().unwrap(), PayeePolicy::Payee);
        assert!("both".parse::<PayeePolicy>().is_err());
    }

    #[test]
    fn test_output_encoding_from_str() {
        assert_eq!(
            "utf-8".parse::<OutputEncoding>().unwrap(),
            OutputEncoding::Utf8
        );
        assert_eq!(
            "CP1252".parse::<OutputEncoding>().unwrap(),
            OutputEncoding::Cp1252
        );
        assert_eq!(
            "iso-8859-1".parse::<OutputEncoding>().unwrap(),
            OutputEncoding::Iso8859_1
        );
        assert!("ebcdic".parse::<OutputEncoding>().is_err());
    }
}
