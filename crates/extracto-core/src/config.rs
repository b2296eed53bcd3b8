//! Conversion configuration
//!
//! Describes the statement layout (expected header, column labels), the
//! plausible date window and the payee policy.
//!
//! ## Configuration Resolution
//!
//! 1. An explicit path (`--config`), which must exist
//! 2. The user config file (~/.config/extracto/config.toml on Linux)
//! 3. Built-in defaults matching the bank's spreadsheet export
//!
//! Every key in the file is optional; missing keys keep their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::date::DateWindow;
use crate::error::{Error, Result};
use crate::models::PayeePolicy;

const DEFAULT_HEADER: [&str; 8] = [
    "F. VALOR",
    "CATEGORÍA",
    "SUBCATEGORÍA",
    "DESCRIPCIÓN",
    "COMENTARIO",
    "IMAGEN",
    "IMPORTE (€)",
    "SALDO (€)",
];

/// Five years, counted the simple way
const DEFAULT_HORIZON_DAYS: u64 = 5 * 365;

/// Source column labels for each logical field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub date: String,
    pub category: String,
    pub subcategory: String,
    pub description: String,
    pub comment: String,
    pub amount: String,
}

impl ColumnMap {
    /// Labels that must be present in the header
    pub fn required(&self) -> [&str; 3] {
        [
            self.date.as_str(),
            self.description.as_str(),
            self.amount.as_str(),
        ]
    }

    /// Required labels missing from `columns`
    pub fn missing_required(&self, columns: &[String]) -> Vec<String> {
        self.required()
            .into_iter()
            .filter(|label| !columns.iter().any(|c| c == label))
            .map(str::to_string)
            .collect()
    }
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            date: "F. VALOR".to_string(),
            category: "CATEGORÍA".to_string(),
            subcategory: "SUBCATEGORÍA".to_string(),
            description: "DESCRIPCIÓN".to_string(),
            comment: "COMENTARIO".to_string(),
            amount: "IMPORTE (€)".to_string(),
        }
    }
}

/// Full conversion configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of leading rows searched for the header
    pub header_search_rows: usize,
    pub expected_header: Vec<String>,
    pub columns: ColumnMap,
    pub earliest_date: NaiveDate,
    /// Days after the run date still considered plausible
    pub horizon_days: u64,
    pub payee_policy: PayeePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            header_search_rows: 15,
            expected_header: DEFAULT_HEADER.iter().map(|s| s.to_string()).collect(),
            columns: ColumnMap::default(),
            earliest_date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default(),
            horizon_days: DEFAULT_HORIZON_DAYS,
            payee_policy: PayeePolicy::default(),
        }
    }
}

impl Config {
    /// Date window for a run started on `today`
    pub fn date_window(&self, today: NaiveDate) -> DateWindow {
        DateWindow::ending_after(self.earliest_date, today, self.horizon_days)
    }

    /// Load configuration, see the module docs for the resolution order
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            let content = fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read {}: {}", path.display(), e))
            })?;
            debug!("Loaded config from {}", path.display());
            return parse_config(&content);
        }

        if let Some(default_path) = default_config_path() {
            if default_path.exists() {
                let content = fs::read_to_string(&default_path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", default_path.display(), e))
                })?;
                debug!("Loaded config from {}", default_path.display());
                return parse_config(&content);
            }
        }

        Ok(Self::default())
    }
}

/// Default user config path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("extracto").join("config.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    sheet: Option<RawSheet>,
    columns: Option<RawColumns>,
    dates: Option<RawDates>,
    extraction: Option<RawExtraction>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSheet {
    header_search_rows: Option<usize>,
    expected_header: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawColumns {
    date: Option<String>,
    category: Option<String>,
    subcategory: Option<String>,
    description: Option<String>,
    comment: Option<String>,
    amount: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDates {
    earliest: Option<String>,
    horizon_days: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawExtraction {
    payee_policy: Option<PayeePolicy>,
}

/// Parse config from TOML content on top of the defaults
pub fn parse_config(content: &str) -> Result<Config> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = Config::default();

    if let Some(sheet) = raw.sheet {
        if let Some(rows) = sheet.header_search_rows {
            config.header_search_rows = rows;
        }
        if let Some(header) = sheet.expected_header {
            if header.is_empty() {
                return Err(Error::Config("expected_header must not be empty".into()));
            }
            config.expected_header = header;
        }
    }

    if let Some(columns) = raw.columns {
        let map = &mut config.columns;
        if let Some(v) = columns.date {
            map.date = v;
        }
        if let Some(v) = columns.category {
            map.category = v;
        }
        if let Some(v) = columns.subcategory {
            map.subcategory = v;
        }
        if let Some(v) = columns.description {
            map.description = v;
        }
        if let Some(v) = columns.comment {
            map.comment = v;
        }
        if let Some(v) = columns.amount {
            map.amount = v;
        }
    }

    if let Some(dates) = raw.dates {
        if let Some(earliest) = dates.earliest {
            config.earliest_date = NaiveDate::parse_from_str(&earliest, "%Y-%m-%d")
                .map_err(|e| Error::Config(format!("Invalid earliest date '{}': {}", earliest, e)))?;
        }
        if let Some(days) = dates.horizon_days {
            config.horizon_days = days;
        }
    }

    if let Some(extraction) = raw.extraction {
        if let Some(policy) = extraction.payee_policy {
            config.payee_policy = policy;
        }
    }

    Ok(config)
}
