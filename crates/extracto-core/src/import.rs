//! Statement loading from spreadsheet and CSV exports
//!
//! The bank export starts with a few lines of account details, followed by
//! the transaction table. Loading happens in two stages: read the first
//! worksheet (or CSV file) into a grid of cells, then locate the header row
//! and turn every following row into a [`RawRow`].

use std::fs::File;
use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{AccountMetadata, CellValue, RawRow};

/// A grid of cells indexed by absolute sheet position (row, column)
pub type Grid = Vec<Vec<CellValue>>;

/// Input file kinds, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Spreadsheet,
    Csv,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xls" | "xlsx" | "xlsm" | "xlsb" | "ods" => Ok(Self::Spreadsheet),
            "csv" => Ok(Self::Csv),
            _ => Err(Error::UnsupportedInput(format!(
                "{} (expected .xls, .xlsx, .xlsm, .xlsb, .ods or .csv)",
                path.display()
            ))),
        }
    }
}

/// A loaded statement: header, data rows and account details
#[derive(Debug, Clone)]
pub struct Statement {
    /// 0-based index of the header row in the sheet
    pub header_index: usize,
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
    pub metadata: AccountMetadata,
}

/// Load a statement file and validate its layout
pub fn load_statement(path: &Path, config: &Config) -> Result<Statement> {
    let grid = match InputFormat::from_path(path)? {
        InputFormat::Spreadsheet => read_spreadsheet(path)?,
        InputFormat::Csv => read_csv(File::open(path)?)?,
    };
    debug!("Read {} rows from {}", grid.len(), path.display());
    statement_from_grid(grid, config)
}

/// Read the first worksheet of a workbook
pub fn read_spreadsheet(path: &Path) -> Result<Grid> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::Spreadsheet("Workbook has no worksheets".into()))??;

    // Ranges start at the first used cell; pad so indexes match the sheet
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut grid: Grid = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; start_col as usize];
        cells.extend(row.iter().map(cell_from_data));
        grid.push(cells);
    }
    Ok(grid)
}

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::String(s) => CellValue::from(s.as_str()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        // Error cells carry no usable value
        _ => CellValue::Empty,
    }
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Read a CSV export; `;` is used as delimiter when it dominates the first line
pub fn read_csv<R: Read>(mut reader: R) -> Result<Grid> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;
    let content = content.strip_prefix('\u{FEFF}').unwrap_or(&content);

    let first_line = content.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let delimiter = if first_line.matches(';').count() > first_line.matches(',').count() {
        b';'
    } else {
        b','
    };

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    let mut grid = Grid::new();
    for result in rdr.records() {
        let record = result?;
        grid.push(record.iter().map(CellValue::from).collect());
    }
    Ok(grid)
}

/// Index of the first row (within `search_rows`) that starts with `expected`
pub fn find_header(grid: &[Vec<CellValue>], expected: &[String], search_rows: usize) -> Option<usize> {
    grid.iter().take(search_rows).position(|row| {
        row.len() >= expected.len()
            && row
                .iter()
                .zip(expected)
                .all(|(cell, label)| cell.to_text().trim() == label)
    })
}

/// Scrape account details from the rows above the table
///
/// Labels sit in the third column and values in the fourth.
pub fn extract_metadata(grid: &[Vec<CellValue>], search_rows: usize) -> AccountMetadata {
    let mut metadata = AccountMetadata::default();
    for row in grid.iter().take(search_rows) {
        if row.len() <= 3 {
            continue;
        }
        let label = row[2].to_text();
        let value = row[3].to_text().trim().to_string();
        if label.contains("Número de cuenta:") {
            metadata.account_number = Some(value);
        } else if label.contains("Titular:") {
            metadata.holder_name = Some(value);
        } else if label.contains("Fecha exportación:") {
            metadata.export_date = Some(value);
        }
    }
    metadata
}

/// Locate the header, build the raw rows and check the required columns
pub fn statement_from_grid(grid: Grid, config: &Config) -> Result<Statement> {
    let header_index = find_header(&grid, &config.expected_header, config.header_search_rows)
        .ok_or(Error::HeaderNotFound {
            searched_rows: config.header_search_rows,
        })?;
    info!(
        "Header found at row {} (index {})",
        header_index + 1,
        header_index
    );

    let metadata = extract_metadata(&grid, config.header_search_rows);
    if !metadata.is_empty() {
        debug!("Account metadata: {:?}", metadata);
    }

    let labels: Vec<String> = grid[header_index]
        .iter()
        .map(|cell| cell.to_text().trim().to_string())
        .collect();
    let columns: Vec<String> = labels.iter().filter(|l| !l.is_empty()).cloned().collect();
    debug!("Columns: {:?}", columns);

    let missing = config.columns.missing_required(&columns);
    if !missing.is_empty() {
        return Err(Error::MissingColumns(missing));
    }

    let rows = grid
        .into_iter()
        .skip(header_index + 1)
        .enumerate()
        .map(|(data_index, cells)| {
            let mut row = RawRow::new(header_index + 2 + data_index);
            for (label, cell) in labels.iter().zip(cells) {
                if !label.is_empty() {
                    row.cells.insert(label.clone(), cell);
                }
            }
            row
        })
        .collect();

    Ok(Statement {
        header_index,
        columns,
        rows,
        metadata,
    })
}
