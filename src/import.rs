//! CSV import tables
//!
//! Stock and item imports share the same table shape: a header row naming the
//! columns, then one row per part or item. Rows are surfaced as string maps;
//! the commands validate every row before applying any of them, reporting
//! errors with their spreadsheet-style row number (header = row 1).

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read import file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse import file: {0}")]
    Csv(#[from] csv::Error),

    #[error("'{0}' column is missing")]
    MissingColumn(String),

    #[error("reserved column name: '{0}'")]
    ReservedColumn(String),
}

/// One imported row: column name -> raw cell text, empty cells omitted.
pub type Row = BTreeMap<String, String>;

/// An imported table with its header list and data rows.
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    /// Read a CSV file, requiring the named columns and rejecting reserved
    /// ones.
    pub fn read(
        path: &Path,
        required: &[&str],
        reserved: &[&str],
    ) -> Result<Self, ImportError> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        for column in required {
            if !headers.iter().any(|h| h == column) {
                return Err(ImportError::MissingColumn(column.to_string()));
            }
        }
        for column in reserved {
            if headers.iter().any(|h| h == column) {
                return Err(ImportError::ReservedColumn(column.to_string()));
            }
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row = Row::new();
            for (header, cell) in headers.iter().zip(record.iter()) {
                let cell = cell.trim();
                if !cell.is_empty() {
                    row.insert(header.clone(), cell.to_string());
                }
            }
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    /// Spreadsheet-style row number of a data row index (header = row 1).
    pub fn row_number(index: usize) -> usize {
        index + 2
    }
}
