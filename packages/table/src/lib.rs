#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tabular area datasets.
//!
//! Reads and writes the CSV tables exchanged between pipeline stages,
//! checks their columns before any processing, and joins temperature
//! and coverage rows on the area name.

pub mod join;

use std::io::{Read, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use urban_heat_area_models::{GreenCoverage, TemperatureReading};

pub use join::{AppliedMatches, apply_matches, inner_join, left_join_temperature};

/// Columns a temperature table must contain.
pub const TEMPERATURE_COLUMNS: &[&str] = &["area", "mean_temp_c"];

/// Columns a coverage table must contain.
pub const COVERAGE_COLUMNS: &[&str] = &["area", "green_area"];

/// Errors from reading, validating and writing tables.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// The table lacks required columns.
    #[error("Table '{table}' is missing required columns: {}", missing.join(", "))]
    Schema {
        /// Name of the offending table.
        table: String,
        /// Required columns that were not found.
        missing: Vec<String>,
    },

    /// CSV parsing or serialization error.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// Path or label of the table.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// I/O error opening or flushing a table.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Checks that every `required` column is present in `headers`.
///
/// Header names are compared after trimming whitespace.
///
/// # Errors
///
/// Returns [`TableError::Schema`] listing every missing column.
pub fn validate_columns<S: AsRef<str>>(
    table: &str,
    headers: &[S],
    required: &[&str],
) -> Result<(), TableError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|col| !headers.iter().any(|h| h.as_ref().trim() == **col))
        .map(|col| (*col).to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(TableError::Schema {
            table: table.to_string(),
            missing,
        })
    }
}

/// Reads a temperature table (`area`, optional `year`, `mean_temp_c`).
///
/// Empty `mean_temp_c` cells become `None`.
///
/// # Errors
///
/// Returns [`TableError::Schema`] if a required column is missing, or
/// [`TableError::Csv`] on malformed rows.
pub fn read_temperature(
    reader: impl Read,
    table: &str,
) -> Result<Vec<TemperatureReading>, TableError> {
    read_table(reader, table, TEMPERATURE_COLUMNS)
}

/// Reads a coverage table (`area`, `green_area`).
///
/// # Errors
///
/// Returns [`TableError::Schema`] if a required column is missing, or
/// [`TableError::Csv`] on malformed rows.
pub fn read_coverage(reader: impl Read, table: &str) -> Result<Vec<GreenCoverage>, TableError> {
    read_table(reader, table, COVERAGE_COLUMNS)
}

/// Reads a temperature table from disk.
///
/// # Errors
///
/// Returns [`TableError`] if the file cannot be opened or parsed.
pub fn read_temperature_csv(path: &Path) -> Result<Vec<TemperatureReading>, TableError> {
    read_temperature(open(path)?, &path.display().to_string())
}

/// Reads a coverage table from disk.
///
/// # Errors
///
/// Returns [`TableError`] if the file cannot be opened or parsed.
pub fn read_coverage_csv(path: &Path) -> Result<Vec<GreenCoverage>, TableError> {
    read_coverage(open(path)?, &path.display().to_string())
}

/// Writes rows as CSV with a header derived from the row type.
///
/// `None` fields are written as empty cells.
///
/// # Errors
///
/// Returns [`TableError`] if serialization or flushing fails.
pub fn write_rows<T: Serialize>(
    writer: impl Write,
    table: &str,
    rows: &[T],
) -> Result<(), TableError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row).map_err(|e| TableError::Csv {
            path: table.to_string(),
            source: e,
        })?;
    }
    csv_writer.flush().map_err(|e| TableError::Io {
        path: table.to_string(),
        source: e,
    })
}

/// Writes rows to a CSV file, creating or truncating it.
///
/// # Errors
///
/// Returns [`TableError`] if the file cannot be created or written.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), TableError> {
    let file = std::fs::File::create(path).map_err(|e| TableError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    write_rows(file, &path.display().to_string(), rows)?;
    log::info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Opens a table file for reading.
///
/// # Errors
///
/// Returns [`TableError::Io`] if the file cannot be opened.
pub fn open(path: &Path) -> Result<std::fs::File, TableError> {
    std::fs::File::open(path).map_err(|e| TableError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Reads rows of any shape after checking the `required` columns.
///
/// Columns not named by `T` are ignored.
///
/// # Errors
///
/// Returns [`TableError::Schema`] if a required column is missing, or
/// [`TableError::Csv`] on malformed rows.
pub fn read_table<T: DeserializeOwned>(
    reader: impl Read,
    table: &str,
    required: &[&str],
) -> Result<Vec<T>, TableError> {
    let csv_error = |e: csv::Error| TableError::Csv {
        path: table.to_string(),
        source: e,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(ToOwned::to_owned)
        .collect();
    validate_columns(table, &headers, required)?;

    let rows = reader
        .deserialize::<T>()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(csv_error)?;

    log::debug!("Read {} rows from {table}", rows.len());
    Ok(rows)
}
