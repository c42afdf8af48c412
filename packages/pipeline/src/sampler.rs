//! Offline land-surface temperature source.
//!
//! The satellite reducer normally runs as a remote service. Its per-area
//! summer means can also be exported once as a CSV (`area`, `year`,
//! `lst_raw`) and replayed through [`RawLstTable`].

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use urban_heat_spatial::AreaBoundary;
use urban_heat_table::TableError;
use urban_heat_temperature::{LstSampler, SummerWindow, TemperatureError};

/// Columns a raw LST export must contain.
pub const RAW_LST_COLUMNS: &[&str] = &["area", "year", "lst_raw"];

#[derive(Debug, Deserialize)]
struct RawLstRow {
    area: String,
    year: i32,
    lst_raw: Option<f64>,
}

/// Pre-computed mean raw LST per area and year.
///
/// The window's months are fixed at export time; lookups only use the
/// year.
#[derive(Debug, Clone, Default)]
pub struct RawLstTable {
    values: HashMap<(String, i32), f64>,
}

impl RawLstTable {
    /// Parses an export.
    ///
    /// Empty `lst_raw` cells are treated as missing data. If an area and
    /// year occur twice the first value is kept.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] if a column is missing or a row is malformed.
    pub fn from_reader(reader: impl Read, table: &str) -> Result<Self, TableError> {
        let rows: Vec<RawLstRow> = urban_heat_table::read_table(reader, table, RAW_LST_COLUMNS)?;

        let mut values = HashMap::with_capacity(rows.len());
        for row in rows {
            if let Some(raw) = row.lst_raw {
                values.entry((row.area, row.year)).or_insert(raw);
            }
        }

        Ok(Self { values })
    }

    /// Reads an export from disk.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] if the file cannot be opened or parsed.
    pub fn load(path: &Path) -> Result<Self, TableError> {
        Self::from_reader(urban_heat_table::open(path)?, &path.display().to_string())
    }

    /// Number of known area-year values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the table holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl LstSampler for RawLstTable {
    fn mean_raw_lst(
        &self,
        area: &AreaBoundary,
        window: &SummerWindow,
    ) -> Result<Option<f64>, TemperatureError> {
        Ok(self
            .values
            .get(&(area.name.clone(), window.year()))
            .copied())
    }
}
