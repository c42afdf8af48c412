#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-area summer land-surface temperature.
//!
//! The satellite reduction itself (averaging every 8-day LST composite
//! over an area polygon) is an external service behind [`LstSampler`].
//! This crate turns its raw digital numbers into degrees Celsius, builds
//! the per-area-per-year table, and averages it across years.

use std::collections::BTreeMap;

use serde::Serialize;
use urban_heat_area_models::{AreaTemperature, TemperatureReading};
use urban_heat_spatial::AreaBoundary;

/// Scale factor of the LST digital number (Kelvin per DN).
pub const LST_SCALE: f64 = 0.02;

/// Offset between Kelvin and degrees Celsius.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Errors that can occur while reducing temperatures.
#[derive(Debug, thiserror::Error)]
pub enum TemperatureError {
    /// The external sampler failed for an area.
    #[error("Sampler failed for '{area}' in {year}: {message}")]
    Sampler {
        /// Area being sampled.
        area: String,
        /// Year being sampled.
        year: i32,
        /// Description of the failure.
        message: String,
    },

    /// The requested season is not a valid month range.
    #[error("Invalid season: {message}")]
    InvalidWindow {
        /// Description of what went wrong.
        message: String,
    },
}

/// Converts a raw LST digital number to degrees Celsius.
#[must_use]
pub fn kelvin_dn_to_celsius(raw: f64) -> f64 {
    raw.mul_add(LST_SCALE, -KELVIN_OFFSET)
}

/// The months of one year over which temperatures are averaged.
/// Only constructible through [`SummerWindow::new`], so `months` is never
/// empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummerWindow {
    year: i32,
    months: Vec<u32>,
}

impl SummerWindow {
    /// Creates a window after validating the months.
    ///
    /// # Errors
    ///
    /// Returns [`TemperatureError::InvalidWindow`] if `months` is empty or
    /// contains a value outside 1-12.
    pub fn new(year: i32, months: &[u32]) -> Result<Self, TemperatureError> {
        if months.is_empty() {
            return Err(TemperatureError::InvalidWindow {
                message: "no months given".to_string(),
            });
        }
        if let Some(bad) = months.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(TemperatureError::InvalidWindow {
                message: format!("month {bad} out of range (1-12)"),
            });
        }

        let mut months = months.to_vec();
        months.sort_unstable();
        months.dedup();
        Ok(Self { year, months })
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Months (1-12), ascending and without duplicates. Never empty.
    #[must_use]
    pub fn months(&self) -> &[u32] {
        &self.months
    }

    /// First day of the window, `YYYY-MM-DD`.
    #[must_use]
    pub fn start_date(&self) -> String {
        format!("{}-{:02}-01", self.year, self.months[0])
    }

    /// Last day of the window, `YYYY-MM-DD`.
    #[must_use]
    pub fn end_date(&self) -> String {
        let last = self.months[self.months.len() - 1];
        format!(
            "{}-{last:02}-{:02}",
            self.year,
            days_in_month(self.year, last)
        )
    }
}

const fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// External reducer returning the mean raw LST of an area over a window.
///
/// The area geometry is geographic (WGS84 longitude/latitude), the frame
/// satellite reducers take. `Ok(None)` means the area had no valid
/// pixels in the window; it is recorded as a gap, not an error.
pub trait LstSampler {
    /// Mean raw LST digital number over `area` during `window`.
    ///
    /// # Errors
    ///
    /// Returns [`TemperatureError`] if the reduction could not run.
    fn mean_raw_lst(
        &self,
        area: &AreaBoundary,
        window: &SummerWindow,
    ) -> Result<Option<f64>, TemperatureError>;
}

/// Samples every area for every year.
///
/// `areas` must be geographic, see [`LstSampler`].
///
/// Produces one reading per area per year, years in the given order and
/// areas in input order within each year. Missing values are kept as
/// `None`.
///
/// # Errors
///
/// Returns [`TemperatureError`] if a window is invalid or the sampler
/// fails.
pub fn collect_yearly_readings<S: LstSampler + ?Sized>(
    areas: &[AreaBoundary],
    years: &[i32],
    months: &[u32],
    sampler: &S,
) -> Result<Vec<TemperatureReading>, TemperatureError> {
    let mut readings = Vec::with_capacity(areas.len() * years.len());

    for &year in years {
        let window = SummerWindow::new(year, months)?;
        log::info!(
            "Sampling {} areas for {} to {}",
            areas.len(),
            window.start_date(),
            window.end_date()
        );

        for area in areas {
            let mean_temp_c = sampler.mean_raw_lst(area, &window)?.map(kelvin_dn_to_celsius);
            match mean_temp_c {
                Some(temp) => log::debug!("{year} - {}: {temp:.2} °C", area.name),
                None => log::debug!("{year} - {}: no data", area.name),
            }
            readings.push(TemperatureReading {
                area: area.name.clone(),
                year: Some(year),
                mean_temp_c,
            });
        }
    }

    Ok(readings)
}

/// Averages readings per area across years.
///
/// Null readings are skipped; an area whose every reading is null keeps
/// a null mean. Output is sorted by area name.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn average_by_area(readings: &[TemperatureReading]) -> Vec<AreaTemperature> {
    let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();

    for reading in readings {
        let entry = sums.entry(reading.area.as_str()).or_insert((0.0, 0));
        if let Some(temp) = reading.mean_temp_c.filter(|t| t.is_finite()) {
            entry.0 += temp;
            entry.1 += 1;
        }
    }

    sums.into_iter()
        .map(|(area, (sum, count))| {
            if count == 0 {
                log::debug!("{area}: no temperature in any year");
            }
            AreaTemperature {
                area: area.to_string(),
                mean_temp_c: (count > 0).then(|| sum / count as f64),
            }
        })
        .collect()
}

/// Selects the readings of a single year.
#[must_use]
pub fn readings_for_year(readings: &[TemperatureReading], year: i32) -> Vec<AreaTemperature> {
    readings
        .iter()
        .filter(|r| r.year == Some(year))
        .cloned()
        .map(AreaTemperature::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use geo::MultiPolygon;

    use super::*;

    struct TableSampler(BTreeMap<(String, i32), f64>);

    impl LstSampler for TableSampler {
        fn mean_raw_lst(
            &self,
            area: &AreaBoundary,
            window: &SummerWindow,
        ) -> Result<Option<f64>, TemperatureError> {
            Ok(self.0.get(&(area.name.clone(), window.year())).copied())
        }
    }

    struct FailingSampler;

    impl LstSampler for FailingSampler {
        fn mean_raw_lst(
            &self,
            area: &AreaBoundary,
            window: &SummerWindow,
        ) -> Result<Option<f64>, TemperatureError> {
            Err(TemperatureError::Sampler {
                area: area.name.clone(),
                year: window.year(),
                message: "quota exceeded".to_string(),
            })
        }
    }

    fn area(name: &str) -> AreaBoundary {
        AreaBoundary {
            name: name.to_string(),
            geometry: MultiPolygon::new(vec![]),
        }
    }

    fn reading(area: &str, year: i32, temp: Option<f64>) -> TemperatureReading {
        TemperatureReading {
            area: area.to_string(),
            year: Some(year),
            mean_temp_c: temp,
        }
    }

    #[test]
    fn converts_digital_number() {
        // 15000 DN = 300 K
        assert!((kelvin_dn_to_celsius(15_000.0) - 26.85).abs() < 1e-9);
        assert!((kelvin_dn_to_celsius(13_657.5) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn summer_window_dates() {
        let window = SummerWindow::new(2020, &[8, 6, 7]).unwrap();
        assert_eq!(window.months(), &[6, 7, 8]);
        assert_eq!(window.year(), 2020);
        assert_eq!(window.start_date(), "2020-06-01");
        assert_eq!(window.end_date(), "2020-08-31");

        assert_eq!(SummerWindow::new(2024, &[1, 2]).unwrap().end_date(), "2024-02-29");
        assert_eq!(SummerWindow::new(2023, &[2]).unwrap().end_date(), "2023-02-28");
    }

    #[test]
    fn rejects_invalid_windows() {
        assert!(SummerWindow::new(2020, &[]).is_err());
        assert!(SummerWindow::new(2020, &[6, 13]).is_err());
        assert!(SummerWindow::new(2020, &[0]).is_err());
    }

    #[test]
    fn dates_come_from_normalized_months() {
        let window = SummerWindow::new(2021, &[7, 7, 6]).unwrap();
        assert_eq!(window.months(), &[6, 7]);
        assert_eq!(window.start_date(), "2021-06-01");
        assert_eq!(window.end_date(), "2021-07-31");
    }

    #[test]
    fn yearly_readings_keep_gaps() {
        let mut table = BTreeMap::new();
        table.insert(("Mitte".to_string(), 2020), 15_000.0);
        table.insert(("Mitte".to_string(), 2021), 15_050.0);
        table.insert(("Spandau".to_string(), 2021), 14_950.0);
        let sampler = TableSampler(table);

        let readings =
            collect_yearly_readings(&[area("Mitte"), area("Spandau")], &[2020, 2021], &[6, 7, 8], &sampler)
                .unwrap();

        assert_eq!(readings.len(), 4);
        assert_eq!(readings[0].area, "Mitte");
        assert_eq!(readings[0].year, Some(2020));
        assert_eq!(readings[1], reading("Spandau", 2020, None));
        assert!((readings[3].mean_temp_c.unwrap() - 25.85).abs() < 1e-9);
    }

    #[test]
    fn sampler_failure_propagates() {
        let result = collect_yearly_readings(&[area("Mitte")], &[2020], &[6], &FailingSampler);
        assert!(matches!(result, Err(TemperatureError::Sampler { year: 2020, .. })));
    }

    #[test]
    fn averages_skip_nulls() {
        let readings = vec![
            reading("Spandau", 2020, Some(20.0)),
            reading("Mitte", 2020, Some(30.0)),
            reading("Mitte", 2021, None),
            reading("Mitte", 2022, Some(32.0)),
            reading("Spandau", 2021, Some(22.0)),
            reading("Tegel", 2020, None),
        ];

        let averaged = average_by_area(&readings);
        assert_eq!(
            averaged,
            vec![
                AreaTemperature {
                    area: "Mitte".to_string(),
                    mean_temp_c: Some(31.0)
                },
                AreaTemperature {
                    area: "Spandau".to_string(),
                    mean_temp_c: Some(21.0)
                },
                AreaTemperature {
                    area: "Tegel".to_string(),
                    mean_temp_c: None
                },
            ]
        );
    }

    #[test]
    fn selects_single_year() {
        let readings = vec![
            reading("Mitte", 2020, Some(30.0)),
            reading("Mitte", 2021, Some(31.0)),
            reading("Spandau", 2020, None),
        ];
        let year = readings_for_year(&readings, 2020);
        assert_eq!(year.len(), 2);
        assert_eq!(year[1].mean_temp_c, None);
        assert!(readings_for_year(&readings, 2019).is_empty());
    }
}
