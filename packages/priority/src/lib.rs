#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tree-planting priority.
//!
//! Combines each area's mean temperature and green coverage into a single
//! score in `[0, 1]`. Areas hotter than the city-wide baseline with little
//! vegetation score highest. Areas at or below the baseline, or without a
//! temperature, get a fixed floor before normalization.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use urban_heat_area_models::PriorityRecord;

/// Raw score given to areas at or below the baseline temperature.
pub const FLOOR_SCORE: f64 = 1.0;

/// How raw scores are derived.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScoringMethod {
    /// Excess over the baseline weighted by missing green, floored and
    /// normalized to `[0, 1]`.
    #[default]
    Baseline,
    /// Unnormalized `temperature * (1 - green)`. Areas without a
    /// temperature score `0.0`.
    Legacy,
}

/// Scored priority table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityOutcome {
    /// Input rows with `priority_score` filled in, in input order.
    pub records: Vec<PriorityRecord>,
    /// Mean of the known temperatures, `None` if there were none.
    pub baseline_temp: Option<f64>,
    /// No area scored above zero, so every score was forced to `0.0`.
    pub degenerate: bool,
}

/// Mean of all known, finite temperatures.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn baseline_temperature(records: &[PriorityRecord]) -> Option<f64> {
    let (sum, count) = records
        .iter()
        .filter_map(|r| r.mean_temp_c)
        .filter(|t| t.is_finite())
        .fold((0.0, 0_usize), |(sum, count), t| (sum + t, count + 1));

    (count > 0).then(|| sum / count as f64)
}

/// Unnormalized score of one area.
///
/// Missing temperature, missing baseline, or a temperature at or below
/// the baseline all yield [`FLOOR_SCORE`]. Coverage above 1.0, from
/// double-counted overlapping vegetation, counts as fully green.
#[must_use]
pub fn raw_score(mean_temp_c: Option<f64>, green_area: f64, baseline: Option<f64>) -> f64 {
    match (mean_temp_c, baseline) {
        (Some(temp), Some(baseline)) if temp > baseline => {
            (temp - baseline) * (1.0 - green_area.clamp(0.0, 1.0))
        }
        _ => FLOOR_SCORE,
    }
}

/// Scores every area.
pub fn score_priorities(records: Vec<PriorityRecord>, method: ScoringMethod) -> PriorityOutcome {
    match method {
        ScoringMethod::Baseline => score_against_baseline(records),
        ScoringMethod::Legacy => score_legacy(records),
    }
}

fn score_against_baseline(records: Vec<PriorityRecord>) -> PriorityOutcome {
    let baseline_temp = baseline_temperature(&records);
    match baseline_temp {
        Some(baseline) => log::info!("Baseline temperature: {baseline:.2} °C"),
        None => log::warn!("No area has a temperature, every area gets the floor score"),
    }

    let raw: Vec<f64> = records
        .iter()
        .map(|r| raw_score(r.mean_temp_c, r.green_area, baseline_temp))
        .collect();

    let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let degenerate = !records.is_empty() && !(max.is_finite() && max > 0.0);
    if degenerate {
        log::warn!("Maximum raw priority score is {max}, forcing every score to 0");
    }

    let records = records
        .into_iter()
        .zip(raw)
        .map(|(record, raw)| PriorityRecord {
            priority_score: if degenerate { 0.0 } else { raw / max },
            ..record
        })
        .collect();

    PriorityOutcome {
        records,
        baseline_temp,
        degenerate,
    }
}

fn score_legacy(records: Vec<PriorityRecord>) -> PriorityOutcome {
    let baseline_temp = baseline_temperature(&records);
    let records = records
        .into_iter()
        .map(|record| PriorityRecord {
            priority_score: record
                .mean_temp_c
                .map_or(0.0, |temp| temp * (1.0 - record.green_area.clamp(0.0, 1.0))),
            ..record
        })
        .collect();

    PriorityOutcome {
        records,
        baseline_temp,
        degenerate: false,
    }
}

/// Sorts records by descending priority. Ties keep their input order.
pub fn rank_by_priority(records: &mut [PriorityRecord]) {
    records.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));
}
