#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record types shared across the urban heat toolchain.
//!
//! These are the plain rows that flow between stages: temperature
//! readings as delivered by the satellite reducer, per-area green
//! coverage, joined observations for the statistical comparison, and the
//! final priority table. None of them carry geometry; polygons live in
//! the spatial crate.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Category of a qualifying green-space feature.
///
/// Only used to decide whether a raw map feature counts as vegetation.
/// The category is discarded once the feature is accepted.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VegetationCategory {
    /// `leisure=park`
    Park,
    /// `leisure=garden`
    Garden,
    /// `landuse=forest`
    Forest,
    /// `landuse=grass`
    Grass,
    /// `landuse=meadow`
    Meadow,
}

impl VegetationCategory {
    /// Returns the map tag key under which this category is recorded.
    #[must_use]
    pub const fn tag_key(self) -> &'static str {
        match self {
            Self::Park | Self::Garden => "leisure",
            Self::Forest | Self::Grass | Self::Meadow => "landuse",
        }
    }

    /// Resolves a `key=value` tag pair to a category.
    ///
    /// Returns `None` when the value is unknown or recorded under the
    /// wrong key (`landuse=park` does not qualify).
    #[must_use]
    pub fn from_tag(key: &str, value: &str) -> Option<Self> {
        let category: Self = value.trim().parse().ok()?;
        (category.tag_key() == key).then_some(category)
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Park,
            Self::Garden,
            Self::Forest,
            Self::Grass,
            Self::Meadow,
        ]
    }
}

/// One temperature observation for an area, before name reconciliation.
///
/// Multi-year datasets carry one row per area per year; averaged tables
/// leave `year` empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    /// Area name as spelled by the temperature source.
    pub area: String,
    /// Observation year, absent in averaged tables.
    #[serde(default)]
    pub year: Option<i32>,
    /// Mean land-surface temperature in degrees Celsius, `None` when the
    /// reducer had no pixel coverage for the area.
    pub mean_temp_c: Option<f64>,
}

/// Mean temperature of an area averaged over all observed years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaTemperature {
    /// Area name.
    pub area: String,
    /// Mean temperature in degrees Celsius, `None` if every year was missing.
    pub mean_temp_c: Option<f64>,
}

impl From<TemperatureReading> for AreaTemperature {
    fn from(reading: TemperatureReading) -> Self {
        Self {
            area: reading.area,
            mean_temp_c: reading.mean_temp_c,
        }
    }
}

/// Fraction of an area covered by vegetation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreenCoverage {
    /// Canonical area name.
    pub area: String,
    /// Covered fraction, `0.0` when no vegetation intersects the area.
    pub green_area: f64,
}

/// An area with both a temperature and a coverage value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedObservation {
    /// Canonical area name.
    pub area: String,
    /// Mean temperature in degrees Celsius.
    pub mean_temp_c: f64,
    /// Green coverage fraction.
    pub green_area: f64,
}

/// One row of the final priority table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityRecord {
    /// Canonical area name.
    pub area: String,
    /// Mean temperature in degrees Celsius, if known.
    pub mean_temp_c: Option<f64>,
    /// Green coverage fraction.
    pub green_area: f64,
    /// Normalized planting priority, 1.0 is most urgent.
    pub priority_score: f64,
}

/// A foreign area name resolved to a canonical one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameMatch {
    /// Name as spelled by the foreign dataset.
    pub foreign: String,
    /// Canonical name it resolved to.
    pub canonical: String,
    /// Similarity score in `[0, 100]`.
    pub score: f64,
}

/// Result of reconciling a single foreign name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchOutcome {
    /// The best candidate scored above the threshold.
    Matched(NameMatch),
    /// No candidate scored above the threshold.
    Unmatched {
        /// Name as spelled by the foreign dataset.
        foreign: String,
        /// Best candidate that was rejected, if any candidates existed.
        best_candidate: Option<String>,
        /// Score of the rejected candidate.
        best_score: Option<f64>,
    },
}

impl MatchOutcome {
    /// Returns the foreign name this outcome belongs to.
    #[must_use]
    pub fn foreign(&self) -> &str {
        match self {
            Self::Matched(m) => &m.foreign,
            Self::Unmatched { foreign, .. } => foreign,
        }
    }

    /// Returns the canonical name if the foreign name was matched.
    #[must_use]
    pub fn canonical(&self) -> Option<&str> {
        match self {
            Self::Matched(m) => Some(&m.canonical),
            Self::Unmatched { .. } => None,
        }
    }

    /// Returns the score of the best candidate, accepted or not.
    #[must_use]
    pub const fn score(&self) -> Option<f64> {
        match self {
            Self::Matched(m) => Some(m.score),
            Self::Unmatched { best_score, .. } => *best_score,
        }
    }

    /// Whether the name resolved to a canonical area.
    #[must_use]
    pub const fn is_matched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }
}

/// Descriptive statistics for one group of temperatures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Number of observations.
    pub n: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator).
    pub std_dev: f64,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
}

/// Outcome of Welch's unequal-variance t-test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WelchTestResult {
    /// The t statistic (first group minus second group).
    pub statistic: f64,
    /// Welch-Satterthwaite degrees of freedom.
    pub degrees_of_freedom: f64,
    /// Two-sided p-value.
    pub p_value: f64,
}

/// Outcome of a Spearman rank correlation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpearmanResult {
    /// Rank correlation coefficient in `[-1, 1]`.
    pub rho: f64,
    /// Two-sided p-value.
    pub p_value: f64,
    /// Number of paired observations.
    pub n: usize,
}

/// Full comparison of temperature between low- and high-coverage areas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Median green coverage used to split the groups.
    pub median_green: f64,
    /// Temperatures of areas with coverage below the median.
    pub low_green: GroupSummary,
    /// Temperatures of areas with coverage at or above the median.
    pub high_green: GroupSummary,
    /// Low-vs-high mean comparison.
    pub t_test: WelchTestResult,
    /// Coverage-vs-temperature rank correlation.
    pub correlation: SpearmanResult,
}
