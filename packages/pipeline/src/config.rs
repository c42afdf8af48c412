//! Run configuration.
//!
//! Every run parameter lives in a TOML file. Missing keys fall back to
//! the Berlin defaults below.

use std::path::Path;

use serde::{Deserialize, Serialize};
use urban_heat_priority::ScoringMethod;
use urban_heat_reconcile::{DEFAULT_MATCH_THRESHOLD, MatchOptions, Scorer};
use urban_heat_spatial::study_area::DEFAULT_OUTSIDE_TOLERANCE;
use urban_heat_spatial::{OverlapPolicy, UtmZone};
use urban_heat_statistics::DEFAULT_ALPHA;

/// Errors from loading or validating a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// Path to the configuration file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for a [`RunConfig`].
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is outside its allowed range.
    #[error("Invalid configuration value for '{field}': {message}")]
    Invalid {
        /// Offending key.
        field: &'static str,
        /// Description of what went wrong.
        message: String,
    },
}

/// Parameters of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Place name handed to the boundary and vegetation providers.
    pub reference_place: String,
    /// Name of the city-level boundary, excluded from the study areas.
    pub city_area_name: String,
    /// Years of satellite data to average.
    pub years: Vec<i32>,
    /// Months (1-12) forming the summer window of each year.
    pub summer_months: Vec<u32>,
    /// Name matches must score strictly above this, in `[0, 100]`.
    pub match_threshold: f64,
    /// Similarity function for name reconciliation.
    pub scorer: Scorer,
    /// Handling of overlapping vegetation polygons.
    pub overlap_policy: OverlapPolicy,
    /// Fraction of an area allowed outside the city outline.
    pub study_area_tolerance: f64,
    /// `GeoJSON` property holding the area name.
    pub boundary_name_property: String,
    /// Raw priority formula.
    pub scoring_method: ScoringMethod,
    /// Significance level for the statistical comparison.
    pub alpha: f64,
    /// Planar frame for area arithmetic.
    pub projected_crs: UtmZone,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            reference_place: "Berlin, Germany".to_string(),
            city_area_name: "Berlin".to_string(),
            years: (2020..=2024).collect(),
            summer_months: vec![6, 7, 8],
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            scorer: Scorer::default(),
            overlap_policy: OverlapPolicy::default(),
            study_area_tolerance: DEFAULT_OUTSIDE_TOLERANCE,
            boundary_name_property: "name".to_string(),
            scoring_method: ScoringMethod::default(),
            alpha: DEFAULT_ALPHA,
            projected_crs: UtmZone::default(),
        }
    }
}

impl RunConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the document does not parse or a value
    /// is out of range.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::de::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, does not parse
    /// or a value is out of range.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Checks every value against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, message: String| -> Result<(), ConfigError> {
            Err(ConfigError::Invalid { field, message })
        };

        if !(0.0..=100.0).contains(&self.match_threshold) {
            return invalid(
                "match_threshold",
                format!("{} is outside [0, 100]", self.match_threshold),
            );
        }
        if !(1..=60).contains(&self.projected_crs.zone) {
            return invalid(
                "projected_crs.zone",
                format!("{} is outside 1-60", self.projected_crs.zone),
            );
        }
        if self.years.is_empty() {
            return invalid("years", "at least one year is required".to_string());
        }
        if self.summer_months.is_empty() {
            return invalid("summer_months", "at least one month is required".to_string());
        }
        if let Some(month) = self.summer_months.iter().find(|m| !(1..=12).contains(*m)) {
            return invalid("summer_months", format!("{month} is outside 1-12"));
        }
        if !(0.0..1.0).contains(&self.study_area_tolerance) {
            return invalid(
                "study_area_tolerance",
                format!("{} is outside [0, 1)", self.study_area_tolerance),
            );
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return invalid("alpha", format!("{} is outside (0, 1)", self.alpha));
        }
        if self.boundary_name_property.trim().is_empty() {
            return invalid("boundary_name_property", "must not be empty".to_string());
        }

        Ok(())
    }

    /// Name matching options derived from this configuration.
    #[must_use]
    pub const fn match_options(&self) -> MatchOptions {
        MatchOptions {
            scorer: self.scorer,
            threshold: self.match_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = RunConfig::from_toml_str("").unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.years, vec![2020, 2021, 2022, 2023, 2024]);
        assert_eq!(config.projected_crs.to_string(), "UTM 33N");
    }

    #[test]
    fn full_document() {
        let config = RunConfig::from_toml_str(
            r#"
            reference_place = "Hamburg, Germany"
            city_area_name = "Hamburg"
            years = [2022, 2023]
            summer_months = [7, 8]
            match_threshold = 85.0
            scorer = "token_sort_ratio"
            overlap_policy = "union_before_sum"
            study_area_tolerance = 0.01
            boundary_name_property = "bezirk"
            scoring_method = "legacy"
            alpha = 0.01

            [projected_crs]
            zone = 32
            north = true
            "#,
        )
        .unwrap();

        assert_eq!(config.city_area_name, "Hamburg");
        assert_eq!(config.scorer, Scorer::TokenSortRatio);
        assert_eq!(config.overlap_policy, OverlapPolicy::UnionBeforeSum);
        assert_eq!(config.scoring_method, ScoringMethod::Legacy);
        assert_eq!(config.projected_crs.zone, 32);
        assert_eq!(config.match_options().threshold, 85.0);
    }

    #[test]
    fn rejects_out_of_range_values() {
        for (toml_str, field) in [
            ("match_threshold = 120.0", "match_threshold"),
            ("years = []", "years"),
            ("summer_months = [6, 13]", "summer_months"),
            ("study_area_tolerance = 1.0", "study_area_tolerance"),
            ("alpha = 0.0", "alpha"),
            ("[projected_crs]\nzone = 61\nnorth = true", "projected_crs.zone"),
        ] {
            match RunConfig::from_toml_str(toml_str) {
                Err(ConfigError::Invalid { field: f, .. }) => assert_eq!(f, field, "{toml_str}"),
                other => panic!("{toml_str}: expected invalid '{field}', got {other:?}"),
            }
        }
    }

    #[test]
    fn unknown_scorer_is_a_parse_error() {
        assert!(matches!(
            RunConfig::from_toml_str(r#"scorer = "levenshtein""#),
            Err(ConfigError::Parse(_))
        ));
    }
}
