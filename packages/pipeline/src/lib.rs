#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! End-to-end urban heat priority pipeline.
//!
//! Wires the stages together:
//!
//! 1. Load area boundaries, keep those inside the city, project them.
//! 2. Compute green coverage per area.
//! 3. Reconcile temperature area names against the boundary names and
//!    average them per area.
//! 4. Left-join temperatures onto coverage and score priorities.
//! 5. Independently, compare temperatures of low- and high-green areas.
//!
//! Every stage is also callable on its own, which is how the CLI
//! subcommands use them.

pub mod config;
pub mod export;
pub mod sampler;

use std::path::Path;

use urban_heat_area_models::{
    AreaTemperature, ComparisonReport, GreenCoverage, MatchOutcome, TemperatureReading,
};
use urban_heat_priority::PriorityOutcome;
use urban_heat_reconcile::MatchSummary;
use urban_heat_spatial::progress::ProgressCallback;
use urban_heat_spatial::study_area::filter_study_areas;
use urban_heat_spatial::{AreaBoundary, GeometryEngine, PlanarEngine, SpatialError};
use urban_heat_statistics::{ClassicalStatistics, StatisticsError};
use urban_heat_table::TableError;
use urban_heat_temperature::{LstSampler, TemperatureError};

pub use config::{ConfigError, RunConfig};

/// Errors that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Geometry loading or projection failed.
    #[error(transparent)]
    Spatial(#[from] SpatialError),

    /// A table was malformed or could not be read or written.
    #[error(transparent)]
    Table(#[from] TableError),

    /// Temperature reduction failed.
    #[error(transparent)]
    Temperature(#[from] TemperatureError),

    /// The statistical comparison was impossible.
    #[error(transparent)]
    Statistics(#[from] StatisticsError),

    /// Reading or writing a file failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Nothing left to work with after a stage.
    #[error("No areas left after {stage}")]
    NoAreas {
        /// Stage that removed the last area.
        stage: &'static str,
    },
}

/// Raw inputs of a full run.
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    /// Boundary `GeoJSON` document.
    pub boundaries: String,
    /// Vegetation `GeoJSON` document.
    pub vegetation: String,
    /// Optional city outline `GeoJSON` document.
    pub outline: Option<String>,
    /// Temperature rows with provider spellings of the area names.
    pub temperatures: Vec<TemperatureReading>,
}

/// Results of a full run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Study areas in the planar frame.
    pub areas: Vec<AreaBoundary>,
    /// Green coverage per study area.
    pub coverage: Vec<GreenCoverage>,
    /// Per-foreign-name reconciliation results.
    pub matches: Vec<MatchOutcome>,
    /// Reconciled per-area temperatures.
    pub temperatures: Vec<AreaTemperature>,
    /// Scored priority table.
    pub priority: PriorityOutcome,
    /// Low- vs. high-green comparison, if the data allowed one.
    pub comparison: Option<ComparisonReport>,
}

/// Reads a text file with path context on failure.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] if the file cannot be read.
pub fn read_text(path: &Path) -> Result<String, PipelineError> {
    std::fs::read_to_string(path).map_err(|e| PipelineError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Writes a text file with path context on failure.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] if the file cannot be written.
pub fn write_text(path: &Path, contents: &str) -> Result<(), PipelineError> {
    std::fs::write(path, contents).map_err(|e| PipelineError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

/// Builds the geometry engine for a configuration.
#[must_use]
pub const fn engine_for(config: &RunConfig) -> PlanarEngine {
    PlanarEngine::new(config.projected_crs)
}

/// Loads boundaries and returns the study areas in the planar frame.
///
/// With an outline, only areas inside it are kept. Without one, only
/// the city-level polygon itself is dropped.
///
/// # Errors
///
/// Returns [`PipelineError`] if a document is invalid, a geometry cannot
/// be projected, or no study area remains.
pub fn prepare_areas<E: GeometryEngine + ?Sized>(
    config: &RunConfig,
    boundaries_geojson: &str,
    outline_geojson: Option<&str>,
    engine: &E,
) -> Result<Vec<AreaBoundary>, PipelineError> {
    let boundaries =
        urban_heat_spatial::load_boundaries(boundaries_geojson, &config.boundary_name_property)?;
    let planar = boundaries
        .iter()
        .map(|area| area.to_planar(engine))
        .collect::<Result<Vec<_>, _>>()?;

    let areas = match outline_geojson {
        Some(outline) => {
            let outline = engine.to_planar(&urban_heat_spatial::load_outline(outline)?)?;
            filter_study_areas(
                planar,
                &outline,
                &config.city_area_name,
                config.study_area_tolerance,
                engine,
            )
        }
        None => planar
            .into_iter()
            .filter(|area| area.name != config.city_area_name)
            .collect(),
    };

    if areas.is_empty() {
        return Err(PipelineError::NoAreas {
            stage: "study area selection",
        });
    }
    Ok(areas)
}

/// Computes green coverage of planar study areas.
///
/// # Errors
///
/// Returns [`PipelineError`] if the vegetation document is invalid or a
/// geometry cannot be projected.
pub fn coverage_stage<E: GeometryEngine + ?Sized>(
    config: &RunConfig,
    areas: &[AreaBoundary],
    vegetation_geojson: &str,
    engine: &E,
    progress: &dyn ProgressCallback,
) -> Result<Vec<GreenCoverage>, PipelineError> {
    let vegetation = urban_heat_spatial::load_vegetation(vegetation_geojson)?
        .iter()
        .map(|feature| feature.to_planar(engine))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(urban_heat_spatial::compute_coverage(
        areas,
        &vegetation,
        config.overlap_policy,
        engine,
        progress,
    ))
}

/// Samples yearly temperatures of planar study areas.
///
/// The sampler receives WGS84 copies of the areas.
///
/// # Errors
///
/// Returns [`PipelineError`] if an area cannot be unprojected, a window
/// is invalid or the sampler fails.
pub fn temperature_stage<E: GeometryEngine + ?Sized, S: LstSampler + ?Sized>(
    config: &RunConfig,
    areas: &[AreaBoundary],
    engine: &E,
    sampler: &S,
) -> Result<Vec<TemperatureReading>, PipelineError> {
    let geographic = areas
        .iter()
        .map(|area| area.to_geographic(engine))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(urban_heat_temperature::collect_yearly_readings(
        &geographic,
        &config.years,
        &config.summer_months,
        sampler,
    )?)
}

/// Reconciles temperature rows against canonical area names.
///
/// Unmatched rows are dropped. Multi-year rows are averaged per area;
/// single-value tables keep the first row per area.
#[must_use]
pub fn reconcile_temperatures<C: AsRef<str>>(
    config: &RunConfig,
    readings: Vec<TemperatureReading>,
    canonical: &[C],
) -> (Vec<AreaTemperature>, Vec<MatchOutcome>) {
    let mut foreign: Vec<&str> = Vec::new();
    for reading in &readings {
        if !foreign.contains(&reading.area.as_str()) {
            foreign.push(&reading.area);
        }
    }

    let outcomes = urban_heat_reconcile::reconcile(&foreign, canonical, &config.match_options());
    MatchSummary::from_outcomes(&outcomes).log();

    let applied = urban_heat_table::apply_matches(readings, &outcomes);
    (collapse_years(applied.readings), outcomes)
}

/// Reduces a temperature table to one value per area.
///
/// Tables with a `year` column are averaged per area; single-value
/// tables are passed through in their own order.
#[must_use]
pub fn collapse_years(readings: Vec<TemperatureReading>) -> Vec<AreaTemperature> {
    if readings.iter().any(|r| r.year.is_some()) {
        urban_heat_temperature::average_by_area(&readings)
    } else {
        readings.into_iter().map(AreaTemperature::from).collect()
    }
}

/// Joins temperatures onto coverage and scores every area.
#[must_use]
pub fn priority_stage(
    config: &RunConfig,
    coverage: &[GreenCoverage],
    temperatures: &[AreaTemperature],
) -> PriorityOutcome {
    let joined = urban_heat_table::left_join_temperature(coverage, temperatures);
    urban_heat_priority::score_priorities(joined, config.scoring_method)
}

/// Runs the statistical comparison on the inner join.
///
/// # Errors
///
/// Returns [`PipelineError::Statistics`] if a group is empty or too
/// small, or the data is degenerate.
pub fn comparison_stage(
    coverage: &[GreenCoverage],
    temperatures: &[AreaTemperature],
) -> Result<ComparisonReport, PipelineError> {
    let joined = urban_heat_table::inner_join(temperatures, coverage);
    Ok(urban_heat_statistics::compare(&joined, &ClassicalStatistics)?)
}

/// Runs every stage.
///
/// A failed comparison is logged and reported as `None`; every other
/// failure aborts the run.
///
/// # Errors
///
/// Returns [`PipelineError`] if loading, projection or any table stage
/// fails.
pub fn run<E: GeometryEngine + ?Sized>(
    config: &RunConfig,
    inputs: PipelineInputs,
    engine: &E,
    progress: &dyn ProgressCallback,
) -> Result<PipelineOutput, PipelineError> {
    config.validate()?;
    log::info!(
        "Running urban heat pipeline for {} in {}",
        config.reference_place,
        config.projected_crs
    );

    let areas = prepare_areas(config, &inputs.boundaries, inputs.outline.as_deref(), engine)?;
    let coverage = coverage_stage(config, &areas, &inputs.vegetation, engine, progress)?;

    let names: Vec<&str> = areas.iter().map(|a| a.name.as_str()).collect();
    let (temperatures, matches) = reconcile_temperatures(config, inputs.temperatures, &names);

    let priority = priority_stage(config, &coverage, &temperatures);

    let comparison = match comparison_stage(&coverage, &temperatures) {
        Ok(report) => Some(report),
        Err(e) => {
            log::error!("Statistical comparison skipped: {e}");
            None
        }
    };

    Ok(PipelineOutput {
        areas,
        coverage,
        matches,
        temperatures,
        priority,
        comparison,
    })
}

#[cfg(test)]
mod tests {
    use urban_heat_spatial::progress::NullProgress;

    use super::*;

    // Four 0.01 x 0.01 degree cells in a row near Berlin.
    const BOUNDARIES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "properties": { "name": "Mitte" },
              "geometry": { "type": "Polygon", "coordinates": [[[13.40,52.50],[13.41,52.50],[13.41,52.51],[13.40,52.51],[13.40,52.50]]] } },
            { "type": "Feature", "properties": { "name": "Charlottenburg-Wilmersdorf" },
              "geometry": { "type": "Polygon", "coordinates": [[[13.41,52.50],[13.42,52.50],[13.42,52.51],[13.41,52.51],[13.41,52.50]]] } },
            { "type": "Feature", "properties": { "name": "Neukölln" },
              "geometry": { "type": "Polygon", "coordinates": [[[13.42,52.50],[13.43,52.50],[13.43,52.51],[13.42,52.51],[13.42,52.50]]] } },
            { "type": "Feature", "properties": { "name": "Spandau" },
              "geometry": { "type": "Polygon", "coordinates": [[[13.43,52.50],[13.44,52.50],[13.44,52.51],[13.43,52.51],[13.43,52.50]]] } },
            { "type": "Feature", "properties": { "name": "Potsdam" },
              "geometry": { "type": "Polygon", "coordinates": [[[13.44,52.50],[13.46,52.50],[13.46,52.51],[13.44,52.51],[13.44,52.50]]] } },
            { "type": "Feature", "properties": { "name": "Berlin" },
              "geometry": { "type": "Polygon", "coordinates": [[[13.40,52.50],[13.44,52.50],[13.44,52.51],[13.40,52.51],[13.40,52.50]]] } }
        ]
    }"#;

    const OUTLINE: &str = r#"{ "type": "Polygon",
        "coordinates": [[[13.40,52.50],[13.44,52.50],[13.44,52.51],[13.40,52.51],[13.40,52.50]]] }"#;

    // A park covering the western half of Mitte and a forest covering
    // all of Spandau.
    const VEGETATION: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "properties": { "leisure": "park" },
              "geometry": { "type": "Polygon", "coordinates": [[[13.40,52.50],[13.405,52.50],[13.405,52.51],[13.40,52.51],[13.40,52.50]]] } },
            { "type": "Feature", "properties": { "landuse": "forest" },
              "geometry": { "type": "Polygon", "coordinates": [[[13.43,52.50],[13.44,52.50],[13.44,52.51],[13.43,52.51],[13.43,52.50]]] } },
            { "type": "Feature", "properties": { "building": "yes" },
              "geometry": { "type": "Polygon", "coordinates": [[[13.41,52.50],[13.42,52.50],[13.42,52.51],[13.41,52.51],[13.41,52.50]]] } }
        ]
    }"#;

    fn reading(area: &str, year: Option<i32>, temp: Option<f64>) -> TemperatureReading {
        TemperatureReading {
            area: area.to_string(),
            year,
            mean_temp_c: temp,
        }
    }

    fn inputs() -> PipelineInputs {
        PipelineInputs {
            boundaries: BOUNDARIES.to_string(),
            vegetation: VEGETATION.to_string(),
            outline: Some(OUTLINE.to_string()),
            temperatures: vec![
                reading("Mitte", Some(2020), Some(30.0)),
                reading("Mitte", Some(2021), Some(32.0)),
                reading("Charlottenbrg", Some(2020), Some(34.0)),
                reading("Neukolln", Some(2020), Some(28.0)),
                reading("Spandau", Some(2020), None),
                reading("Atlantis", Some(2020), Some(40.0)),
            ],
        }
    }

    #[test]
    fn study_areas_exclude_city_and_neighbours() {
        let config = RunConfig::default();
        let engine = engine_for(&config);
        let areas = prepare_areas(&config, BOUNDARIES, Some(OUTLINE), &engine).unwrap();
        let names: Vec<&str> = areas.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Mitte", "Charlottenburg-Wilmersdorf", "Neukölln", "Spandau"]
        );
    }

    #[test]
    fn without_outline_only_city_polygon_is_dropped() {
        let config = RunConfig::default();
        let engine = engine_for(&config);
        let areas = prepare_areas(&config, BOUNDARIES, None, &engine).unwrap();
        assert_eq!(areas.len(), 5);
        assert!(areas.iter().all(|a| a.name != "Berlin"));
    }

    #[test]
    fn no_study_area_is_an_error() {
        let config = RunConfig {
            boundary_name_property: "bezirk".to_string(),
            ..RunConfig::default()
        };
        let engine = engine_for(&config);
        assert!(matches!(
            prepare_areas(&config, BOUNDARIES, Some(OUTLINE), &engine),
            Err(PipelineError::NoAreas { .. })
        ));
    }

    #[test]
    fn reconciles_and_averages_yearly_rows() {
        let config = RunConfig::default();
        let canonical = ["Mitte", "Charlottenburg-Wilmersdorf", "Neukölln", "Spandau"];
        let (temps, matches) = reconcile_temperatures(&config, inputs().temperatures, &canonical);

        assert_eq!(matches.len(), 5);
        assert!(!matches[4].is_matched());
        assert_eq!(
            temps,
            vec![
                AreaTemperature {
                    area: "Charlottenburg-Wilmersdorf".to_string(),
                    mean_temp_c: Some(34.0)
                },
                AreaTemperature {
                    area: "Mitte".to_string(),
                    mean_temp_c: Some(31.0)
                },
                AreaTemperature {
                    area: "Neukölln".to_string(),
                    mean_temp_c: Some(28.0)
                },
                AreaTemperature {
                    area: "Spandau".to_string(),
                    mean_temp_c: None
                },
            ]
        );
    }

    #[test]
    fn averaged_table_keeps_rows_as_is() {
        let config = RunConfig::default();
        let (temps, _) = reconcile_temperatures(
            &config,
            vec![reading("Spandau", None, Some(27.0)), reading("Mitte", None, Some(31.0))],
            &["Mitte", "Spandau"],
        );
        let names: Vec<&str> = temps.iter().map(|t| t.area.as_str()).collect();
        assert_eq!(names, vec!["Spandau", "Mitte"]);
    }

    #[test]
    fn full_run() {
        let config = RunConfig::default();
        let engine = engine_for(&config);
        let output = run(&config, inputs(), &engine, &NullProgress).unwrap();

        assert_eq!(output.areas.len(), 4);

        let green: Vec<f64> = output.coverage.iter().map(|c| c.green_area).collect();
        assert!((green[0] - 0.5).abs() < 1e-3, "Mitte coverage {}", green[0]);
        assert_eq!(green[1], 0.0);
        // Neukölln only shares an edge with the forest.
        assert!(green[2].abs() < 1e-9);
        assert!((green[3] - 1.0).abs() < 1e-6);

        // Baseline (31 + 34 + 28) / 3 = 31; only Charlottenburg is hotter.
        let priority = &output.priority;
        assert!((priority.baseline_temp.unwrap() - 31.0).abs() < 1e-12);
        let scores: Vec<(&str, f64)> = priority
            .records
            .iter()
            .map(|r| (r.area.as_str(), r.priority_score))
            .collect();
        assert_eq!(scores[1], ("Charlottenburg-Wilmersdorf", 1.0));
        assert!((scores[0].1 - 1.0 / 3.0).abs() < 1e-12);
        assert!((scores[3].1 - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(priority.records[3].mean_temp_c, None);

        // The median green share of the three joined rows is 0, so the
        // low-green group is empty.
        assert!(output.comparison.is_none());
    }

    #[test]
    fn priority_layer_from_run() {
        let config = RunConfig::default();
        let engine = engine_for(&config);
        let output = run(&config, inputs(), &engine, &NullProgress).unwrap();

        let layer = export::priority_layer(&output.areas, &output.priority.records, &engine).unwrap();
        assert_eq!(layer.features.len(), 4);
        let json = serde_json::to_string(&layer).unwrap();
        assert!(json.contains("\"priority_score\":1.0"));
    }

    #[test]
    fn overlapping_vegetation_keeps_scores_in_unit_range() {
        // A park and a forest both covering all of Mitte.
        let vegetation = r#"{
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "leisure": "park" },
                  "geometry": { "type": "Polygon", "coordinates": [[[13.40,52.50],[13.41,52.50],[13.41,52.51],[13.40,52.51],[13.40,52.50]]] } },
                { "type": "Feature", "properties": { "landuse": "forest" },
                  "geometry": { "type": "Polygon", "coordinates": [[[13.40,52.50],[13.41,52.50],[13.41,52.51],[13.40,52.51],[13.40,52.50]]] } }
            ]
        }"#;
        let config = RunConfig::default();
        let engine = engine_for(&config);
        let areas = prepare_areas(&config, BOUNDARIES, Some(OUTLINE), &engine).unwrap();

        let coverage = coverage_stage(&config, &areas, vegetation, &engine, &NullProgress).unwrap();
        assert!(coverage[0].green_area > 1.9, "Mitte coverage {}", coverage[0].green_area);

        let temperatures = vec![
            AreaTemperature {
                area: "Mitte".to_string(),
                mean_temp_c: Some(34.0),
            },
            AreaTemperature {
                area: "Charlottenburg-Wilmersdorf".to_string(),
                mean_temp_c: Some(26.0),
            },
            AreaTemperature {
                area: "Neukölln".to_string(),
                mean_temp_c: Some(30.0),
            },
        ];
        let outcome = priority_stage(&config, &coverage, &temperatures);

        assert!(!outcome.degenerate);
        for record in &outcome.records {
            assert!(
                (0.0..=1.0).contains(&record.priority_score),
                "{} scored {}",
                record.area,
                record.priority_score
            );
        }
        assert_eq!(outcome.records[0].priority_score, 0.0);
    }

    struct DegreeCheckingSampler {
        seen: std::cell::RefCell<Vec<String>>,
    }

    impl LstSampler for DegreeCheckingSampler {
        fn mean_raw_lst(
            &self,
            area: &AreaBoundary,
            _window: &urban_heat_temperature::SummerWindow,
        ) -> Result<Option<f64>, TemperatureError> {
            use geo::BoundingRect;

            let rect = area.geometry.bounding_rect().unwrap();
            assert!(rect.min().x > 13.3 && rect.max().x < 13.5, "{rect:?}");
            assert!(rect.min().y > 52.4 && rect.max().y < 52.6, "{rect:?}");
            self.seen.borrow_mut().push(area.name.clone());
            Ok(Some(15_000.0))
        }
    }

    #[test]
    fn sampler_receives_geographic_areas() {
        let config = RunConfig {
            years: vec![2020, 2021],
            ..RunConfig::default()
        };
        let engine = engine_for(&config);
        let areas = prepare_areas(&config, BOUNDARIES, Some(OUTLINE), &engine).unwrap();
        let sampler = DegreeCheckingSampler {
            seen: std::cell::RefCell::new(Vec::new()),
        };

        let readings = temperature_stage(&config, &areas, &engine, &sampler).unwrap();

        assert_eq!(readings.len(), 8);
        assert_eq!(sampler.seen.borrow().len(), 8);
        assert_eq!(readings[0].area, "Mitte");
        assert_eq!(readings[0].year, Some(2020));
        assert!(readings.iter().all(|r| r.mean_temp_c.is_some()));
        // Study areas themselves stay planar.
        assert!(areas[0].geometry.0[0].exterior().0[0].x > 1_000.0);
    }
}
