//! Subcommand implementations.

use std::path::{Path, PathBuf};

use serde::Serialize;
use urban_heat_area_models::{ComparisonReport, MatchOutcome, PriorityRecord};
use urban_heat_cli_utils::{IndicatifProgress, MultiProgress};
use urban_heat_pipeline::sampler::RawLstTable;
use urban_heat_pipeline::{
    ConfigError, PipelineError, PipelineInputs, RunConfig, collapse_years, comparison_stage,
    coverage_stage, engine_for, export, prepare_areas, priority_stage, read_text,
    reconcile_temperatures, temperature_stage, write_text,
};
use urban_heat_priority::PriorityOutcome;
use urban_heat_spatial::{AreaBoundary, PlanarEngine, progress::ProgressCallback};
use urban_heat_table::{read_coverage_csv, read_temperature_csv, write_csv};

/// Boundary file plus optional city outline.
pub struct GeometryInputs {
    pub boundaries: PathBuf,
    pub outline: Option<PathBuf>,
}

/// Where a full run takes its temperatures from.
pub enum TemperatureSource {
    /// Temperature table with provider spellings of the area names.
    Table(PathBuf),
    /// Raw satellite LST export keyed by boundary names.
    RawLst(PathBuf),
}

/// Loads the run configuration, falling back to the defaults.
pub fn load_config(path: Option<&Path>) -> Result<RunConfig, ConfigError> {
    path.map_or_else(
        || {
            log::info!("No configuration given, using defaults");
            Ok(RunConfig::default())
        },
        RunConfig::load,
    )
}

fn study_areas(
    config: &RunConfig,
    inputs: &GeometryInputs,
    engine: &PlanarEngine,
) -> Result<Vec<AreaBoundary>, PipelineError> {
    let boundaries = read_text(&inputs.boundaries)?;
    let outline = inputs.outline.as_deref().map(read_text).transpose()?;
    prepare_areas(config, &boundaries, outline.as_deref(), engine)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PipelineError> {
    write_text(path, &serde_json::to_string_pretty(value)?)
}

pub fn coverage(
    config: &RunConfig,
    multi: &MultiProgress,
    geometry: &GeometryInputs,
    vegetation: &Path,
    output: &Path,
    geojson: Option<&Path>,
) -> Result<(), PipelineError> {
    let engine = engine_for(config);
    let areas = study_areas(config, geometry, &engine)?;

    let progress = IndicatifProgress::areas_bar(multi, "Computing green coverage");
    let coverage = coverage_stage(
        config,
        &areas,
        &read_text(vegetation)?,
        &engine,
        progress.as_ref(),
    )?;

    write_csv(output, &coverage)?;
    if let Some(path) = geojson {
        write_json(path, &export::coverage_layer(&areas, &coverage, &engine)?)?;
    }
    Ok(())
}

pub fn temperature(
    config: &RunConfig,
    geometry: &GeometryInputs,
    raw_lst: &Path,
    yearly_output: &Path,
    averaged_output: &Path,
    map: Option<(&Path, Option<i32>)>,
) -> Result<(), PipelineError> {
    let engine = engine_for(config);
    let areas = study_areas(config, geometry, &engine)?;
    let sampler = RawLstTable::load(raw_lst)?;
    log::info!("Loaded {} area-year LST values", sampler.len());

    let readings = temperature_stage(config, &areas, &engine, &sampler)?;
    write_csv(yearly_output, &readings)?;

    let averaged = urban_heat_temperature::average_by_area(&readings);
    write_csv(averaged_output, &averaged)?;

    if let Some((path, year)) = map {
        let temperatures = match year {
            Some(year) => urban_heat_temperature::readings_for_year(&readings, year),
            None => averaged,
        };
        write_json(path, &export::temperature_layer(&areas, &temperatures, &engine)?)?;
    }
    Ok(())
}

pub fn reconcile(
    config: &RunConfig,
    temperatures: &Path,
    boundaries: &Path,
    output: &Path,
    matches: Option<&Path>,
) -> Result<(), PipelineError> {
    let readings = read_temperature_csv(temperatures)?;
    let boundaries =
        urban_heat_spatial::load_boundaries(&read_text(boundaries)?, &config.boundary_name_property)?;
    let canonical: Vec<&str> = boundaries
        .iter()
        .map(|a| a.name.as_str())
        .filter(|name| *name != config.city_area_name)
        .collect();

    let (temperatures, outcomes) = reconcile_temperatures(config, readings, &canonical);
    print_matches(&outcomes);

    write_csv(output, &temperatures)?;
    if let Some(path) = matches {
        write_json(path, &outcomes)?;
    }
    Ok(())
}

pub fn priority(
    config: &RunConfig,
    temperatures: &Path,
    coverage: &Path,
    output: &Path,
    map: Option<&(PathBuf, GeometryInputs)>,
    top: usize,
) -> Result<(), PipelineError> {
    let temperatures = collapse_years(read_temperature_csv(temperatures)?);
    let coverage = read_coverage_csv(coverage)?;

    let outcome = priority_stage(config, &coverage, &temperatures);
    write_csv(output, &outcome.records)?;
    print_ranking(&outcome, top);

    if let Some((path, geometry)) = map {
        let engine = engine_for(config);
        let areas = study_areas(config, geometry, &engine)?;
        write_json(path, &export::priority_layer(&areas, &outcome.records, &engine)?)?;
    }
    Ok(())
}

pub fn compare(
    config: &RunConfig,
    temperatures: &Path,
    coverage: &Path,
    report_path: Option<&Path>,
) -> Result<(), PipelineError> {
    let temperatures = collapse_years(read_temperature_csv(temperatures)?);
    let coverage = read_coverage_csv(coverage)?;

    let report = comparison_stage(&coverage, &temperatures)?;
    print_report(&report, config.alpha);

    let joined = urban_heat_table::inner_join(&temperatures, &coverage);
    let green: Vec<f64> = joined.iter().map(|r| r.green_area).collect();
    let temps: Vec<f64> = joined.iter().map(|r| r.mean_temp_c).collect();
    match urban_heat_statistics::linear_trend(&green, &temps) {
        Ok(trend) => println!(
            "Trend: {:+.2} °C from 0% to 100% green coverage (intercept {:.2} °C)",
            trend.slope, trend.intercept
        ),
        Err(e) => log::warn!("No trend line: {e}"),
    }

    if let Some(path) = report_path {
        write_json(path, &report)?;
    }
    Ok(())
}

pub fn run(
    config: &RunConfig,
    multi: &MultiProgress,
    geometry: &GeometryInputs,
    vegetation: &Path,
    source: &TemperatureSource,
    output_dir: &Path,
) -> Result<(), PipelineError> {
    std::fs::create_dir_all(output_dir).map_err(|e| PipelineError::Io {
        path: output_dir.display().to_string(),
        source: e,
    })?;
    let engine = engine_for(config);
    let stages = IndicatifProgress::stages_bar(multi, 3);

    stages.start_stage("Reading temperatures");
    let temperatures = match source {
        TemperatureSource::Table(path) => read_temperature_csv(path)?,
        TemperatureSource::RawLst(path) => {
            let areas = study_areas(config, geometry, &engine)?;
            let readings =
                temperature_stage(config, &areas, &engine, &RawLstTable::load(path)?)?;
            write_csv(&output_dir.join("temperature_yearly.csv"), &readings)?;
            readings
        }
    };
    stages.complete_stage();

    stages.start_stage("Running pipeline");
    let inputs = PipelineInputs {
        boundaries: read_text(&geometry.boundaries)?,
        vegetation: read_text(vegetation)?,
        outline: geometry.outline.as_deref().map(read_text).transpose()?,
        temperatures,
    };
    let progress = IndicatifProgress::areas_bar(multi, "Computing green coverage");
    let output = urban_heat_pipeline::run(config, inputs, &engine, progress.as_ref())?;
    stages.complete_stage();

    stages.start_stage("Writing outputs");
    write_csv(&output_dir.join("temperature_averaged.csv"), &output.temperatures)?;
    write_csv(&output_dir.join("green_coverage.csv"), &output.coverage)?;
    write_csv(&output_dir.join("priority.csv"), &output.priority.records)?;
    write_json(&output_dir.join("name_matches.json"), &output.matches)?;
    write_json(
        &output_dir.join("temperature.geojson"),
        &export::temperature_layer(&output.areas, &output.temperatures, &engine)?,
    )?;
    write_json(
        &output_dir.join("green_coverage.geojson"),
        &export::coverage_layer(&output.areas, &output.coverage, &engine)?,
    )?;
    write_json(
        &output_dir.join("priority.geojson"),
        &export::priority_layer(&output.areas, &output.priority.records, &engine)?,
    )?;
    if let Some(report) = &output.comparison {
        write_json(&output_dir.join("comparison.json"), report)?;
    }
    stages.finish("Done".to_string());

    print_ranking(&output.priority, 10);
    if let Some(report) = &output.comparison {
        print_report(report, config.alpha);
    }
    Ok(())
}

fn print_matches(outcomes: &[MatchOutcome]) {
    for outcome in outcomes {
        match outcome {
            MatchOutcome::Matched(m) => {
                println!("  {:<32} -> {} ({:.1})", m.foreign, m.canonical, m.score);
            }
            MatchOutcome::Unmatched {
                foreign,
                best_candidate,
                best_score,
            } => match (best_candidate, best_score) {
                (Some(candidate), Some(score)) => {
                    println!("  {foreign:<32} -- no match (best: {candidate}, {score:.1})");
                }
                _ => println!("  {foreign:<32} -- no match"),
            },
        }
    }
}

fn print_ranking(outcome: &PriorityOutcome, top: usize) {
    if let Some(baseline) = outcome.baseline_temp {
        println!("Baseline temperature: {baseline:.2} °C");
    }

    let mut ranked: Vec<PriorityRecord> = outcome.records.clone();
    urban_heat_priority::rank_by_priority(&mut ranked);

    println!(
        "{:>3}  {:<32} {:>8} {:>8} {:>6}",
        "#", "Area", "Temp °C", "Green %", "Score"
    );
    for (rank, record) in ranked.iter().take(top).enumerate() {
        let temp = record
            .mean_temp_c
            .map_or_else(|| "-".to_string(), |t| format!("{t:.2}"));
        println!(
            "{:>3}  {:<32} {temp:>8} {:>8.2} {:>6.2}",
            rank + 1,
            record.area,
            record.green_area * 100.0,
            record.priority_score
        );
    }
}

fn print_report(report: &ComparisonReport, alpha: f64) {
    println!("Median green coverage: {:.4}", report.median_green);
    for (label, summary) in [("Low green", &report.low_green), ("High green", &report.high_green)] {
        println!(
            "{label:<10} n={:<3} mean={:.2} sd={:.2} range=[{:.2}, {:.2}]",
            summary.n, summary.mean, summary.std_dev, summary.min, summary.max
        );
    }
    println!(
        "Welch t = {:.3}, df = {:.2}, p = {:.4}",
        report.t_test.statistic, report.t_test.degrees_of_freedom, report.t_test.p_value
    );
    println!(
        "Spearman rho = {:.3}, p = {:.4} (n = {})",
        report.correlation.rho, report.correlation.p_value, report.correlation.n
    );
    for line in urban_heat_statistics::interpret(report, alpha) {
        println!("{line}");
    }
}
