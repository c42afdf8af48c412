#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the urban heat priority pipeline.
//!
//! Each stage is its own subcommand reading and writing the same CSV and
//! `GeoJSON` files the full `run` produces, so stages can be rerun in
//! isolation.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::LevelFilter;

use crate::commands::TemperatureSource;

#[derive(Parser)]
#[command(name = "urban_heat", about = "Urban heat and green coverage analysis")]
struct Cli {
    /// TOML run configuration. Built-in Berlin defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the green coverage fraction of every study area
    Coverage {
        /// Area boundaries (`GeoJSON` `FeatureCollection`)
        #[arg(long)]
        boundaries: PathBuf,
        /// Vegetation polygons (`GeoJSON` `FeatureCollection`)
        #[arg(long)]
        vegetation: PathBuf,
        /// City outline. Without it only the city-level polygon is dropped.
        #[arg(long)]
        outline: Option<PathBuf>,
        /// Coverage table to write (`area,green_area`)
        #[arg(long)]
        output: PathBuf,
        /// Also write a coverage map layer
        #[arg(long)]
        geojson: Option<PathBuf>,
    },
    /// Convert an exported satellite LST table into yearly and averaged temperatures
    Temperature {
        /// Area boundaries (`GeoJSON` `FeatureCollection`)
        #[arg(long)]
        boundaries: PathBuf,
        /// City outline
        #[arg(long)]
        outline: Option<PathBuf>,
        /// Raw LST export (`area,year,lst_raw`)
        #[arg(long)]
        raw_lst: PathBuf,
        /// Yearly table to write (`area,year,mean_temp_c`)
        #[arg(long)]
        yearly_output: PathBuf,
        /// Averaged table to write (`area,mean_temp_c`)
        #[arg(long)]
        averaged_output: PathBuf,
        /// Also write a temperature map layer
        #[arg(long)]
        geojson: Option<PathBuf>,
        /// Map a single year instead of the average
        #[arg(long, requires = "geojson")]
        year: Option<i32>,
    },
    /// Match provider area names to the boundary names
    Reconcile {
        /// Temperature table with provider spellings
        #[arg(long)]
        temperatures: PathBuf,
        /// Area boundaries holding the canonical names
        #[arg(long)]
        boundaries: PathBuf,
        /// Reconciled, averaged temperature table to write
        #[arg(long)]
        output: PathBuf,
        /// Also write every match decision as JSON
        #[arg(long)]
        matches: Option<PathBuf>,
    },
    /// Score tree-planting priority from temperature and coverage tables
    Priority {
        /// Temperature table (`area[,year],mean_temp_c`)
        #[arg(long)]
        temperatures: PathBuf,
        /// Coverage table (`area,green_area`)
        #[arg(long)]
        coverage: PathBuf,
        /// Priority table to write
        #[arg(long)]
        output: PathBuf,
        /// Area boundaries, required for the map layer
        #[arg(long)]
        boundaries: Option<PathBuf>,
        /// City outline
        #[arg(long)]
        outline: Option<PathBuf>,
        /// Also write a priority map layer
        #[arg(long, requires = "boundaries")]
        geojson: Option<PathBuf>,
        /// Number of top-ranked areas to print
        #[arg(long, default_value = "10")]
        top: usize,
    },
    /// Compare temperatures of low- and high-green areas
    Compare {
        /// Temperature table (`area[,year],mean_temp_c`)
        #[arg(long)]
        temperatures: PathBuf,
        /// Coverage table (`area,green_area`)
        #[arg(long)]
        coverage: PathBuf,
        /// Also write the report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Run every stage and write all tables and map layers
    Run {
        /// Area boundaries (`GeoJSON` `FeatureCollection`)
        #[arg(long)]
        boundaries: PathBuf,
        /// Vegetation polygons (`GeoJSON` `FeatureCollection`)
        #[arg(long)]
        vegetation: PathBuf,
        /// City outline
        #[arg(long)]
        outline: Option<PathBuf>,
        /// Temperature table with provider spellings
        #[arg(long, conflicts_with = "raw_lst")]
        temperatures: Option<PathBuf>,
        /// Raw LST export (`area,year,lst_raw`) instead of a temperature table
        #[arg(long)]
        raw_lst: Option<PathBuf>,
        /// Directory for every output
        #[arg(long)]
        output_dir: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = urban_heat_cli_utils::init_logger(LevelFilter::Info);
    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Coverage {
            boundaries,
            vegetation,
            outline,
            output,
            geojson,
        } => commands::coverage(
            &config,
            &multi,
            &commands::GeometryInputs {
                boundaries,
                outline,
            },
            &vegetation,
            &output,
            geojson.as_deref(),
        )?,
        Commands::Temperature {
            boundaries,
            outline,
            raw_lst,
            yearly_output,
            averaged_output,
            geojson,
            year,
        } => commands::temperature(
            &config,
            &commands::GeometryInputs {
                boundaries,
                outline,
            },
            &raw_lst,
            &yearly_output,
            &averaged_output,
            geojson.as_deref().map(|path| (path, year)),
        )?,
        Commands::Reconcile {
            temperatures,
            boundaries,
            output,
            matches,
        } => commands::reconcile(
            &config,
            &temperatures,
            &boundaries,
            &output,
            matches.as_deref(),
        )?,
        Commands::Priority {
            temperatures,
            coverage,
            output,
            boundaries,
            outline,
            geojson,
            top,
        } => {
            let map = match (geojson, boundaries) {
                (Some(path), Some(boundaries)) => Some((
                    path,
                    commands::GeometryInputs {
                        boundaries,
                        outline,
                    },
                )),
                _ => None,
            };
            commands::priority(&config, &temperatures, &coverage, &output, map.as_ref(), top)?;
        }
        Commands::Compare {
            temperatures,
            coverage,
            report,
        } => commands::compare(&config, &temperatures, &coverage, report.as_deref())?,
        Commands::Run {
            boundaries,
            vegetation,
            outline,
            temperatures,
            raw_lst,
            output_dir,
        } => {
            let source = match (temperatures, raw_lst) {
                (Some(path), _) => TemperatureSource::Table(path),
                (None, Some(path)) => TemperatureSource::RawLst(path),
                (None, None) => return Err("either --temperatures or --raw-lst is required".into()),
            };
            commands::run(
                &config,
                &multi,
                &commands::GeometryInputs {
                    boundaries,
                    outline,
                },
                &vegetation,
                &source,
                &output_dir,
            )?;
        }
    }

    Ok(())
}
