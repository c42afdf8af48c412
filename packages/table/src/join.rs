//! Joins on the area name.
//!
//! Temperatures are matched to coverage rows by exact name, so foreign
//! names must be reconciled first with [`apply_matches`]. When a key
//! occurs more than once on the lookup side, the first row wins.

use std::collections::HashMap;

use urban_heat_area_models::{
    AreaTemperature, GreenCoverage, JoinedObservation, MatchOutcome, PriorityRecord,
    TemperatureReading,
};

/// Readings renamed to canonical areas.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedMatches {
    /// Readings whose area resolved, now carrying the canonical name.
    pub readings: Vec<TemperatureReading>,
    /// Number of readings dropped because their name did not resolve.
    pub dropped: usize,
}

/// Rows present in both tables with a known temperature.
///
/// Output follows the order of `temperatures`. Rows with a null
/// temperature or without a coverage row are left out; nothing is
/// imputed.
#[must_use]
pub fn inner_join(
    temperatures: &[AreaTemperature],
    coverage: &[GreenCoverage],
) -> Vec<JoinedObservation> {
    let green = first_by_area(coverage, |row| &row.area);

    let joined: Vec<JoinedObservation> = temperatures
        .iter()
        .filter_map(|row| {
            let mean_temp_c = row.mean_temp_c?;
            let green_area = green.get(row.area.as_str())?.green_area;
            Some(JoinedObservation {
                area: row.area.clone(),
                mean_temp_c,
                green_area,
            })
        })
        .collect();

    log::info!(
        "Joined {} of {} temperature rows with {} coverage rows",
        joined.len(),
        temperatures.len(),
        coverage.len()
    );
    joined
}

/// Every coverage row with its temperature, if one is known.
///
/// The result is a priority table with `priority_score` still unset
/// (`0.0`).
#[must_use]
pub fn left_join_temperature(
    coverage: &[GreenCoverage],
    temperatures: &[AreaTemperature],
) -> Vec<PriorityRecord> {
    let temps = first_by_area(temperatures, |row| &row.area);

    coverage
        .iter()
        .map(|row| PriorityRecord {
            area: row.area.clone(),
            mean_temp_c: temps.get(row.area.as_str()).and_then(|t| t.mean_temp_c),
            green_area: row.green_area,
            priority_score: 0.0,
        })
        .collect()
}

/// Renames readings to their reconciled canonical names.
///
/// Readings whose foreign name has no matched outcome are dropped and
/// counted.
#[must_use]
pub fn apply_matches(readings: Vec<TemperatureReading>, outcomes: &[MatchOutcome]) -> AppliedMatches {
    let mut canonical: HashMap<&str, Option<&str>> = HashMap::with_capacity(outcomes.len());
    for outcome in outcomes {
        canonical
            .entry(outcome.foreign())
            .or_insert_with(|| outcome.canonical());
    }

    let total = readings.len();
    let readings: Vec<TemperatureReading> = readings
        .into_iter()
        .filter_map(|reading| {
            let name = (*canonical.get(reading.area.as_str())?)?;
            Some(TemperatureReading {
                area: name.to_string(),
                ..reading
            })
        })
        .collect();

    let dropped = total - readings.len();
    if dropped > 0 {
        log::warn!("Dropped {dropped} of {total} temperature rows with unmatched area names");
    }

    AppliedMatches { readings, dropped }
}

fn first_by_area<'a, T>(rows: &'a [T], key: impl Fn(&'a T) -> &'a String) -> HashMap<&'a str, &'a T> {
    let mut map = HashMap::with_capacity(rows.len());
    for row in rows {
        map.entry(key(row).as_str()).or_insert(row);
    }
    map
}

#[cfg(test)]
mod tests {
    use urban_heat_area_models::NameMatch;

    use super::*;

    fn temp(area: &str, t: Option<f64>) -> AreaTemperature {
        AreaTemperature {
            area: area.to_string(),
            mean_temp_c: t,
        }
    }

    fn green(area: &str, g: f64) -> GreenCoverage {
        GreenCoverage {
            area: area.to_string(),
            green_area: g,
        }
    }

    fn reading(area: &str, t: f64) -> TemperatureReading {
        TemperatureReading {
            area: area.to_string(),
            year: None,
            mean_temp_c: Some(t),
        }
    }

    #[test]
    fn inner_join_requires_both_sides_and_a_temperature() {
        let temps = [
            temp("Mitte", Some(31.0)),
            temp("Tegel", None),
            temp("Atlantis", Some(40.0)),
            temp("Spandau", Some(28.0)),
        ];
        let coverage = [green("Spandau", 0.4), green("Mitte", 0.1), green("Tegel", 0.3)];

        let joined = inner_join(&temps, &coverage);
        assert_eq!(
            joined,
            vec![
                JoinedObservation {
                    area: "Mitte".to_string(),
                    mean_temp_c: 31.0,
                    green_area: 0.1,
                },
                JoinedObservation {
                    area: "Spandau".to_string(),
                    mean_temp_c: 28.0,
                    green_area: 0.4,
                },
            ]
        );
    }

    #[test]
    fn inner_join_never_synthesizes_rows() {
        let temps = [temp("A", Some(1.0)), temp("B", Some(2.0))];
        let coverage = [green("C", 0.1)];
        assert!(inner_join(&temps, &coverage).is_empty());
        assert!(inner_join(&[], &coverage).is_empty());
    }

    #[test]
    fn first_duplicate_wins() {
        let temps = [temp("A", Some(1.0))];
        let coverage = [green("A", 0.1), green("A", 0.9)];
        assert_eq!(inner_join(&temps, &coverage)[0].green_area, 0.1);

        let temps = [temp("A", Some(1.0)), temp("A", Some(5.0))];
        let rows = left_join_temperature(&[green("A", 0.2)], &temps);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].mean_temp_c, Some(1.0));
    }

    #[test]
    fn left_join_keeps_every_coverage_row() {
        let temps = [temp("Mitte", Some(31.0)), temp("Pankow", Some(29.0))];
        let coverage = [green("Mitte", 0.1), green("Tegel", 0.3)];

        let rows = left_join_temperature(&coverage, &temps);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].mean_temp_c, Some(31.0));
        assert_eq!(rows[1].area, "Tegel");
        assert_eq!(rows[1].mean_temp_c, None);
        assert_eq!(rows[1].green_area, 0.3);
    }

    #[test]
    fn apply_matches_renames_and_drops() {
        let readings = vec![
            reading("Charlottenbrg", 30.0),
            reading("Nowhere", 25.0),
            reading("Mitte", 31.0),
        ];
        let outcomes = [
            MatchOutcome::Matched(NameMatch {
                foreign: "Charlottenbrg".to_string(),
                canonical: "Charlottenburg-Wilmersdorf".to_string(),
                score: 83.08,
            }),
            MatchOutcome::Unmatched {
                foreign: "Nowhere".to_string(),
                best_candidate: Some("Mitte".to_string()),
                best_score: Some(20.0),
            },
            MatchOutcome::Matched(NameMatch {
                foreign: "Mitte".to_string(),
                canonical: "Mitte".to_string(),
                score: 100.0,
            }),
        ];

        let applied = apply_matches(readings, &outcomes);
        assert_eq!(applied.dropped, 1);
        let names: Vec<&str> = applied.readings.iter().map(|r| r.area.as_str()).collect();
        assert_eq!(names, vec!["Charlottenburg-Wilmersdorf", "Mitte"]);
        assert_eq!(applied.readings[0].mean_temp_c, Some(30.0));
    }

    #[test]
    fn readings_without_outcome_are_dropped() {
        let applied = apply_matches(vec![reading("Mitte", 31.0)], &[]);
        assert!(applied.readings.is_empty());
        assert_eq!(applied.dropped, 1);
    }
}
