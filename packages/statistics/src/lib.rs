#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Does green coverage relate to surface temperature?
//!
//! Splits the joined per-area table at the median green coverage and
//! compares the temperature of the two halves with Welch's t-test, then
//! measures the monotonic association of coverage and temperature with
//! Spearman's rank correlation.

pub mod distribution;

use serde::{Deserialize, Serialize};
use urban_heat_area_models::{
    ComparisonReport, GroupSummary, JoinedObservation, SpearmanResult, WelchTestResult,
};

/// Significance level used when none is given.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Errors that make a comparison impossible.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StatisticsError {
    /// A group has no observations after the split.
    #[error("Group '{group}' is empty")]
    EmptyGroup {
        /// Name of the empty group.
        group: String,
    },

    /// Too few observations for the requested statistic.
    #[error("{what} needs at least {required} observations, got {actual}")]
    InsufficientData {
        /// The statistic or group that lacks data.
        what: String,
        /// Minimum number of observations.
        required: usize,
        /// Number of observations available.
        actual: usize,
    },

    /// The input has no variance, so the statistic is undefined.
    #[error("Degenerate input: {message}")]
    Degenerate {
        /// Description of what went wrong.
        message: String,
    },
}

/// Least-squares line through a scatter of points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearTrend {
    /// Change in y per unit of x.
    pub slope: f64,
    /// Value of y at x = 0.
    pub intercept: f64,
}

impl LinearTrend {
    /// Evaluates the line at `x`.
    #[must_use]
    pub fn at(&self, x: f64) -> f64 {
        self.slope.mul_add(x, self.intercept)
    }
}

/// Two-sample test and rank correlation.
pub trait StatisticsEngine {
    /// Compares the means of two independent samples.
    ///
    /// # Errors
    ///
    /// Returns [`StatisticsError`] if either sample is too small or both
    /// have zero variance.
    fn two_sample_test(&self, a: &[f64], b: &[f64]) -> Result<WelchTestResult, StatisticsError>;

    /// Measures the monotonic association of paired samples.
    ///
    /// # Errors
    ///
    /// Returns [`StatisticsError`] if there are fewer than three pairs or
    /// either sample is constant.
    fn rank_correlation(&self, x: &[f64], y: &[f64]) -> Result<SpearmanResult, StatisticsError>;
}

/// Welch's unequal-variance t-test and Spearman's rho with t-distribution
/// p-values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassicalStatistics;

impl StatisticsEngine for ClassicalStatistics {
    #[allow(clippy::cast_precision_loss)]
    fn two_sample_test(&self, a: &[f64], b: &[f64]) -> Result<WelchTestResult, StatisticsError> {
        let sa = summarize("first sample", a)?;
        let sb = summarize("second sample", b)?;
        for (name, summary) in [("first sample", &sa), ("second sample", &sb)] {
            if summary.n < 2 {
                return Err(StatisticsError::InsufficientData {
                    what: name.to_string(),
                    required: 2,
                    actual: summary.n,
                });
            }
        }

        let va = sa.std_dev.powi(2) / sa.n as f64;
        let vb = sb.std_dev.powi(2) / sb.n as f64;
        let se_squared = va + vb;
        if se_squared <= 0.0 || !se_squared.is_finite() {
            return Err(StatisticsError::Degenerate {
                message: "both samples have zero variance".to_string(),
            });
        }

        let statistic = (sa.mean - sb.mean) / se_squared.sqrt();
        let degrees_of_freedom = se_squared.powi(2)
            / (va.powi(2) / (sa.n - 1) as f64 + vb.powi(2) / (sb.n - 1) as f64);
        let p_value = distribution::student_t_two_sided_p(statistic, degrees_of_freedom);

        Ok(WelchTestResult {
            statistic,
            degrees_of_freedom,
            p_value,
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn rank_correlation(&self, x: &[f64], y: &[f64]) -> Result<SpearmanResult, StatisticsError> {
        if x.len() != y.len() {
            return Err(StatisticsError::Degenerate {
                message: format!("paired samples differ in length ({} vs {})", x.len(), y.len()),
            });
        }
        let n = x.len();
        if n < 3 {
            return Err(StatisticsError::InsufficientData {
                what: "rank correlation".to_string(),
                required: 3,
                actual: n,
            });
        }

        let rho = pearson(&average_ranks(x), &average_ranks(y)).ok_or_else(|| {
            StatisticsError::Degenerate {
                message: "rank correlation of a constant sample".to_string(),
            }
        })?;

        let degrees_of_freedom = (n - 2) as f64;
        let p_value = if (1.0 - rho.abs()) <= f64::EPSILON {
            0.0
        } else {
            let t = rho * (degrees_of_freedom / rho.mul_add(-rho, 1.0)).sqrt();
            distribution::student_t_two_sided_p(t, degrees_of_freedom)
        };

        Ok(SpearmanResult { rho, p_value, n })
    }
}

/// Compares temperature between low- and high-coverage areas.
///
/// Areas below the median coverage form the low group, areas at or
/// above it the high group.
///
/// # Errors
///
/// Returns [`StatisticsError`] if either group is empty or has a single
/// observation, or if the data has no variance.
pub fn compare<E: StatisticsEngine + ?Sized>(
    rows: &[JoinedObservation],
    engine: &E,
) -> Result<ComparisonReport, StatisticsError> {
    let green: Vec<f64> = rows.iter().map(|r| r.green_area).collect();
    let temps: Vec<f64> = rows.iter().map(|r| r.mean_temp_c).collect();

    let median_green = median(&green).ok_or_else(|| StatisticsError::EmptyGroup {
        group: "joined table".to_string(),
    })?;

    let (low, high): (Vec<&JoinedObservation>, Vec<&JoinedObservation>) =
        rows.iter().partition(|r| r.green_area < median_green);
    let low: Vec<f64> = low.iter().map(|r| r.mean_temp_c).collect();
    let high: Vec<f64> = high.iter().map(|r| r.mean_temp_c).collect();

    log::info!(
        "Median green coverage {median_green:.4}: {} low-green and {} high-green areas",
        low.len(),
        high.len()
    );

    let low_green = require_group("low green", &low)?;
    let high_green = require_group("high green", &high)?;

    let t_test = engine.two_sample_test(&low, &high)?;
    let correlation = engine.rank_correlation(&green, &temps)?;

    Ok(ComparisonReport {
        median_green,
        low_green,
        high_green,
        t_test,
        correlation,
    })
}

fn require_group(group: &str, values: &[f64]) -> Result<GroupSummary, StatisticsError> {
    let summary = summarize(group, values)?;
    if summary.n < 2 {
        return Err(StatisticsError::InsufficientData {
            what: format!("group '{group}'"),
            required: 2,
            actual: summary.n,
        });
    }
    Ok(summary)
}

/// Median, averaging the two middle values of an even-sized sample.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        f64::midpoint(sorted[mid - 1], sorted[mid])
    } else {
        sorted[mid]
    })
}

/// Count, mean, sample standard deviation and range of a group.
///
/// The standard deviation of a single observation is `0.0`.
///
/// # Errors
///
/// Returns [`StatisticsError::EmptyGroup`] if `values` is empty.
#[allow(clippy::cast_precision_loss)]
pub fn summarize(group: &str, values: &[f64]) -> Result<GroupSummary, StatisticsError> {
    if values.is_empty() {
        return Err(StatisticsError::EmptyGroup {
            group: group.to_string(),
        });
    }

    let n = values.len();
    let mean = values.iter().fold(0.0, |acc, v| acc + v) / n as f64;
    let std_dev = if n > 1 {
        let ss = values.iter().fold(0.0, |acc, v| acc + (v - mean).powi(2));
        (ss / (n - 1) as f64).sqrt()
    } else {
        0.0
    };

    Ok(GroupSummary {
        n,
        mean,
        std_dev,
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    })
}

/// Ordinary least-squares fit of `y` on `x`.
///
/// # Errors
///
/// Returns [`StatisticsError`] for fewer than two points, mismatched
/// lengths, or constant `x`.
#[allow(clippy::cast_precision_loss)]
pub fn linear_trend(x: &[f64], y: &[f64]) -> Result<LinearTrend, StatisticsError> {
    if x.len() != y.len() {
        return Err(StatisticsError::Degenerate {
            message: format!("paired samples differ in length ({} vs {})", x.len(), y.len()),
        });
    }
    if x.len() < 2 {
        return Err(StatisticsError::InsufficientData {
            what: "linear trend".to_string(),
            required: 2,
            actual: x.len(),
        });
    }

    let n = x.len() as f64;
    let mean_x = x.iter().fold(0.0, |acc, v| acc + v) / n;
    let mean_y = y.iter().fold(0.0, |acc, v| acc + v) / n;
    let (sxy, sxx) = x
        .iter()
        .zip(y)
        .fold((0.0, 0.0), |(sxy, sxx), (xi, yi)| {
            let dx = xi - mean_x;
            (dx.mul_add(yi - mean_y, sxy), dx.mul_add(dx, sxx))
        });

    if sxx <= 0.0 {
        return Err(StatisticsError::Degenerate {
            message: "trend of a constant x sample".to_string(),
        });
    }

    let slope = sxy / sxx;
    Ok(LinearTrend {
        slope,
        intercept: slope.mul_add(-mean_x, mean_y),
    })
}

/// Plain-language verdict lines for a comparison.
#[must_use]
pub fn interpret(report: &ComparisonReport, alpha: f64) -> Vec<String> {
    let t_line = if report.t_test.p_value < alpha {
        let direction = if report.t_test.statistic > 0.0 {
            "hotter"
        } else {
            "cooler"
        };
        format!("Low-green areas are significantly {direction} than high-green areas.")
    } else {
        "Temperature difference between low and high green areas is not statistically significant."
            .to_string()
    };

    let rho_line = if report.correlation.p_value < alpha {
        let trend = if report.correlation.rho < 0.0 {
            "negative"
        } else {
            "positive"
        };
        format!(
            "Significant {trend} correlation between green coverage and temperature (rho = {:.3}).",
            report.correlation.rho
        )
    } else {
        "No statistically significant correlation between green coverage and temperature."
            .to_string()
    };

    vec![t_line, rho_line]
}

/// 1-based ranks, ties sharing the average of the ranks they span.
#[allow(clippy::cast_precision_loss, clippy::float_cmp)]
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && values[order[end + 1]] == values[order[start]] {
            end += 1;
        }
        let rank = (start + end) as f64 / 2.0 + 1.0;
        for &i in &order[start..=end] {
            ranks[i] = rank;
        }
        start = end + 1;
    }
    ranks
}

/// Pearson correlation, `None` if either sample is constant.
#[allow(clippy::cast_precision_loss)]
fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len() as f64;
    let mean_x = x.iter().fold(0.0, |acc, v| acc + v) / n;
    let mean_y = y.iter().fold(0.0, |acc, v| acc + v) / n;

    let (sxy, sxx, syy) = x.iter().zip(y).fold((0.0, 0.0, 0.0), |(sxy, sxx, syy), (xi, yi)| {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        (dx.mul_add(dy, sxy), dx.mul_add(dx, sxx), dy.mul_add(dy, syy))
    });

    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(green: &[f64], temps: &[f64]) -> Vec<JoinedObservation> {
        green
            .iter()
            .zip(temps)
            .enumerate()
            .map(|(i, (g, t))| JoinedObservation {
                area: format!("A{i}"),
                mean_temp_c: *t,
                green_area: *g,
            })
            .collect()
    }

    #[test]
    fn median_of_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn ties_share_average_rank() {
        assert_eq!(
            average_ranks(&[5.0, 6.0, 7.0, 8.0, 7.0]),
            vec![1.0, 2.0, 3.5, 5.0, 3.5]
        );
    }

    #[test]
    fn welch_test_reference_values() {
        let result = ClassicalStatistics
            .two_sample_test(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 4.0, 6.0, 8.0, 10.0])
            .unwrap();
        assert!((result.statistic + 1.897_366_596_101_027_5).abs() < 1e-12);
        assert!((result.degrees_of_freedom - 5.882_352_941_176_471).abs() < 1e-9);
        assert!((result.p_value - 0.107_531_194_930_627).abs() < 1e-9);
    }

    #[test]
    fn welch_test_rejects_tiny_or_flat_samples() {
        assert!(matches!(
            ClassicalStatistics.two_sample_test(&[], &[1.0, 2.0]),
            Err(StatisticsError::EmptyGroup { .. })
        ));
        assert!(matches!(
            ClassicalStatistics.two_sample_test(&[1.0], &[1.0, 2.0]),
            Err(StatisticsError::InsufficientData { required: 2, actual: 1, .. })
        ));
        assert!(matches!(
            ClassicalStatistics.two_sample_test(&[3.0, 3.0], &[3.0, 3.0]),
            Err(StatisticsError::Degenerate { .. })
        ));
    }

    #[test]
    fn spearman_reference_values() {
        let result = ClassicalStatistics
            .rank_correlation(&[1.0, 2.0, 3.0, 4.0, 5.0], &[5.0, 6.0, 7.0, 8.0, 7.0])
            .unwrap();
        assert!((result.rho - 0.820_782_681_668_123_3).abs() < 1e-12);
        assert!((result.p_value - 0.088_587_005_313_543_88).abs() < 1e-9);
        assert_eq!(result.n, 5);
    }

    #[test]
    fn perfect_monotonic_correlation() {
        let result = ClassicalStatistics
            .rank_correlation(&[1.0, 2.0, 3.0, 4.0], &[10.0, 20.0, 30.0, 100.0])
            .unwrap();
        assert_eq!(result.rho, 1.0);
        assert_eq!(result.p_value, 0.0);
    }

    #[test]
    fn spearman_rejects_short_or_constant_input() {
        assert!(matches!(
            ClassicalStatistics.rank_correlation(&[1.0, 2.0], &[1.0, 2.0]),
            Err(StatisticsError::InsufficientData { required: 3, .. })
        ));
        assert!(matches!(
            ClassicalStatistics.rank_correlation(&[1.0, 2.0, 3.0], &[4.0, 4.0, 4.0]),
            Err(StatisticsError::Degenerate { .. })
        ));
        assert!(ClassicalStatistics.rank_correlation(&[1.0, 2.0, 3.0], &[1.0]).is_err());
    }

    #[test]
    fn low_green_areas_run_hotter() {
        let data = rows(
            &[0.05, 0.10, 0.15, 0.20, 0.35, 0.40, 0.55, 0.60],
            &[32.0, 31.5, 31.8, 30.9, 29.5, 29.8, 28.7, 28.9],
        );
        let report = compare(&data, &ClassicalStatistics).unwrap();

        assert!((report.median_green - 0.275).abs() < 1e-12);
        assert_eq!(report.low_green.n, 4);
        assert_eq!(report.high_green.n, 4);
        assert!((report.low_green.mean - 31.55).abs() < 1e-9);
        assert!((report.low_green.std_dev - 0.479_583_152_331_272_7).abs() < 1e-9);
        assert_eq!(report.low_green.max, 32.0);

        assert!((report.t_test.statistic - 6.625_975_648_875_584).abs() < 1e-9);
        assert!((report.t_test.p_value - 0.000_579_830_624_849_144).abs() < 1e-9);
        assert!((report.correlation.rho + 0.928_571_428_571_428_6).abs() < 1e-12);
        assert!((report.correlation.p_value - 0.000_862_968_182_899_982).abs() < 1e-9);

        assert_eq!(
            interpret(&report, DEFAULT_ALPHA),
            vec![
                "Low-green areas are significantly hotter than high-green areas.".to_string(),
                "Significant negative correlation between green coverage and temperature (rho = -0.929)."
                    .to_string(),
            ]
        );
    }

    #[test]
    fn near_identical_groups_are_not_significant() {
        let data = rows(
            &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8],
            &[30.1, 29.9, 30.3, 30.0, 30.2, 29.9, 30.1, 30.1],
        );
        let report = compare(&data, &ClassicalStatistics).unwrap();
        assert!(report.t_test.p_value > 0.05, "p = {}", report.t_test.p_value);
        assert!(report.correlation.p_value > 0.05);

        let lines = interpret(&report, DEFAULT_ALPHA);
        assert!(lines[0].contains("not statistically significant"));
        assert!(lines[1].starts_with("No statistically significant"));
    }

    #[test]
    fn median_ties_go_to_high_group() {
        // Median is 0.3; both 0.3 rows land in the high group.
        let data = rows(&[0.1, 0.2, 0.3, 0.3, 0.5], &[31.0, 30.0, 29.0, 28.5, 28.0]);
        let report = compare(&data, &ClassicalStatistics).unwrap();
        assert_eq!(report.low_green.n, 2);
        assert_eq!(report.high_green.n, 3);
    }

    #[test]
    fn uniform_coverage_leaves_low_group_empty() {
        let data = rows(&[0.2, 0.2, 0.2], &[30.0, 31.0, 32.0]);
        let err = compare(&data, &ClassicalStatistics).unwrap_err();
        assert_eq!(
            err,
            StatisticsError::EmptyGroup {
                group: "low green".to_string()
            }
        );
    }

    #[test]
    fn empty_table_is_an_error() {
        assert!(matches!(
            compare(&[], &ClassicalStatistics),
            Err(StatisticsError::EmptyGroup { .. })
        ));
    }

    #[test]
    fn single_observation_group_is_insufficient() {
        let data = rows(&[0.1, 0.5, 0.6], &[30.0, 29.0, 28.0]);
        assert!(matches!(
            compare(&data, &ClassicalStatistics),
            Err(StatisticsError::InsufficientData { actual: 1, .. })
        ));
    }

    #[test]
    fn least_squares_line() {
        let trend = linear_trend(&[0.0, 1.0, 2.0, 3.0], &[1.0, 3.0, 5.0, 7.0]).unwrap();
        assert!((trend.slope - 2.0).abs() < 1e-12);
        assert!((trend.intercept - 1.0).abs() < 1e-12);
        assert!((trend.at(10.0) - 21.0).abs() < 1e-12);

        assert!(linear_trend(&[1.0, 1.0], &[2.0, 3.0]).is_err());
        assert!(linear_trend(&[1.0], &[2.0]).is_err());
    }
}
