#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing shared by the urban heat binaries.
//!
//! [`init_logger`] routes `log` output through `indicatif-log-bridge` so
//! log lines are printed above live progress bars instead of tearing
//! them. [`IndicatifProgress`] drives those bars from the long-running
//! stages via [`ProgressCallback`].

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use urban_heat_spatial::progress::ProgressCallback;

pub use indicatif::MultiProgress;

/// An `indicatif` [`ProgressBar`] behind [`ProgressCallback`].
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Style applied once the number of items is known.
    counting_style: ProgressStyle,
}

impl IndicatifProgress {
    /// Bar for per-area work such as the coverage stage.
    ///
    /// Spins until [`ProgressCallback::set_total`] reports the number of
    /// areas, then shows position, percentage and ETA.
    #[must_use]
    pub fn areas_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let counting_style = ProgressStyle::with_template(
            "  {wide_bar:.green/dim} {pos}/{len} areas {percent}% [{eta}] {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Arc::new(Self {
            bar,
            counting_style,
        })
    }

    /// Bar over the fixed stages of a full run.
    #[must_use]
    pub fn stages_bar(multi: &MultiProgress, total: u64) -> Self {
        let bar = multi.add(ProgressBar::new(total));
        let counting_style = ProgressStyle::with_template(
            "{msg:>24} {wide_bar:.cyan/dim} {pos}/{len} [{elapsed_precise}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
        bar.set_style(counting_style.clone());

        Self {
            bar,
            counting_style,
        }
    }

    /// Marks the start of a named stage.
    pub fn start_stage(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    /// Marks the current stage as done.
    pub fn complete_stage(&self) {
        self.bar.inc(1);
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.counting_style.clone());
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Installs the global logger behind `indicatif-log-bridge`.
///
/// `RUST_LOG` overrides `default_level`. Returns the [`MultiProgress`]
/// every progress bar must be added to.
#[must_use]
pub fn init_logger(default_level: LevelFilter) -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .filter_level(default_level)
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // A logger may already be installed, e.g. by a test harness.
    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_err()
    {
        log::debug!("Logger already initialized");
    }
    log::set_max_level(level);

    multi
}
