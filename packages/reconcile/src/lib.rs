#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Area name reconciliation.
//!
//! Temperature tables and boundary tables come from different providers
//! and spell area names differently ("Neukolln" vs "Neukölln",
//! abbreviations, typos). [`reconcile`] maps every foreign name to the
//! best scoring canonical name, or reports it as unmatched when no
//! candidate clears the threshold. Matching is pure and deterministic.

pub mod fuzz;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use urban_heat_area_models::{MatchOutcome, NameMatch};

/// Default acceptance threshold. A match must score strictly above it.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 80.0;

/// Similarity function used to compare names.
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
pub enum Scorer {
    /// Plain normalized Indel similarity.
    Ratio,
    /// Best substring match.
    PartialRatio,
    /// Token-order insensitive similarity.
    TokenSortRatio,
    /// Shared-token similarity.
    TokenSetRatio,
    /// Weighted combination of all of the above.
    #[default]
    WeightedRatio,
}

impl Scorer {
    /// Scores `a` against `b` in `[0, 100]`.
    #[must_use]
    pub fn score(self, a: &str, b: &str) -> f64 {
        match self {
            Self::Ratio => fuzz::ratio(a, b),
            Self::PartialRatio => fuzz::partial_ratio(a, b),
            Self::TokenSortRatio => fuzz::token_sort_ratio(a, b),
            Self::TokenSetRatio => fuzz::token_set_ratio(a, b),
            Self::WeightedRatio => fuzz::weighted_ratio(a, b),
        }
    }
}

/// Options controlling name reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchOptions {
    /// Similarity function.
    pub scorer: Scorer,
    /// A candidate is accepted only if its score is strictly greater.
    pub threshold: f64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            scorer: Scorer::default(),
            threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

/// Finds the best scoring candidate for `name`.
///
/// Returns the candidate index and score. When several candidates share
/// the maximum score the first one in `candidates` order wins. Returns
/// `None` only if `candidates` is empty.
#[must_use]
pub fn best_match<C: AsRef<str>>(
    name: &str,
    candidates: &[C],
    scorer: Scorer,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;

    for (idx, candidate) in candidates.iter().enumerate() {
        let score = scorer.score(name, candidate.as_ref());
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((idx, score));
            if score >= 100.0 {
                break;
            }
        }
    }

    best
}

/// Reconciles every foreign name against the canonical name list.
///
/// The output has one [`MatchOutcome`] per foreign name, in input order.
#[must_use]
pub fn reconcile<F: AsRef<str>, C: AsRef<str>>(
    foreign: &[F],
    canonical: &[C],
    options: &MatchOptions,
) -> Vec<MatchOutcome> {
    foreign
        .iter()
        .map(|name| reconcile_one(name.as_ref(), canonical, options))
        .collect()
}

fn reconcile_one<C: AsRef<str>>(
    foreign: &str,
    canonical: &[C],
    options: &MatchOptions,
) -> MatchOutcome {
    match best_match(foreign, canonical, options.scorer) {
        Some((idx, score)) if score > options.threshold => MatchOutcome::Matched(NameMatch {
            foreign: foreign.to_string(),
            canonical: canonical[idx].as_ref().to_string(),
            score,
        }),
        Some((idx, score)) => MatchOutcome::Unmatched {
            foreign: foreign.to_string(),
            best_candidate: Some(canonical[idx].as_ref().to_string()),
            best_score: Some(score),
        },
        None => MatchOutcome::Unmatched {
            foreign: foreign.to_string(),
            best_candidate: None,
            best_score: None,
        },
    }
}

/// Counts of a reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    /// Number of names that resolved.
    pub matched: usize,
    /// Foreign names with no confident match, in input order.
    pub unmatched: Vec<String>,
}

impl MatchSummary {
    /// Summarizes a set of outcomes.
    #[must_use]
    pub fn from_outcomes(outcomes: &[MatchOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            if outcome.is_matched() {
                summary.matched += 1;
            } else {
                summary.unmatched.push(outcome.foreign().to_string());
            }
        }
        summary
    }

    /// Logs the summary, one warning per unmatched name.
    pub fn log(&self) {
        log::info!(
            "Reconciled {} of {} area names",
            self.matched,
            self.matched + self.unmatched.len()
        );
        for name in &self.unmatched {
            log::warn!("No confident match for area name '{name}', dropping its rows");
        }
    }
}
