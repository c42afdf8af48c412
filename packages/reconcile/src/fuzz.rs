//! Edit-distance based similarity scorers.
//!
//! All scorers return a value in `[0, 100]` and compare strings per
//! Unicode scalar value without any case folding or punctuation
//! stripping. Distances are Indel distances (insertions and deletions
//! only), so `ratio` equals `2 * lcs / (len_a + len_b) * 100`.

use std::collections::BTreeSet;

/// Score multiplier applied to token based scores.
const UNBASE_SCALE: f64 = 0.95;

/// Length ratio at or above which substring matching is considered.
const PARTIAL_LEN_RATIO: f64 = 1.5;

/// Length ratio at or above which substring matches are heavily discounted.
const LONG_LEN_RATIO: f64 = 8.0;

/// Length of the longest common subsequence of two character slices.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut row = vec![0usize; b.len() + 1];
    for &ca in a {
        let mut diagonal = 0;
        for (j, &cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb {
                diagonal + 1
            } else {
                above.max(row[j])
            };
            diagonal = above;
        }
    }
    row[b.len()]
}

/// Indel distance: number of insertions and deletions turning `a` into `b`.
#[must_use]
pub fn indel_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    a.len() + b.len() - 2 * lcs_len(&a, &b)
}

#[allow(clippy::cast_precision_loss)]
fn norm_distance(distance: usize, len_sum: usize) -> f64 {
    if len_sum == 0 {
        return 100.0;
    }
    100.0 - 100.0 * distance as f64 / len_sum as f64
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let len_sum = a.len() + b.len();
    norm_distance(len_sum - 2 * lcs_len(a, b), len_sum)
}

/// Normalized Indel similarity of two whole strings.
#[must_use]
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

/// Best [`ratio`] of `needle` against every same-length window of
/// `haystack`, plus the partial windows hanging off either end.
fn best_window(needle: &[char], haystack: &[char]) -> f64 {
    let n = needle.len();
    let m = haystack.len();
    let mut best = 0.0_f64;

    let windows = (1..n)
        .map(|end| &haystack[..end])
        .chain((0..=m - n).map(|start| &haystack[start..start + n]))
        .chain((m - n + 1..m).map(|start| &haystack[start..]));

    for window in windows {
        best = best.max(ratio_chars(needle, window));
        if best >= 100.0 {
            break;
        }
    }
    best
}

/// Similarity of the shorter string to its best-matching substring of
/// the longer one.
#[must_use]
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    partial_ratio_chars(&a, &b)
}

fn partial_ratio_chars(a: &[char], b: &[char]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let mut best = best_window(short, long);

    // Equal lengths: windows are not symmetric, try both directions.
    if a.len() == b.len() && best < 100.0 {
        best = best.max(best_window(long, short));
    }
    best
}

fn token_set(s: &str) -> BTreeSet<&str> {
    s.split_whitespace().collect()
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn join_set(set: &BTreeSet<&str>) -> String {
    set.iter().copied().collect::<Vec<_>>().join(" ")
}

/// [`ratio`] after sorting the whitespace separated tokens of both strings.
#[must_use]
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

/// Token set similarity: compares the shared tokens against each side's
/// remaining tokens, so a name fully contained in the other scores 100.
#[must_use]
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a = token_set(a);
    let tokens_b = token_set(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection: BTreeSet<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let diff_ab: BTreeSet<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let diff_ba: BTreeSet<&str> = tokens_b.difference(&tokens_a).copied().collect();

    if !intersection.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 100.0;
    }

    let diff_ab_joined = join_set(&diff_ab);
    let diff_ba_joined = join_set(&diff_ba);
    let ab_len = diff_ab_joined.chars().count();
    let ba_len = diff_ba_joined.chars().count();
    let sect_len = join_set(&intersection).chars().count();

    let separator = usize::from(sect_len != 0);
    let sect_ab_len = sect_len + separator + ab_len;
    let sect_ba_len = sect_len + separator + ba_len;

    let distance = indel_distance(&diff_ab_joined, &diff_ba_joined);
    let result = norm_distance(distance, sect_ab_len + sect_ba_len);
    if sect_len == 0 {
        return result;
    }

    let sect_ab_ratio = norm_distance(separator + ab_len, sect_len + sect_ab_len);
    let sect_ba_ratio = norm_distance(separator + ba_len, sect_len + sect_ba_len);

    result.max(sect_ab_ratio).max(sect_ba_ratio)
}

/// Best of [`token_sort_ratio`] and [`token_set_ratio`].
#[must_use]
pub fn token_ratio(a: &str, b: &str) -> f64 {
    token_sort_ratio(a, b).max(token_set_ratio(a, b))
}

/// [`partial_ratio`] over sorted token sets; any shared token scores 100.
#[must_use]
pub fn partial_token_ratio(a: &str, b: &str) -> f64 {
    let tokens_a = token_set(a);
    let tokens_b = token_set(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }
    if tokens_a.intersection(&tokens_b).next().is_some() {
        return 100.0;
    }
    partial_ratio(&join_set(&tokens_a), &join_set(&tokens_b))
}

/// Weighted combination of the plain, partial and token scorers.
///
/// Strings of similar length are compared whole (plain or token ratio);
/// when one is at least 1.5x longer, substring scores are admitted with
/// a 0.9 discount (0.6 past 8x).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn weighted_ratio(a: &str, b: &str) -> f64 {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    if len_a == 0 || len_b == 0 {
        return 0.0;
    }

    let len_ratio = len_a.max(len_b) as f64 / len_a.min(len_b) as f64;
    let end_ratio = ratio(a, b);

    if len_ratio < PARTIAL_LEN_RATIO {
        return end_ratio.max(token_ratio(a, b) * UNBASE_SCALE);
    }

    let partial_scale = if len_ratio < LONG_LEN_RATIO { 0.9 } else { 0.6 };

    end_ratio
        .max(partial_ratio(a, b) * partial_scale)
        .max(partial_token_ratio(a, b) * UNBASE_SCALE * partial_scale)
}
