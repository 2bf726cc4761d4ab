//! Pairwise similarity scoring between a target comparison string and a
//! search candidate.
//!
//! Two token-based measures, both on a 0-100 integer scale:
//! - token-set ratio: compares the shared tokens against each side's
//!   leftovers, so extra or missing words cost little (first-pass filter)
//! - token-sort ratio: compares the full sorted token lists, so word order is
//!   ignored but every extra token counts (second-pass tie-break)
//!
//! The ratios follow fuzzywuzzy's token ratios with three known differences:
//! `_` counts as a separator, non-ASCII letters are kept rather than
//! stripped ("beyoncé" and "beyonce" do not score 100), and halves round
//! away from zero instead of to even.

use std::collections::BTreeSet;

use rapidfuzz::distance::indel;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMode {
    Set,
    Sort,
}

// ============================================================================
// Preprocessing
// ============================================================================

/// Lowercase, turn every non-alphanumeric character into a space and collapse
/// runs of whitespace.
pub fn process(s: &str) -> String {
    let replaced: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// Ratios
// ============================================================================

/// Indel similarity of two strings scaled to 0-100. Empty input scores 0.
pub fn ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let similarity = indel::normalized_similarity(a.chars(), b.chars());
    (similarity * 100.0).round().clamp(0.0, 100.0) as u8
}

fn sorted_tokens(processed: &str) -> String {
    let mut tokens: Vec<&str> = processed.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Ratio of the alphabetically sorted token lists.
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    let pa = process(a);
    let pb = process(b);
    if pa.is_empty() || pb.is_empty() {
        return 0;
    }
    ratio(&sorted_tokens(&pa), &sorted_tokens(&pb))
}

/// Best ratio among: intersection vs intersection+leftovers of either side,
/// and the two intersection+leftovers strings against each other.
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    let pa = process(a);
    let pb = process(b);
    if pa.is_empty() || pb.is_empty() {
        return 0;
    }

    let tokens_a: BTreeSet<&str> = pa.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = pb.split_whitespace().collect();

    let join = |set: Vec<&str>| set.join(" ");
    let sect = join(tokens_a.intersection(&tokens_b).copied().collect());
    let diff_ab = join(tokens_a.difference(&tokens_b).copied().collect());
    let diff_ba = join(tokens_b.difference(&tokens_a).copied().collect());

    let combined_ab = format!("{} {}", sect, diff_ab).trim().to_string();
    let combined_ba = format!("{} {}", sect, diff_ba).trim().to_string();

    [
        ratio(&sect, &combined_ab),
        ratio(&sect, &combined_ba),
        ratio(&combined_ab, &combined_ba),
    ]
    .into_iter()
    .max()
    .unwrap_or(0)
}

/// Score a candidate display string against the target. Both sides are
/// lower-cased first; the result is deterministic for the same inputs.
pub fn score(target: &str, candidate: &str, mode: ScoreMode) -> u8 {
    let target = target.to_lowercase();
    let candidate = candidate.to_lowercase();
    match mode {
        ScoreMode::Set => token_set_ratio(&target, &candidate),
        ScoreMode::Sort => token_sort_ratio(&target, &candidate),
    }
}
