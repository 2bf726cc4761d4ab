//! Cross-platform matching: find the target-platform equivalent of a track.
//!
//! Staged pipeline, each stage narrowing the candidate pool:
//! 1. Search the target platform with a query built from the origin.
//! 2. Token-set filter: keep candidates scoring strictly above the target's
//!    threshold. A single survivor wins immediately.
//! 3. Token-sort filter (Spotify targets, or YouTube when configured): keep
//!    survivors strictly above the sort threshold, then only those tied at
//!    the best sort score.
//! 4. Disambiguation: artist mentions in the origin video's description and
//!    channel title, then popularity.
//!
//! No match is a normal outcome (`Ok(None)`). Search failures are recovered
//! as no match; missing credentials are not.

use tracing::{debug, info, warn};

use crate::config::MatchConfig;
use crate::models::{Candidate, MatchReport, MatchStage, ScoredCandidate, TrackDescriptor};
use crate::normalize::{candidate_comparison_string, comparison_string, search_query};
use crate::platform::Platform;
use crate::scoring::{score, ScoreMode};
use crate::services::{MusicService, ServiceError};

/// Best equivalent of `origin` on `service`'s platform.
pub fn find_best_match<S: MusicService + ?Sized>(
    service: &S,
    origin: &TrackDescriptor,
    config: &MatchConfig,
) -> Result<Option<TrackDescriptor>, ServiceError> {
    explain_match(service, origin, config).map(|report| report.winner)
}

/// Run the matcher and keep every intermediate score.
pub fn explain_match<S: MusicService + ?Sized>(
    service: &S,
    origin: &TrackDescriptor,
    config: &MatchConfig,
) -> Result<MatchReport, ServiceError> {
    let target = service.platform();
    let mut report = MatchReport {
        target,
        query: search_query(origin, target),
        comparison: comparison_string(origin),
        candidates: Vec::new(),
        stage: MatchStage::NoCandidates,
        winner: None,
    };

    let mut candidates = match service.search(&report.query, config.search_limit(target)) {
        Ok(candidates) => candidates,
        Err(e) if e.is_no_credentials() => return Err(e),
        Err(e) => {
            warn!(target = %target, query = %report.query, error = %e, "Search failed");
            report.stage = MatchStage::SearchFailed;
            return Ok(report);
        }
    };
    if candidates.is_empty() {
        debug!(target = %target, query = %report.query, "No search results");
        return Ok(report);
    }

    report.candidates = candidates
        .iter()
        .map(|c| {
            let comparison = candidate_comparison_string(c);
            ScoredCandidate {
                id: c.id.clone(),
                set_score: score(&report.comparison, &comparison, ScoreMode::Set),
                comparison,
                sort_score: None,
                artist_bonus: None,
                popularity: c.popularity(),
            }
        })
        .collect();

    let selected = select(&mut report.candidates, &candidates, origin, target, config);
    let Some((index, stage)) = selected else {
        debug!(
            target = %target,
            query = %report.query,
            results = candidates.len(),
            "Nothing cleared the token-set threshold"
        );
        report.stage = MatchStage::BelowSetThreshold;
        return Ok(report);
    };

    let winner = candidates.swap_remove(index).into_descriptor(target);
    info!(
        target = %target,
        origin = %origin.display_name(),
        matched = %winner.display_name(),
        stage = ?stage,
        "Matched track"
    );
    report.stage = stage;
    report.winner = Some(winner);
    Ok(report)
}

/// Index of the winning candidate and the stage that decided it.
fn select(
    scored: &mut [ScoredCandidate],
    candidates: &[Candidate],
    origin: &TrackDescriptor,
    target: Platform,
    config: &MatchConfig,
) -> Option<(usize, MatchStage)> {
    let threshold = config.set_threshold(target);
    let survivors: Vec<usize> = (0..scored.len())
        .filter(|&i| scored[i].set_score > threshold)
        .collect();
    debug!(target = %target, threshold, survivors = survivors.len(), "Token-set stage");

    match survivors.as_slice() {
        [] => None,
        [only] => Some((*only, MatchStage::SetSurvivor)),
        _ if !config.uses_sort_stage(target) => {
            first_max_by_key(&survivors, |i| u32::from(scored[i].set_score))
                .map(|i| (i, MatchStage::SetBest))
        }
        _ => sort_stage(scored, candidates, &survivors, origin, config),
    }
}

fn sort_stage(
    scored: &mut [ScoredCandidate],
    candidates: &[Candidate],
    survivors: &[usize],
    origin: &TrackDescriptor,
    config: &MatchConfig,
) -> Option<(usize, MatchStage)> {
    let comparison = comparison_string(origin);
    for &i in survivors {
        scored[i].sort_score = Some(score(&comparison, &scored[i].comparison, ScoreMode::Sort));
    }

    let retained: Vec<usize> = survivors
        .iter()
        .copied()
        .filter(|&i| scored[i].sort_score.is_some_and(|s| s > config.sort_threshold))
        .collect();

    // Nobody cleared the sort threshold: every token-set survivor stays in play
    let best = retained.iter().filter_map(|&i| scored[i].sort_score).max();
    let pool: Vec<usize> = match best {
        Some(best) => retained
            .into_iter()
            .filter(|&i| scored[i].sort_score == Some(best))
            .collect(),
        None => survivors.to_vec(),
    };
    debug!(threshold = config.sort_threshold, tied = pool.len(), "Token-sort stage");

    if let [only] = pool.as_slice() {
        return Some((*only, MatchStage::SortSurvivor));
    }
    disambiguate(scored, candidates, &pool, origin, config)
}

fn disambiguate(
    scored: &mut [ScoredCandidate],
    candidates: &[Candidate],
    pool: &[usize],
    origin: &TrackDescriptor,
    config: &MatchConfig,
) -> Option<(usize, MatchStage)> {
    let by_popularity =
        |indices: &[usize]| first_max_by_key(indices, |i| candidates[i].popularity());

    if origin.platform() == Platform::Spotify {
        return by_popularity(pool).map(|i| (i, MatchStage::Popularity));
    }

    let description = origin.description().to_lowercase();
    let channel_title = origin.channel_title().to_lowercase();
    for &i in pool {
        scored[i].artist_bonus = Some(artist_bonus(
            &candidates[i].artists,
            &description,
            &channel_title,
            config,
        ));
    }

    let best = pool
        .iter()
        .filter_map(|&i| scored[i].artist_bonus)
        .max()
        .unwrap_or(0);
    if best == 0 {
        debug!("No artist mentions, falling back to popularity");
        return by_popularity(pool).map(|i| (i, MatchStage::Popularity));
    }

    let top: Vec<usize> = pool
        .iter()
        .copied()
        .filter(|&i| scored[i].artist_bonus == Some(best))
        .collect();
    by_popularity(&top).map(|i| (i, MatchStage::ArtistMention))
}

/// Points for each credited artist named in the origin's description or
/// channel title. Both texts must already be lowercased.
fn artist_bonus(
    artists: &[String],
    description: &str,
    channel_title: &str,
    config: &MatchConfig,
) -> u32 {
    artists
        .iter()
        .map(|artist| artist.to_lowercase())
        .filter(|artist| !artist.is_empty())
        .map(|artist| {
            let mut bonus = 0;
            if description.contains(&artist) {
                bonus += config.description_bonus;
            }
            if channel_title.contains(&artist) {
                bonus += config.channel_title_bonus;
            }
            bonus
        })
        .sum()
}

/// First index (in search order) holding the maximum key.
fn first_max_by_key(indices: &[usize], key: impl Fn(usize) -> u32) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for &i in indices {
        let k = key(i);
        if best.map_or(true, |(_, b)| k > b) {
            best = Some((i, k));
        }
    }
    best.map(|(i, _)| i)
}
