//! Title sanitizing and comparison-key builders used by the matcher.
//!
//! Comparison strings are derived from a descriptor every time they are
//! needed. Nothing here caches or stores a sanitized title.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Candidate, TrackDescriptor};
use crate::platform::Platform;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Boilerplate words that show up in video titles but never in track names.
pub const NOISE_WORDS: [&str; 13] = [
    "EP", "Full", "Official", "Lyrics", "Lyric", "Video", "Album", "HD", "SD", "HQ", "by",
    "single", "version",
];

/// Separator characters dropped outright: `| & ' _ -`
pub static NOISE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[|&'_-]").unwrap());

/// Parenthesized groups: "(Official Music Video)", "(feat. X)"
pub static PAREN_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").unwrap());

/// Bracketed groups: "[HD]", "[Lyrics]"
pub static BRACKET_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]").unwrap());

/// Whole-word, case-insensitive noise words. Word boundaries keep
/// "Albumantra" or "Byzantine" intact.
pub static NOISE_WORD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let alternation = NOISE_WORDS.join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).unwrap()
});

// ============================================================================
// SANITIZING
// ============================================================================

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip separators, bracketed text and boilerplate words from a raw title.
///
/// Idempotent: `sanitize(&sanitize(x)) == sanitize(x)`.
pub fn sanitize(title: &str) -> String {
    let result = NOISE_CHARS.replace_all(title, "");
    let result = PAREN_GROUP.replace_all(&result, "");
    let result = BRACKET_GROUP.replace_all(&result, "");
    let result = collapse_whitespace(&result);

    // Removing a word leaves its surrounding spaces behind, so collapse again
    let result = NOISE_WORD_PATTERN.replace_all(&result, "");
    collapse_whitespace(&result)
}

// ============================================================================
// COMPARISON STRINGS
// ============================================================================

/// Key the origin track is scored against.
///
/// With artists: sanitized title followed by the space-joined artists.
/// Without artists (YouTube videos) the raw title is used untouched, since
/// it is the only text identifying the track.
pub fn comparison_string(descriptor: &TrackDescriptor) -> String {
    match descriptor.artists() {
        Some(artists) => format!("{} {}", sanitize(descriptor.title()), artists.join(" "))
            .trim()
            .to_string(),
        None => descriptor.title().to_string(),
    }
}

/// Key a search result is scored with: its own name plus its artists.
pub fn candidate_comparison_string(candidate: &Candidate) -> String {
    if candidate.artists.is_empty() {
        return candidate.name.clone();
    }
    format!("{} {}", candidate.name, candidate.artists.join(" "))
        .trim()
        .to_string()
}

/// Search query for finding `origin` on `target`.
///
/// Spotify supports field filters: the sanitized title always goes under
/// `track:`, followed by `artist:<artists>` when the origin credits any.
/// YouTube search is plain full-text and takes the comparison string as-is.
pub fn search_query(origin: &TrackDescriptor, target: Platform) -> String {
    match target {
        Platform::Spotify => {
            let title = sanitize(origin.title());
            match origin.artists() {
                Some(artists) => format!("track:{} artist:{}", title, artists.join(" ")),
                None => format!("track:{}", title),
            }
        }
        Platform::Youtube => comparison_string(origin),
    }
}

// ============================================================================
// TESTS
// ============================================================================
