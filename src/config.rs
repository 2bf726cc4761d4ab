//! Matcher tuning knobs.
//!
//! The numbers are empirical and kept exactly as the playlist bot has always
//! used them; changing them changes which tracks get mirrored.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::platform::Platform;

// ============================================================================
// Score Thresholds
// ============================================================================

/// Token-set score a YouTube result must exceed
pub const YOUTUBE_SET_THRESHOLD: u8 = 85;

/// Token-set score a Spotify result must exceed
pub const SPOTIFY_SET_THRESHOLD: u8 = 75;

/// Token-sort score a token-set survivor must exceed
pub const SORT_THRESHOLD: u8 = 65;

// ============================================================================
// Disambiguation Bonuses
// ============================================================================

/// Per artist name found in the origin video's description
pub const DESCRIPTION_BONUS: u32 = 10;

/// Per artist name found in the origin video's channel title
pub const CHANNEL_TITLE_BONUS: u32 = 25;

// ============================================================================
// Search Limits
// ============================================================================

pub const YOUTUBE_SEARCH_LIMIT: usize = 10;
pub const SPOTIFY_SEARCH_LIMIT: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub youtube_set_threshold: u8,
    pub spotify_set_threshold: u8,
    pub sort_threshold: u8,
    pub description_bonus: u32,
    pub channel_title_bonus: u32,
    pub youtube_search_limit: usize,
    pub spotify_search_limit: usize,
    /// Also run the token-sort pass when several YouTube results survive the
    /// token-set pass. Off by default: historically only Spotify searches
    /// get it, and YouTube picks the best token-set score instead.
    pub sort_stage_for_youtube: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            youtube_set_threshold: YOUTUBE_SET_THRESHOLD,
            spotify_set_threshold: SPOTIFY_SET_THRESHOLD,
            sort_threshold: SORT_THRESHOLD,
            description_bonus: DESCRIPTION_BONUS,
            channel_title_bonus: CHANNEL_TITLE_BONUS,
            youtube_search_limit: YOUTUBE_SEARCH_LIMIT,
            spotify_search_limit: SPOTIFY_SEARCH_LIMIT,
            sort_stage_for_youtube: false,
        }
    }
}

impl MatchConfig {
    pub fn set_threshold(&self, target: Platform) -> u8 {
        match target {
            Platform::Youtube => self.youtube_set_threshold,
            Platform::Spotify => self.spotify_set_threshold,
        }
    }

    pub fn search_limit(&self, target: Platform) -> usize {
        match target {
            Platform::Youtube => self.youtube_search_limit,
            Platform::Spotify => self.spotify_search_limit,
        }
    }

    /// Whether several token-set survivors on `target` go through the
    /// token-sort pass and tie-breaks.
    pub fn uses_sort_stage(&self, target: Platform) -> bool {
        match target {
            Platform::Spotify => true,
            Platform::Youtube => self.sort_stage_for_youtube,
        }
    }

    /// Load a (possibly partial) JSON config. Missing fields keep defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        load_json(path)
    }
}

/// Command-line overrides layered on top of a loaded config.
#[derive(Debug, Clone, Default, PartialEq, Eq, clap::Args)]
pub struct ConfigOverrides {
    /// Token-set threshold for YouTube results
    #[arg(long)]
    pub youtube_threshold: Option<u8>,

    /// Token-set threshold for Spotify results
    #[arg(long)]
    pub spotify_threshold: Option<u8>,

    /// Token-sort threshold
    #[arg(long)]
    pub sort_threshold: Option<u8>,

    /// Run the token-sort pass for YouTube searches too
    #[arg(long)]
    pub sort_stage_for_youtube: bool,
}

impl ConfigOverrides {
    pub fn apply(&self, mut config: MatchConfig) -> MatchConfig {
        if let Some(threshold) = self.youtube_threshold {
            config.youtube_set_threshold = threshold;
        }
        if let Some(threshold) = self.spotify_threshold {
            config.spotify_set_threshold = threshold;
        }
        if let Some(threshold) = self.sort_threshold {
            config.sort_threshold = threshold;
        }
        if self.sort_stage_for_youtube {
            config.sort_stage_for_youtube = true;
        }
        config
    }
}

/// Read and deserialize a JSON document (configs, session fixtures).
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}
