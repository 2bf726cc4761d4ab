//! Core data models shared by the matcher, the membership checker and the
//! per-platform services.
//!
//! Descriptors are immutable value objects: they are built once from a
//! platform response and replaced, never mutated. Comparison keys are always
//! derived on demand (see `normalize`), never stored.

use serde::{Deserialize, Serialize};

use crate::platform::Platform;

// ============================================================================
// Platform Metadata
// ============================================================================

/// Album artwork as reported by Spotify.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Platform-specific payload kept around for disambiguation and display.
///
/// YouTube fills `description`, `channel_title` and `thumbnail_url` from the
/// video snippet; Spotify fills `popularity` (0-100) and `images`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMetadata {
    pub description: Option<String>,
    pub channel_title: Option<String>,
    pub thumbnail_url: Option<String>,
    pub popularity: Option<u32>,
    pub images: Vec<Image>,
}

// ============================================================================
// Track Descriptor
// ============================================================================

/// Normalized identity of a track on one platform.
///
/// `track_id` is present only for resolved tracks (fetched from a link or
/// picked out of search results). Manual entries and search origins built
/// from user input stay unresolved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    title: String,
    #[serde(default)]
    artists: Option<Vec<String>>,
    platform: Platform,
    #[serde(default)]
    track_id: Option<String>,
    #[serde(default)]
    metadata: Option<RawMetadata>,
    #[serde(default)]
    source_link: Option<String>,
}

impl TrackDescriptor {
    /// A track known only by title/artist, not yet found on any platform.
    pub fn unresolved(
        title: impl Into<String>,
        artists: Option<Vec<String>>,
        platform: Platform,
    ) -> Self {
        Self {
            title: title.into(),
            artists: non_empty(artists),
            platform,
            track_id: None,
            metadata: None,
            source_link: None,
        }
    }

    /// A track with a platform-native id.
    pub fn resolved(
        platform: Platform,
        track_id: impl Into<String>,
        title: impl Into<String>,
        artists: Option<Vec<String>>,
        metadata: Option<RawMetadata>,
    ) -> Self {
        Self {
            title: title.into(),
            artists: non_empty(artists),
            platform,
            track_id: Some(track_id.into()),
            metadata,
            source_link: None,
        }
    }

    /// Record the link this descriptor was resolved from.
    pub fn with_source_link(mut self, link: impl Into<String>) -> Self {
        self.source_link = Some(link.into());
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Credited artists in platform order. `None` when the platform has no
    /// separate artist field (YouTube) or none were given.
    pub fn artists(&self) -> Option<&[String]> {
        self.artists.as_deref()
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn track_id(&self) -> Option<&str> {
        self.track_id.as_deref()
    }

    pub fn is_resolved(&self) -> bool {
        self.track_id.is_some()
    }

    pub fn metadata(&self) -> Option<&RawMetadata> {
        self.metadata.as_ref()
    }

    pub fn source_link(&self) -> Option<&str> {
        self.source_link.as_deref()
    }

    pub fn description(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|m| m.description.as_deref())
            .unwrap_or("")
    }

    pub fn channel_title(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|m| m.channel_title.as_deref())
            .unwrap_or("")
    }

    pub fn popularity(&self) -> u32 {
        self.metadata
            .as_ref()
            .and_then(|m| m.popularity)
            .unwrap_or(0)
    }

    /// "Title - Artist1, Artist2", or just the title without artists.
    pub fn display_name(&self) -> String {
        match self.artists() {
            Some(artists) => format!("{} - {}", self.title, artists.join(", ")),
            None => self.title.clone(),
        }
    }

    pub fn open_url(&self) -> Option<String> {
        if let Some(link) = &self.source_link {
            return Some(link.clone());
        }
        self.track_id.as_deref().map(|id| self.platform.track_url(id))
    }

    /// YouTube: the default thumbnail. Spotify: the smallest album image.
    pub fn image_url(&self) -> Option<&str> {
        let metadata = self.metadata.as_ref()?;
        match self.platform {
            Platform::Youtube => metadata.thumbnail_url.as_deref(),
            Platform::Spotify => metadata
                .images
                .iter()
                .min_by_key(|im| im.height.unwrap_or(u32::MAX))
                .map(|im| im.url.as_str()),
        }
    }
}

fn non_empty(artists: Option<Vec<String>>) -> Option<Vec<String>> {
    artists.filter(|a| !a.is_empty())
}

// ============================================================================
// Search Candidates
// ============================================================================

/// One raw search result. Lives only for the duration of a single match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub metadata: RawMetadata,
}

impl Candidate {
    pub fn popularity(&self) -> u32 {
        self.metadata.popularity.unwrap_or(0)
    }

    pub fn into_descriptor(self, platform: Platform) -> TrackDescriptor {
        let artists = if self.artists.is_empty() {
            None
        } else {
            Some(self.artists)
        };
        TrackDescriptor::resolved(platform, self.id, self.name, artists, Some(self.metadata))
    }
}

// ============================================================================
// Playlists
// ============================================================================

/// A playlist on a streaming platform, owned by the playlist directory.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaylistHandle {
    pub platform: Platform,
    pub platform_id: String,
    #[serde(default)]
    pub name: String,
}

impl PlaylistHandle {
    pub fn new(
        platform: Platform,
        platform_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            platform_id: platform_id.into(),
            name: name.into(),
        }
    }
}

/// Result of an idempotent add.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
    Failed(String),
}

// ============================================================================
// Match Reporting
// ============================================================================

/// Where a matcher invocation terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStage {
    /// Search collaborator errored (recovered as no match)
    SearchFailed,
    /// Search returned nothing
    NoCandidates,
    /// Nobody cleared the token-set threshold
    BelowSetThreshold,
    /// Exactly one token-set survivor
    SetSurvivor,
    /// Several token-set survivors, best token-set score taken (no sort stage)
    SetBest,
    /// Exactly one candidate at the top token-sort score
    SortSurvivor,
    /// Tie broken by artist mentions in the origin's description/channel
    ArtistMention,
    /// Tie broken by platform popularity
    Popularity,
}

impl MatchStage {
    pub fn is_match(self) -> bool {
        !matches!(
            self,
            MatchStage::SearchFailed | MatchStage::NoCandidates | MatchStage::BelowSetThreshold
        )
    }
}

/// Per-candidate scores collected while matching, for logging and replay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScoredCandidate {
    pub id: String,
    pub comparison: String,
    pub set_score: u8,
    pub sort_score: Option<u8>,
    pub artist_bonus: Option<u32>,
    pub popularity: u32,
}

/// Full trace of one matcher invocation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchReport {
    pub target: Platform,
    pub query: String,
    pub comparison: String,
    pub candidates: Vec<ScoredCandidate>,
    pub stage: MatchStage,
    pub winner: Option<TrackDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spotify_track() -> TrackDescriptor {
        TrackDescriptor::resolved(
            Platform::Spotify,
            "6ECp64rv50XVz93WvxXMGF",
            "This Love",
            Some(vec!["Maroon 5".to_string()]),
            Some(RawMetadata {
                popularity: Some(77),
                images: vec![
                    Image { url: "big".to_string(), height: Some(640) },
                    Image { url: "small".to_string(), height: Some(64) },
                    Image { url: "medium".to_string(), height: Some(300) },
                ],
                ..RawMetadata::default()
            }),
        )
    }

    #[test]
    fn test_display_name() {
        assert_eq!(spotify_track().display_name(), "This Love - Maroon 5");
        let yt = TrackDescriptor::unresolved("Maroon 5 - This Love", None, Platform::Youtube);
        assert_eq!(yt.display_name(), "Maroon 5 - This Love");
    }

    #[test]
    fn test_empty_artists_are_absent() {
        let t = TrackDescriptor::unresolved("Song", Some(vec![]), Platform::Spotify);
        assert!(t.artists().is_none());
    }

    #[test]
    fn test_open_url_prefers_source_link() {
        let track = spotify_track();
        assert_eq!(
            track.open_url().as_deref(),
            Some("https://open.spotify.com/track/6ECp64rv50XVz93WvxXMGF")
        );
        let linked = track.with_source_link("spotify:track:6ECp64rv50XVz93WvxXMGF");
        assert_eq!(linked.open_url().as_deref(), Some("spotify:track:6ECp64rv50XVz93WvxXMGF"));

        let unresolved = TrackDescriptor::unresolved("Song", None, Platform::Youtube);
        assert!(unresolved.open_url().is_none());
        assert!(!unresolved.is_resolved());
    }

    #[test]
    fn test_image_url() {
        assert_eq!(spotify_track().image_url(), Some("small"));

        let yt = TrackDescriptor::resolved(
            Platform::Youtube,
            "XPpTgCho5ZA",
            "Maroon 5 - This Love",
            None,
            Some(RawMetadata {
                thumbnail_url: Some("https://i.ytimg.com/vi/XPpTgCho5ZA/default.jpg".to_string()),
                ..RawMetadata::default()
            }),
        );
        assert_eq!(yt.image_url(), Some("https://i.ytimg.com/vi/XPpTgCho5ZA/default.jpg"));
    }

    #[test]
    fn test_metadata_accessors_default_empty() {
        let t = TrackDescriptor::unresolved("Song", None, Platform::Youtube);
        assert_eq!(t.description(), "");
        assert_eq!(t.channel_title(), "");
        assert_eq!(t.popularity(), 0);
    }

    #[test]
    fn test_candidate_into_descriptor() {
        let c = Candidate {
            id: "abc".to_string(),
            name: "Video".to_string(),
            artists: vec![],
            metadata: RawMetadata::default(),
        };
        let d = c.into_descriptor(Platform::Youtube);
        assert_eq!(d.track_id(), Some("abc"));
        assert!(d.artists().is_none());
        assert_eq!(d.platform(), Platform::Youtube);
    }

    #[test]
    fn test_match_stage_is_match() {
        assert!(!MatchStage::SearchFailed.is_match());
        assert!(!MatchStage::NoCandidates.is_match());
        assert!(!MatchStage::BelowSetThreshold.is_match());
        assert!(MatchStage::SetSurvivor.is_match());
        assert!(MatchStage::Popularity.is_match());
    }
}
