//! Per-platform music services.
//!
//! Two layers:
//! - [`PlatformClient`]: the thin API wrapper for one platform (search, fetch,
//!   list one page of a playlist, insert, create). Implemented outside this
//!   crate for the real APIs; [`memory::MemoryClient`] serves fixtures.
//! - [`MusicService`]: the capability set the bot works with. One concrete
//!   implementation per platform, picked by [`service_for`].
//!
//! A service is scoped to one set of credentials. It is built without a
//! client when the account has no usable credentials, and then every remote
//! call fails with [`ServiceError::NoCredentials`].

pub mod memory;
pub mod spotify;
pub mod youtube;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::MatchConfig;
use crate::matcher;
use crate::models::{Candidate, PlaylistHandle, TrackDescriptor};
use crate::platform::Platform;

pub use spotify::SpotifyService;
pub use youtube::YoutubeService;

// ============================================================================
// Errors
// ============================================================================

/// Failure reported by a platform API wrapper.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Token missing, expired or revoked
    #[error("credentials rejected by platform")]
    Unauthorized,
    /// Any other API or transport failure, message as reported
    #[error("{0}")]
    Api(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Must reach the caller so it can ask the user to re-authenticate
    #[error("no usable {0} credentials")]
    NoCredentials(Platform),
    #[error("search failed: {0}")]
    SearchFailed(String),
    #[error("{0}")]
    ListFailed(String),
    #[error("{0}")]
    InsertFailed(String),
    #[error("track lookup failed: {0}")]
    LookupFailed(String),
    #[error("track {0} not found")]
    TrackNotFound(String),
    #[error("unsupported link: {0}")]
    UnsupportedLink(String),
    #[error("cannot add a {track} track to a {playlist} playlist")]
    PlatformMismatch { track: Platform, playlist: Platform },
    #[error("track '{0}' has no platform id")]
    Unresolved(String),
    #[error("playlist creation failed: {0}")]
    CreateFailed(String),
}

impl ServiceError {
    /// Map a client failure, keeping credential problems distinct.
    pub fn from_client(
        platform: Platform,
        err: ClientError,
        wrap: impl FnOnce(String) -> ServiceError,
    ) -> Self {
        match err {
            ClientError::Unauthorized => ServiceError::NoCredentials(platform),
            ClientError::Api(message) => wrap(message),
        }
    }

    pub fn is_no_credentials(&self) -> bool {
        matches!(self, ServiceError::NoCredentials(_))
    }
}

// ============================================================================
// Collaborator Contract
// ============================================================================

/// One page of a playlist listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackIdPage {
    pub track_ids: Vec<String>,
    pub next_page: Option<String>,
}

/// Raw insert acknowledgement. Spotify returns a playlist snapshot id on
/// success; YouTube returns the new playlist item and leaves this empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertResponse {
    pub snapshot_id: Option<String>,
}

/// Thin wrapper over one platform's HTTP API. Implementations are expected
/// to fail fast instead of hanging; nothing here retries.
pub trait PlatformClient {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>, ClientError>;

    /// Metadata for one track, `None` if the platform has no such item.
    fn fetch_track(&self, track_id: &str) -> Result<Option<Candidate>, ClientError>;

    /// One page of the track ids in `playlist`. `page_token` is `None` for the
    /// first page and the previous page's `next_page` afterwards.
    fn playlist_page(
        &self,
        playlist: &PlaylistHandle,
        page_token: Option<&str>,
    ) -> Result<TrackIdPage, ClientError>;

    fn insert_track(
        &self,
        playlist: &PlaylistHandle,
        track_id: &str,
    ) -> Result<InsertResponse, ClientError>;

    /// Create a playlist and return its platform id.
    fn create_playlist(&self, name: &str) -> Result<String, ClientError>;
}

// ============================================================================
// Capability Set
// ============================================================================

pub trait MusicService {
    fn platform(&self) -> Platform;

    /// Resolve a shared link into a descriptor for this platform.
    fn get_track_info_from_link(&self, link: &str) -> Result<TrackDescriptor, ServiceError>;

    /// Authoritative set of track ids currently in `playlist`, all pages.
    fn get_track_ids_in_playlist(
        &self,
        playlist: &PlaylistHandle,
    ) -> Result<FxHashSet<String>, ServiceError>;

    /// Unconditional insert. Duplicate checks live in `membership`.
    fn add_track_to_playlist(
        &self,
        track: &TrackDescriptor,
        playlist: &PlaylistHandle,
    ) -> Result<(), ServiceError>;

    fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>, ServiceError>;

    /// Best equivalent of `origin` on this platform, if any.
    fn fuzzy_search_for_track(
        &self,
        origin: &TrackDescriptor,
        config: &MatchConfig,
    ) -> Result<Option<TrackDescriptor>, ServiceError> {
        matcher::find_best_match(self, origin, config)
    }

    fn create_playlist(&self, name: &str) -> Result<PlaylistHandle, ServiceError>;
}

/// Build the service for `platform`. `client` is `None` when the account has
/// no usable credentials for that platform.
pub fn service_for(
    platform: Platform,
    client: Option<Arc<dyn PlatformClient>>,
) -> Box<dyn MusicService> {
    match platform {
        Platform::Youtube => Box::new(YoutubeService::new(client)),
        Platform::Spotify => Box::new(SpotifyService::new(client)),
    }
}

// ============================================================================
// Shared Helpers
// ============================================================================

pub(crate) fn require_client(
    platform: Platform,
    client: &Option<Arc<dyn PlatformClient>>,
) -> Result<&dyn PlatformClient, ServiceError> {
    client
        .as_deref()
        .ok_or(ServiceError::NoCredentials(platform))
}

/// Track id to insert, after checking the track and playlist belong to
/// `platform`.
pub(crate) fn insertable_track_id<'a>(
    platform: Platform,
    track: &'a TrackDescriptor,
    playlist: &PlaylistHandle,
) -> Result<&'a str, ServiceError> {
    if track.platform() != platform || playlist.platform != platform {
        return Err(ServiceError::PlatformMismatch {
            track: track.platform(),
            playlist: playlist.platform,
        });
    }
    track
        .track_id()
        .ok_or_else(|| ServiceError::Unresolved(track.display_name()))
}
