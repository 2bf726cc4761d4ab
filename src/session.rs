//! Per-session context: one credential-scoped service per platform, the
//! matcher config and the batch's membership cache.
//!
//! Nothing here is process-wide. A session is created for one logical
//! request (a shared link, a manual entry, a replay run) and dropped after.

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use crate::config::{load_json, ConfigError, MatchConfig};
use crate::matcher;
use crate::membership::{add_if_absent, MembershipCache};
use crate::models::{AddOutcome, MatchReport, PlaylistHandle, TrackDescriptor};
use crate::platform::Platform;
use crate::services::memory::{MemoryClient, MemoryFixture};
use crate::services::{service_for, MusicService, PlatformClient, ServiceError};

pub struct Session {
    youtube: Box<dyn MusicService>,
    spotify: Box<dyn MusicService>,
    config: MatchConfig,
    cache: MembershipCache,
}

impl Session {
    /// A `None` client means the account has no usable credentials there.
    pub fn new(
        youtube: Option<Arc<dyn PlatformClient>>,
        spotify: Option<Arc<dyn PlatformClient>>,
        config: MatchConfig,
    ) -> Self {
        Self {
            youtube: service_for(Platform::Youtube, youtube),
            spotify: service_for(Platform::Spotify, spotify),
            config,
            cache: MembershipCache::new(),
        }
    }

    pub fn service(&self, platform: Platform) -> &dyn MusicService {
        match platform {
            Platform::Youtube => self.youtube.as_ref(),
            Platform::Spotify => self.spotify.as_ref(),
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Resolve a shared link through the service of the platform it names.
    pub fn resolve_link(&self, link: &str) -> Result<TrackDescriptor, ServiceError> {
        let platform = Platform::from_link(link)
            .ok_or_else(|| ServiceError::UnsupportedLink(link.to_string()))?;
        self.service(platform).get_track_info_from_link(link)
    }

    pub fn find_best_match(
        &self,
        origin: &TrackDescriptor,
        target: Platform,
    ) -> Result<Option<TrackDescriptor>, ServiceError> {
        self.service(target).fuzzy_search_for_track(origin, &self.config)
    }

    pub fn explain_match(
        &self,
        origin: &TrackDescriptor,
        target: Platform,
    ) -> Result<MatchReport, ServiceError> {
        matcher::explain_match(self.service(target), origin, &self.config)
    }

    pub fn add_if_absent(
        &mut self,
        track: &TrackDescriptor,
        playlist: &PlaylistHandle,
    ) -> Result<AddOutcome, ServiceError> {
        let service = match playlist.platform {
            Platform::Youtube => self.youtube.as_ref(),
            Platform::Spotify => self.spotify.as_ref(),
        };
        add_if_absent(service, track, playlist, &mut self.cache)
    }

    pub fn create_playlist(
        &self,
        platform: Platform,
        name: &str,
    ) -> Result<PlaylistHandle, ServiceError> {
        self.service(platform).create_playlist(name)
    }

    /// Forget every cached playlist listing.
    pub fn reset_cache(&mut self) {
        self.cache.clear();
    }
}

/// Recorded API responses for an offline session, as loaded by the CLI.
///
/// A platform without a fixture behaves like an account without
/// credentials for it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionFixture {
    pub youtube: Option<MemoryFixture>,
    pub spotify: Option<MemoryFixture>,
    /// Playlists registered for the channel
    pub playlists: Vec<PlaylistHandle>,
}

impl SessionFixture {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        load_json(path)
    }

    pub fn into_session(self, config: MatchConfig) -> (Session, Vec<PlaylistHandle>) {
        let client = |fixture: Option<MemoryFixture>| {
            fixture.map(|f| Arc::new(MemoryClient::new(f)) as Arc<dyn PlatformClient>)
        };
        let session = Session::new(client(self.youtube), client(self.spotify), config);
        (session, self.playlists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candidate, RawMetadata};
    use std::io::Write;

    #[test]
    fn test_missing_fixture_means_no_credentials() {
        let (session, playlists) = SessionFixture::default().into_session(MatchConfig::default());
        assert!(playlists.is_empty());
        assert_eq!(
            session.resolve_link("https://youtu.be/XPpTgCho5ZA"),
            Err(ServiceError::NoCredentials(Platform::Youtube))
        );
    }

    #[test]
    fn test_resolve_link_rejects_unknown_host() {
        let (session, _) = SessionFixture::default().into_session(MatchConfig::default());
        assert!(matches!(
            session.resolve_link("https://example.com/song"),
            Err(ServiceError::UnsupportedLink(_))
        ));
    }

    #[test]
    fn test_fixture_file_round_trip_through_session() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "spotify": {{
                    "tracks": [{{"id": "6ECp64rv50XVz93WvxXMGF", "name": "This Love",
                                 "artists": ["Maroon 5"]}}],
                    "playlists": {{"sp1": []}}
                }},
                "playlists": [{{"platform": "spotify", "platform_id": "sp1", "name": "Jams"}}]
            }}"#
        )
        .unwrap();

        let fixture = SessionFixture::from_json_file(file.path()).unwrap();
        let (mut session, playlists) = fixture.into_session(MatchConfig::default());
        let track = session
            .resolve_link("spotify:track:6ECp64rv50XVz93WvxXMGF")
            .unwrap();
        assert_eq!(track.display_name(), "This Love - Maroon 5");

        assert_eq!(session.add_if_absent(&track, &playlists[0]).unwrap(), AddOutcome::Added);
        assert_eq!(
            session.add_if_absent(&track, &playlists[0]).unwrap(),
            AddOutcome::AlreadyPresent
        );

        // Remote listing still has it after the cache is dropped
        session.reset_cache();
        assert_eq!(
            session.add_if_absent(&track, &playlists[0]).unwrap(),
            AddOutcome::AlreadyPresent
        );
        assert_eq!(session.config(), &MatchConfig::default());
    }

    #[test]
    fn test_find_best_match_uses_target_service() {
        let youtube = MemoryFixture {
            search_results: vec![Candidate {
                id: "XPpTgCho5ZA".to_string(),
                name: "Maroon 5 - This Love (Official Music Video)".to_string(),
                artists: vec![],
                metadata: RawMetadata::default(),
            }],
            ..MemoryFixture::default()
        };
        let fixture = SessionFixture {
            youtube: Some(youtube),
            ..SessionFixture::default()
        };
        let (session, _) = fixture.into_session(MatchConfig::default());
        let origin = TrackDescriptor::unresolved(
            "This Love",
            Some(vec!["Maroon 5".to_string()]),
            Platform::Spotify,
        );

        let matched = session.find_best_match(&origin, Platform::Youtube).unwrap().unwrap();
        assert_eq!(matched.platform(), Platform::Youtube);
        assert_eq!(
            session.find_best_match(&origin, Platform::Spotify),
            Err(ServiceError::NoCredentials(Platform::Spotify))
        );
    }

    #[test]
    fn test_create_playlist() {
        let fixture = SessionFixture {
            youtube: Some(MemoryFixture::default()),
            ..SessionFixture::default()
        };
        let (session, _) = fixture.into_session(MatchConfig::default());
        let playlist = session.create_playlist(Platform::Youtube, "Friday").unwrap();
        assert_eq!(playlist.platform, Platform::Youtube);
    }
}
