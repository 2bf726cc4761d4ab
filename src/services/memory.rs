//! In-memory [`PlatformClient`] serving recorded API responses.
//!
//! Used by the test suite and by the CLI tools to replay matching and
//! mirroring offline. Playlist listings are paginated like the real APIs and
//! inserts mutate the stored playlists, so duplicate checks behave the same
//! way they do against a live account.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{ClientError, InsertResponse, PlatformClient, TrackIdPage};
use crate::models::{Candidate, PlaylistHandle};

/// Page size used when the fixture does not set one (YouTube's maximum).
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Recorded responses for one platform account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryFixture {
    /// Returned for every search, truncated to the requested limit
    pub search_results: Vec<Candidate>,
    pub search_error: Option<String>,
    /// Items returned by metadata lookups, keyed by their id
    pub tracks: Vec<Candidate>,
    pub fetch_error: Option<String>,
    /// Playlist platform id -> track ids in playlist order
    pub playlists: BTreeMap<String, Vec<String>>,
    pub page_size: usize,
    pub list_error: Option<String>,
    pub insert_error: Option<String>,
    /// Acknowledge inserts without a snapshot id (Spotify rejection)
    pub omit_snapshot: bool,
    /// Reject every call as if the token had been revoked
    pub unauthorized: bool,
}

#[derive(Debug, Default)]
struct State {
    playlists: BTreeMap<String, Vec<String>>,
    searches: Vec<(String, usize)>,
    inserts: Vec<(String, String)>,
    list_calls: usize,
    created: usize,
}

#[derive(Debug)]
pub struct MemoryClient {
    fixture: MemoryFixture,
    state: Mutex<State>,
}

impl MemoryClient {
    pub fn new(fixture: MemoryFixture) -> Self {
        let state = State {
            playlists: fixture.playlists.clone(),
            ..State::default()
        };
        Self {
            fixture,
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_auth(&self) -> Result<(), ClientError> {
        if self.fixture.unauthorized {
            Err(ClientError::Unauthorized)
        } else {
            Ok(())
        }
    }

    fn page_size(&self) -> usize {
        if self.fixture.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.fixture.page_size
        }
    }

    /// `(playlist id, track id)` for every insert attempted, in order.
    pub fn insert_calls(&self) -> Vec<(String, String)> {
        self.state().inserts.clone()
    }

    /// `(query, limit)` for every search issued, in order.
    pub fn search_calls(&self) -> Vec<(String, usize)> {
        self.state().searches.clone()
    }

    /// Number of playlist pages served.
    pub fn list_calls(&self) -> usize {
        self.state().list_calls
    }

    pub fn playlist_track_ids(&self, playlist_id: &str) -> Vec<String> {
        self.state()
            .playlists
            .get(playlist_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl PlatformClient for MemoryClient {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>, ClientError> {
        self.check_auth()?;
        self.state().searches.push((query.to_string(), limit));
        if let Some(message) = &self.fixture.search_error {
            return Err(ClientError::Api(message.clone()));
        }
        Ok(self
            .fixture
            .search_results
            .iter()
            .take(limit)
            .cloned()
            .collect())
    }

    fn fetch_track(&self, track_id: &str) -> Result<Option<Candidate>, ClientError> {
        self.check_auth()?;
        if let Some(message) = &self.fixture.fetch_error {
            return Err(ClientError::Api(message.clone()));
        }
        Ok(self.fixture.tracks.iter().find(|t| t.id == track_id).cloned())
    }

    fn playlist_page(
        &self,
        playlist: &PlaylistHandle,
        page_token: Option<&str>,
    ) -> Result<TrackIdPage, ClientError> {
        self.check_auth()?;
        if let Some(message) = &self.fixture.list_error {
            return Err(ClientError::Api(message.clone()));
        }

        let start = match page_token {
            None => 0,
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| ClientError::Api(format!("invalid page token '{}'", token)))?,
        };

        let page_size = self.page_size();
        let mut state = self.state();
        state.list_calls += 1;
        let ids = state
            .playlists
            .get(&playlist.platform_id)
            .ok_or_else(|| {
                ClientError::Api(format!("playlist {} not found", playlist.platform_id))
            })?;

        let end = (start + page_size).min(ids.len());
        let track_ids = ids.get(start..end).map(<[String]>::to_vec).unwrap_or_default();
        let next_page = (end < ids.len()).then(|| end.to_string());
        Ok(TrackIdPage {
            track_ids,
            next_page,
        })
    }

    fn insert_track(
        &self,
        playlist: &PlaylistHandle,
        track_id: &str,
    ) -> Result<InsertResponse, ClientError> {
        self.check_auth()?;
        let mut state = self.state();
        state
            .inserts
            .push((playlist.platform_id.clone(), track_id.to_string()));

        if let Some(message) = &self.fixture.insert_error {
            return Err(ClientError::Api(message.clone()));
        }
        if self.fixture.omit_snapshot {
            return Ok(InsertResponse { snapshot_id: None });
        }

        state
            .playlists
            .entry(playlist.platform_id.clone())
            .or_default()
            .push(track_id.to_string());
        let snapshot = format!("snapshot-{}", state.inserts.len());
        Ok(InsertResponse {
            snapshot_id: Some(snapshot),
        })
    }

    fn create_playlist(&self, name: &str) -> Result<String, ClientError> {
        self.check_auth()?;
        let mut state = self.state();
        state.created += 1;
        let id = format!("playlist-{}-{}", state.created, name.to_lowercase().replace(' ', "-"));
        state.playlists.insert(id.clone(), Vec::new());
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;

    fn playlist() -> PlaylistHandle {
        PlaylistHandle::new(Platform::Youtube, "pl", "yt")
    }

    #[test]
    fn test_pagination() {
        let client = MemoryClient::new(MemoryFixture {
            playlists: BTreeMap::from([(
                "pl".to_string(),
                (0..5).map(|i| format!("t{}", i)).collect(),
            )]),
            page_size: 2,
            ..MemoryFixture::default()
        });

        let first = client.playlist_page(&playlist(), None).unwrap();
        assert_eq!(first.track_ids, vec!["t0", "t1"]);
        assert_eq!(first.next_page.as_deref(), Some("2"));

        let last = client.playlist_page(&playlist(), Some("4")).unwrap();
        assert_eq!(last.track_ids, vec!["t4"]);
        assert_eq!(last.next_page, None);
    }

    #[test]
    fn test_unknown_playlist_is_api_error() {
        let client = MemoryClient::new(MemoryFixture::default());
        assert!(matches!(
            client.playlist_page(&playlist(), None),
            Err(ClientError::Api(_))
        ));
    }

    #[test]
    fn test_search_truncates_to_limit() {
        let candidates = (0..5)
            .map(|i| Candidate {
                id: i.to_string(),
                name: format!("Song {}", i),
                artists: vec![],
                metadata: Default::default(),
            })
            .collect();
        let client = MemoryClient::new(MemoryFixture {
            search_results: candidates,
            ..MemoryFixture::default()
        });
        assert_eq!(client.search("song", 3).unwrap().len(), 3);
        assert_eq!(client.search_calls(), vec![("song".to_string(), 3)]);
    }

    #[test]
    fn test_insert_updates_playlist() {
        let client = MemoryClient::new(MemoryFixture::default());
        let response = client.insert_track(&playlist(), "abc").unwrap();
        assert!(response.snapshot_id.is_some());
        assert_eq!(client.playlist_track_ids("pl"), vec!["abc"]);
    }

    #[test]
    fn test_fixture_from_json() {
        let fixture: MemoryFixture = serde_json::from_str(
            r#"{"search_results": [{"id": "1", "name": "Hello", "artists": ["Adele"],
                 "metadata": {"popularity": 80}}], "page_size": 10}"#,
        )
        .unwrap();
        assert_eq!(fixture.search_results[0].popularity(), 80);
        assert_eq!(fixture.page_size, 10);
        assert!(!fixture.unauthorized);
    }
}
