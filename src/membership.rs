//! Playlist membership checks and the idempotent insert.
//!
//! The remote listing is the source of truth. [`MembershipCache`] only
//! remembers listings fetched during the current batch so repeated adds to
//! the same playlist skip the round trip; it is owned by the caller and never
//! shared between sessions.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info, warn};

use crate::models::{AddOutcome, PlaylistHandle, TrackDescriptor};
use crate::platform::Platform;
use crate::services::{ClientError, MusicService, PlatformClient, ServiceError};

/// Drain every page of `playlist` into one id set.
pub fn remote_track_ids(
    client: &dyn PlatformClient,
    playlist: &PlaylistHandle,
) -> Result<FxHashSet<String>, ClientError> {
    let mut ids = FxHashSet::default();
    let mut seen_tokens: FxHashSet<String> = FxHashSet::default();
    let mut token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = client.playlist_page(playlist, token.as_deref())?;
        pages += 1;
        ids.extend(page.track_ids);

        match page.next_page {
            Some(next) if !next.is_empty() => {
                if !seen_tokens.insert(next.clone()) {
                    return Err(ClientError::Api(format!(
                        "playlist {} returned page token '{}' twice",
                        playlist.platform_id, next
                    )));
                }
                token = Some(next);
            }
            _ => break,
        }
    }

    debug!(playlist = %playlist.name, pages, tracks = ids.len(), "Listed playlist");
    Ok(ids)
}

// ============================================================================
// Batch-Scoped Cache
// ============================================================================

/// Known member ids per playlist, filled from remote listings.
#[derive(Debug, Default)]
pub struct MembershipCache {
    known: FxHashMap<(Platform, String), FxHashSet<String>>,
}

impl MembershipCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(playlist: &PlaylistHandle) -> (Platform, String) {
        (playlist.platform, playlist.platform_id.clone())
    }

    /// Whether the playlist has been listed remotely in this batch.
    pub fn is_loaded(&self, playlist: &PlaylistHandle) -> bool {
        self.known.contains_key(&Self::key(playlist))
    }

    pub fn contains(&self, playlist: &PlaylistHandle, track_id: &str) -> bool {
        self.known
            .get(&Self::key(playlist))
            .is_some_and(|ids| ids.contains(track_id))
    }

    /// Replace what is known about `playlist` with a fresh remote listing.
    pub fn replace(&mut self, playlist: &PlaylistHandle, ids: FxHashSet<String>) {
        self.known.insert(Self::key(playlist), ids);
    }

    /// Note a successful insert. Ignored for playlists never listed.
    pub fn record(&mut self, playlist: &PlaylistHandle, track_id: &str) {
        if let Some(ids) = self.known.get_mut(&Self::key(playlist)) {
            ids.insert(track_id.to_string());
        }
    }

    pub fn clear(&mut self) {
        self.known.clear();
    }
}

// ============================================================================
// Idempotent Insert
// ============================================================================

/// Add `track` to `playlist` unless it is already there.
///
/// Collaborator failures come back as [`AddOutcome::Failed`] with the
/// collaborator's message; only [`ServiceError::NoCredentials`] is returned
/// as an error. At most one insert call is made, and none unless the remote
/// listing (or this batch's cached copy of it) lacks the track.
pub fn add_if_absent<S: MusicService + ?Sized>(
    service: &S,
    track: &TrackDescriptor,
    playlist: &PlaylistHandle,
    cache: &mut MembershipCache,
) -> Result<AddOutcome, ServiceError> {
    let Some(track_id) = track.track_id() else {
        return Ok(AddOutcome::Failed(
            ServiceError::Unresolved(track.display_name()).to_string(),
        ));
    };
    if track.platform() != playlist.platform || service.platform() != playlist.platform {
        let err = ServiceError::PlatformMismatch {
            track: track.platform(),
            playlist: playlist.platform,
        };
        return Ok(AddOutcome::Failed(err.to_string()));
    }

    if cache.contains(playlist, track_id) {
        debug!(track_id, playlist = %playlist.name, "Already present (cached listing)");
        return Ok(AddOutcome::AlreadyPresent);
    }

    let present = match service.get_track_ids_in_playlist(playlist) {
        Ok(ids) => {
            let present = ids.contains(track_id);
            cache.replace(playlist, ids);
            present
        }
        Err(e) if e.is_no_credentials() => return Err(e),
        Err(e) => {
            warn!(playlist = %playlist.name, error = %e, "Could not list playlist");
            return Ok(AddOutcome::Failed(e.to_string()));
        }
    };
    if present {
        debug!(track_id, playlist = %playlist.name, "Already present");
        return Ok(AddOutcome::AlreadyPresent);
    }

    match service.add_track_to_playlist(track, playlist) {
        Ok(()) => {
            cache.record(playlist, track_id);
            info!(track = %track.display_name(), playlist = %playlist.name, "Added");
            Ok(AddOutcome::Added)
        }
        Err(e) if e.is_no_credentials() => Err(e),
        Err(e) => {
            warn!(playlist = %playlist.name, error = %e, "Insert failed");
            Ok(AddOutcome::Failed(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candidate, RawMetadata};
    use crate::services::memory::{MemoryClient, MemoryFixture};
    use crate::services::{service_for, TrackIdPage, InsertResponse};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn video(id: &str) -> TrackDescriptor {
        Candidate {
            id: id.to_string(),
            name: "Maroon 5 - This Love".to_string(),
            artists: vec![],
            metadata: RawMetadata::default(),
        }
        .into_descriptor(Platform::Youtube)
    }

    fn playlist() -> PlaylistHandle {
        PlaylistHandle::new(Platform::Youtube, "pl", "Friday")
    }

    fn setup(fixture: MemoryFixture) -> (Box<dyn MusicService>, Arc<MemoryClient>) {
        let client = Arc::new(MemoryClient::new(fixture));
        (service_for(Platform::Youtube, Some(client.clone())), client)
    }

    fn with_playlist(ids: &[&str]) -> MemoryFixture {
        MemoryFixture {
            playlists: BTreeMap::from([(
                "pl".to_string(),
                ids.iter().map(|s| s.to_string()).collect(),
            )]),
            page_size: 2,
            ..MemoryFixture::default()
        }
    }

    #[test]
    fn test_remote_track_ids_drains_pages() {
        let client = MemoryClient::new(with_playlist(&["a", "b", "c", "d", "e"]));
        let ids = remote_track_ids(&client, &playlist()).unwrap();
        assert_eq!(ids.len(), 5);
        assert!(ids.contains("e"));
        assert_eq!(client.list_calls(), 3);
    }

    struct LoopingClient;

    impl PlatformClient for LoopingClient {
        fn search(&self, _: &str, _: usize) -> Result<Vec<Candidate>, ClientError> {
            Ok(vec![])
        }
        fn fetch_track(&self, _: &str) -> Result<Option<Candidate>, ClientError> {
            Ok(None)
        }
        fn playlist_page(
            &self,
            _: &PlaylistHandle,
            _: Option<&str>,
        ) -> Result<TrackIdPage, ClientError> {
            Ok(TrackIdPage {
                track_ids: vec!["a".to_string()],
                next_page: Some("again".to_string()),
            })
        }
        fn insert_track(&self, _: &PlaylistHandle, _: &str) -> Result<InsertResponse, ClientError> {
            Ok(InsertResponse::default())
        }
        fn create_playlist(&self, _: &str) -> Result<String, ClientError> {
            Ok("new".to_string())
        }
    }

    #[test]
    fn test_remote_track_ids_stops_on_repeated_token() {
        let err = remote_track_ids(&LoopingClient, &playlist()).unwrap_err();
        assert!(err.to_string().contains("twice"));
    }

    #[test]
    fn test_added_then_already_present() {
        let (service, client) = setup(with_playlist(&["x"]));
        let mut cache = MembershipCache::new();
        let track = video("XPpTgCho5ZA");

        let first = add_if_absent(service.as_ref(), &track, &playlist(), &mut cache).unwrap();
        let second = add_if_absent(service.as_ref(), &track, &playlist(), &mut cache).unwrap();

        assert_eq!(first, AddOutcome::Added);
        assert_eq!(second, AddOutcome::AlreadyPresent);
        assert_eq!(client.insert_calls().len(), 1);
    }

    #[test]
    fn test_fresh_cache_still_sees_remote_insert() {
        let (service, client) = setup(with_playlist(&[]));
        let track = video("XPpTgCho5ZA");

        let mut first_batch = MembershipCache::new();
        add_if_absent(service.as_ref(), &track, &playlist(), &mut first_batch).unwrap();

        let mut second_batch = MembershipCache::new();
        let outcome = add_if_absent(service.as_ref(), &track, &playlist(), &mut second_batch).unwrap();
        assert_eq!(outcome, AddOutcome::AlreadyPresent);
        assert_eq!(client.insert_calls().len(), 1);
    }

    #[test]
    fn test_cached_listing_skips_remote_call() {
        let (service, client) = setup(with_playlist(&["a"]));
        let mut cache = MembershipCache::new();
        let track = video("a");

        assert_eq!(
            add_if_absent(service.as_ref(), &track, &playlist(), &mut cache).unwrap(),
            AddOutcome::AlreadyPresent
        );
        let listed = client.list_calls();
        assert!(cache.is_loaded(&playlist()));

        add_if_absent(service.as_ref(), &track, &playlist(), &mut cache).unwrap();
        assert_eq!(client.list_calls(), listed);
        assert!(client.insert_calls().is_empty());
    }

    #[test]
    fn test_insert_error_is_failed_verbatim() {
        let mut fixture = with_playlist(&[]);
        fixture.insert_error = Some("quotaExceeded".to_string());
        let (service, _) = setup(fixture);
        let mut cache = MembershipCache::new();

        let outcome = add_if_absent(service.as_ref(), &video("v"), &playlist(), &mut cache).unwrap();
        assert_eq!(outcome, AddOutcome::Failed("quotaExceeded".to_string()));
        assert!(!cache.contains(&playlist(), "v"));
    }

    #[test]
    fn test_list_error_is_failed_without_insert() {
        let mut fixture = with_playlist(&[]);
        fixture.list_error = Some("playlistNotFound".to_string());
        let (service, client) = setup(fixture);
        let mut cache = MembershipCache::new();

        let outcome = add_if_absent(service.as_ref(), &video("v"), &playlist(), &mut cache).unwrap();
        assert_eq!(outcome, AddOutcome::Failed("playlistNotFound".to_string()));
        assert!(client.insert_calls().is_empty());
    }

    #[test]
    fn test_no_credentials_propagates() {
        let mut fixture = with_playlist(&[]);
        fixture.unauthorized = true;
        let (service, _) = setup(fixture);
        let mut cache = MembershipCache::new();

        let err = add_if_absent(service.as_ref(), &video("v"), &playlist(), &mut cache).unwrap_err();
        assert_eq!(err, ServiceError::NoCredentials(Platform::Youtube));
    }

    #[test]
    fn test_unresolved_and_mismatched_tracks_fail() {
        let (service, client) = setup(with_playlist(&[]));
        let mut cache = MembershipCache::new();

        let unresolved = TrackDescriptor::unresolved("Song", None, Platform::Youtube);
        assert!(matches!(
            add_if_absent(service.as_ref(), &unresolved, &playlist(), &mut cache).unwrap(),
            AddOutcome::Failed(_)
        ));

        let spotify = TrackDescriptor::resolved(Platform::Spotify, "id", "Song", None, None);
        assert!(matches!(
            add_if_absent(service.as_ref(), &spotify, &playlist(), &mut cache).unwrap(),
            AddOutcome::Failed(_)
        ));
        assert_eq!(client.list_calls(), 0);
    }

    #[test]
    fn test_cache_record_ignores_unlisted_playlist() {
        let mut cache = MembershipCache::new();
        cache.record(&playlist(), "a");
        assert!(!cache.is_loaded(&playlist()));

        cache.replace(&playlist(), FxHashSet::default());
        cache.record(&playlist(), "a");
        assert!(cache.contains(&playlist(), "a"));

        cache.clear();
        assert!(!cache.contains(&playlist(), "a"));
    }
}
