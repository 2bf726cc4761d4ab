//! Spotify: structured tracks with credited artists and popularity.

use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::{debug, info};

use super::{
    insertable_track_id, require_client, ClientError, MusicService, PlatformClient, ServiceError,
};
use crate::links;
use crate::membership::remote_track_ids;
use crate::models::{Candidate, PlaylistHandle, TrackDescriptor};
use crate::platform::Platform;

pub struct SpotifyService {
    client: Option<Arc<dyn PlatformClient>>,
}

impl SpotifyService {
    pub fn new(client: Option<Arc<dyn PlatformClient>>) -> Self {
        Self { client }
    }

    fn client(&self) -> Result<&dyn PlatformClient, ServiceError> {
        require_client(Platform::Spotify, &self.client)
    }
}

fn api_error(wrap: fn(String) -> ServiceError) -> impl Fn(ClientError) -> ServiceError {
    move |e| ServiceError::from_client(Platform::Spotify, e, wrap)
}

impl MusicService for SpotifyService {
    fn platform(&self) -> Platform {
        Platform::Spotify
    }

    fn get_track_info_from_link(&self, link: &str) -> Result<TrackDescriptor, ServiceError> {
        let track_id = match links::parse_link(link) {
            Some((Platform::Spotify, id)) => id,
            _ => return Err(ServiceError::UnsupportedLink(link.to_string())),
        };

        let track = self
            .client()?
            .fetch_track(&track_id)
            .map_err(api_error(ServiceError::LookupFailed))?
            .ok_or_else(|| ServiceError::TrackNotFound(track_id.clone()))?;

        debug!(track_id = %track_id, title = %track.name, "Resolved Spotify link");
        let artists = Some(track.artists);
        let metadata = Some(track.metadata);
        Ok(TrackDescriptor::resolved(Platform::Spotify, track_id, track.name, artists, metadata)
            .with_source_link(link))
    }

    fn get_track_ids_in_playlist(
        &self,
        playlist: &PlaylistHandle,
    ) -> Result<FxHashSet<String>, ServiceError> {
        remote_track_ids(self.client()?, playlist)
            .map_err(api_error(ServiceError::ListFailed))
    }

    /// A response without a snapshot id means Spotify did not apply the add.
    fn add_track_to_playlist(
        &self,
        track: &TrackDescriptor,
        playlist: &PlaylistHandle,
    ) -> Result<(), ServiceError> {
        let track_id = insertable_track_id(Platform::Spotify, track, playlist)?;
        let response = self
            .client()?
            .insert_track(playlist, track_id)
            .map_err(api_error(ServiceError::InsertFailed))?;

        match response.snapshot_id.as_deref() {
            Some(snapshot) if !snapshot.is_empty() => {
                info!(
                    track_id,
                    playlist = %playlist.name,
                    snapshot,
                    "Inserted track into playlist"
                );
                Ok(())
            }
            _ => Err(ServiceError::InsertFailed(format!(
                "Unable to add {} to {}",
                track.title(),
                playlist.name
            ))),
        }
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>, ServiceError> {
        self.client()?
            .search(query, limit)
            .map_err(api_error(ServiceError::SearchFailed))
    }

    fn create_playlist(&self, name: &str) -> Result<PlaylistHandle, ServiceError> {
        let id = self
            .client()?
            .create_playlist(name)
            .map_err(api_error(ServiceError::CreateFailed))?;
        Ok(PlaylistHandle::new(Platform::Spotify, id, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawMetadata;
    use crate::services::memory::{MemoryClient, MemoryFixture};

    const LINK_WEB: &str =
        "https://open.spotify.com/track/6ECp64rv50XVz93WvxXMGF?si=lJluQIadSSaeutkEbIWquQ";
    const LINK_DESKTOP: &str = "spotify:track:6ECp64rv50XVz93WvxXMGF";

    fn this_love() -> Candidate {
        Candidate {
            id: "6ECp64rv50XVz93WvxXMGF".to_string(),
            name: "This Love".to_string(),
            artists: vec!["Maroon 5".to_string()],
            metadata: RawMetadata {
                popularity: Some(77),
                ..RawMetadata::default()
            },
        }
    }

    fn service_with(fixture: MemoryFixture) -> (SpotifyService, Arc<MemoryClient>) {
        let client = Arc::new(MemoryClient::new(fixture));
        (SpotifyService::new(Some(client.clone())), client)
    }

    #[test]
    fn test_track_info_from_links() {
        let (service, _) = service_with(MemoryFixture {
            tracks: vec![this_love()],
            ..MemoryFixture::default()
        });
        for link in [LINK_WEB, LINK_DESKTOP] {
            let track = service.get_track_info_from_link(link).unwrap();
            assert_eq!(track.title(), "This Love");
            assert_eq!(track.artists(), Some(&["Maroon 5".to_string()][..]));
            assert_eq!(track.popularity(), 77);
            assert_eq!(track.platform(), Platform::Spotify);
        }
    }

    #[test]
    fn test_track_info_lookup_error() {
        let (service, _) = service_with(MemoryFixture {
            fetch_error: Some("503 Service Unavailable".to_string()),
            ..MemoryFixture::default()
        });
        assert_eq!(
            service.get_track_info_from_link(LINK_DESKTOP),
            Err(ServiceError::LookupFailed("503 Service Unavailable".to_string()))
        );
    }

    #[test]
    fn test_insert_without_snapshot_fails() {
        let (service, client) = service_with(MemoryFixture {
            omit_snapshot: true,
            ..MemoryFixture::default()
        });
        let playlist = PlaylistHandle::new(Platform::Spotify, "pl1", "Office Jams");
        let track = this_love().into_descriptor(Platform::Spotify);

        let err = service.add_track_to_playlist(&track, &playlist).unwrap_err();
        assert_eq!(
            err,
            ServiceError::InsertFailed("Unable to add This Love to Office Jams".to_string())
        );
        assert_eq!(client.insert_calls().len(), 1);
    }

    #[test]
    fn test_insert_with_snapshot_succeeds() {
        let (service, client) = service_with(MemoryFixture::default());
        let playlist = PlaylistHandle::new(Platform::Spotify, "pl1", "Office Jams");
        let track = this_love().into_descriptor(Platform::Spotify);
        service.add_track_to_playlist(&track, &playlist).unwrap();
        assert_eq!(
            client.insert_calls(),
            vec![("pl1".to_string(), "6ECp64rv50XVz93WvxXMGF".to_string())]
        );
    }
}
