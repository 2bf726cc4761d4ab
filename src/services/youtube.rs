//! YouTube: videos stand in for tracks.
//!
//! Videos carry no separate artist field, so descriptors built here have no
//! artists; the raw title plus the snippet's description and channel title
//! are what the matcher gets to work with.

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

pub struct YoutubeService {
    client: Option<Arc<dyn PlatformClient>>,
}

impl YoutubeService {
    pub fn new(client: Option<Arc<dyn PlatformClient>>) -> Self {
        Self { client }
    }

    fn client(&self) -> Result<&dyn PlatformClient, ServiceError> {
        require_client(Platform::Youtube, &self.client)
    }
}

fn api_error(wrap: fn(String) -> ServiceError) -> impl Fn(ClientError) -> ServiceError {
    move |e| ServiceError::from_client(Platform::Youtube, e, wrap)
}

impl MusicService for YoutubeService {
    fn platform(&self) -> Platform {
        Platform::Youtube
    }

    fn get_track_info_from_link(&self, link: &str) -> Result<TrackDescriptor, ServiceError> {
        let video_id = match links::parse_link(link) {
            Some((Platform::Youtube, id)) => id,
            _ => return Err(ServiceError::UnsupportedLink(link.to_string())),
        };

        let video = self
            .client()?
            .fetch_track(&video_id)
            .map_err(api_error(ServiceError::LookupFailed))?
            .ok_or_else(|| ServiceError::TrackNotFound(video_id.clone()))?;

        debug!(video_id = %video_id, title = %video.name, "Resolved YouTube link");
        let metadata = Some(video.metadata);
        Ok(TrackDescriptor::resolved(Platform::Youtube, video_id, video.name, None, metadata)
            .with_source_link(link))
    }

    fn get_track_ids_in_playlist(
        &self,
        playlist: &PlaylistHandle,
    ) -> Result<FxHashSet<String>, ServiceError> {
        remote_track_ids(self.client()?, playlist)
            .map_err(api_error(ServiceError::ListFailed))
    }

    fn add_track_to_playlist(
        &self,
        track: &TrackDescriptor,
        playlist: &PlaylistHandle,
    ) -> Result<(), ServiceError> {
        let video_id = insertable_track_id(Platform::Youtube, track, playlist)?;
        self.client()?
            .insert_track(playlist, video_id)
            .map_err(api_error(ServiceError::InsertFailed))?;
        info!(video_id, playlist = %playlist.name, "Inserted video into playlist");
        Ok(())
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
        Ok(PlaylistHandle::new(Platform::Youtube, id, name))
    }
}
