//! Mirror a shared track into every playlist registered for a channel.
//!
//! A link is added natively to the playlists on its own platform and matched
//! onto the other platform for the rest. A manual entry (title + artist) is
//! matched on every platform that has playlists. Per-playlist failures are
//! collected into the report; only missing credentials abort the run.

use serde::Serialize;
use std::fmt;
use tracing::info;

use crate::models::{AddOutcome, PlaylistHandle, TrackDescriptor};
use crate::platform::Platform;
use crate::services::ServiceError;
use crate::session::Session;

/// Failure reason recorded for playlists whose platform had no match.
pub const NO_MATCH_REASON: &str = "No matching track found";

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("no playlists registered")]
    NoPlaylists,
    #[error("no playlist named '{0}'")]
    NoSuchPlaylist(String),
}

impl MirrorError {
    pub fn is_no_credentials(&self) -> bool {
        matches!(self, MirrorError::Service(e) if e.is_no_credentials())
    }
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedAdd {
    pub playlist: PlaylistHandle,
    pub reason: String,
}

/// Per-playlist outcomes, grouped the way they are reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlaylistResults {
    pub added: Vec<PlaylistHandle>,
    pub already_present: Vec<PlaylistHandle>,
    pub failed: Vec<FailedAdd>,
}

impl PlaylistResults {
    pub fn record(&mut self, playlist: &PlaylistHandle, outcome: AddOutcome) {
        match outcome {
            AddOutcome::Added => self.added.push(playlist.clone()),
            AddOutcome::AlreadyPresent => self.already_present.push(playlist.clone()),
            AddOutcome::Failed(reason) => self.failed.push(FailedAdd {
                playlist: playlist.clone(),
                reason,
            }),
        }
    }

    pub fn fail_all(&mut self, playlists: &[&PlaylistHandle], reason: &str) {
        for playlist in playlists {
            self.record(playlist, AddOutcome::Failed(reason.to_string()));
        }
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.already_present.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The track found (or not) on one platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformTrack {
    pub platform: Platform,
    pub track: Option<TrackDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MirrorReport {
    /// What was shared: the resolved link, or the manual entry
    pub request: TrackDescriptor,
    pub tracks: Vec<PlatformTrack>,
    pub results: PlaylistResults,
}

impl MirrorReport {
    pub fn track_on(&self, platform: Platform) -> Option<&TrackDescriptor> {
        self.tracks
            .iter()
            .find(|t| t.platform == platform)
            .and_then(|t| t.track.as_ref())
    }
}

impl fmt::Display for MirrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.tracks {
            match &entry.track {
                Some(track) => {
                    write!(f, "{}: {}", entry.platform, track.display_name())?;
                    if let Some(url) = track.open_url() {
                        write!(f, " <{}>", url)?;
                    }
                    writeln!(f)?;
                }
                None => writeln!(
                    f,
                    "Unable to find {} track for {}",
                    entry.platform,
                    self.request.display_name()
                )?,
            }
        }

        let results = &self.results;
        if !results.added.is_empty() {
            writeln!(f, "Was added to playlists:")?;
            for p in &results.added {
                writeln!(f, "  {} ({})", p.name, p.platform)?;
            }
        }
        if !results.already_present.is_empty() {
            writeln!(f, "Already present in playlists:")?;
            for p in &results.already_present {
                writeln!(f, "  {} ({})", p.name, p.platform)?;
            }
        }
        if !results.failed.is_empty() {
            writeln!(f, "Failed to add to playlists:")?;
            for failed in &results.failed {
                writeln!(
                    f,
                    "  {} ({}) - {}",
                    failed.playlist.name, failed.playlist.platform, failed.reason
                )?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Flows
// ============================================================================

fn on_platform(playlists: &[PlaylistHandle], platform: Platform) -> Vec<&PlaylistHandle> {
    playlists.iter().filter(|p| p.platform == platform).collect()
}

fn add_to_all(
    session: &mut Session,
    track: &TrackDescriptor,
    playlists: &[&PlaylistHandle],
    results: &mut PlaylistResults,
) -> Result<(), ServiceError> {
    for playlist in playlists {
        let outcome = session.add_if_absent(track, playlist)?;
        results.record(playlist, outcome);
    }
    Ok(())
}

/// Add the linked track to its own platform's playlists and its best match
/// to the others.
pub fn mirror_link(
    session: &mut Session,
    link: &str,
    playlists: &[PlaylistHandle],
) -> Result<MirrorReport, MirrorError> {
    if playlists.is_empty() {
        return Err(MirrorError::NoPlaylists);
    }

    let native = session.resolve_link(link)?;
    let platform = native.platform();
    let mut results = PlaylistResults::default();

    let native_playlists = on_platform(playlists, platform);
    add_to_all(session, &native, &native_playlists, &mut results)?;

    let mut tracks = vec![PlatformTrack {
        platform,
        track: Some(native.clone()),
    }];

    let cross = platform.cross();
    let cross_playlists = on_platform(playlists, cross);
    if !cross_playlists.is_empty() {
        let matched = session.find_best_match(&native, cross)?;
        match &matched {
            Some(track) => add_to_all(session, track, &cross_playlists, &mut results)?,
            None => results.fail_all(&cross_playlists, NO_MATCH_REASON),
        }
        tracks.push(PlatformTrack {
            platform: cross,
            track: matched,
        });
    }

    info!(
        track = %native.display_name(),
        added = results.added.len(),
        already_present = results.already_present.len(),
        failed = results.failed.len(),
        "Mirrored link"
    );
    Ok(MirrorReport {
        request: native,
        tracks,
        results,
    })
}

/// Search every platform with playlists for a title/artist entry and add the
/// match. `only` restricts the run to the playlist with that name.
pub fn mirror_manual(
    session: &mut Session,
    title: &str,
    artist: &str,
    playlists: &[PlaylistHandle],
    only: Option<&str>,
) -> Result<MirrorReport, MirrorError> {
    let selected: Vec<PlaylistHandle> = match only {
        Some(name) => {
            let found: Vec<PlaylistHandle> =
                playlists.iter().filter(|p| p.name == name).cloned().collect();
            if found.is_empty() {
                return Err(MirrorError::NoSuchPlaylist(name.to_string()));
            }
            found
        }
        None => playlists.to_vec(),
    };
    if selected.is_empty() {
        return Err(MirrorError::NoPlaylists);
    }

    let artist = artist.trim();
    let artists = (!artist.is_empty()).then(|| vec![artist.to_string()]);
    // Manual entries carry a separate artist field, like Spotify tracks
    let request = TrackDescriptor::unresolved(title.trim(), artists, Platform::Spotify);

    let mut tracks = Vec::new();
    let mut results = PlaylistResults::default();
    for platform in Platform::ALL {
        let targets = on_platform(&selected, platform);
        if targets.is_empty() {
            continue;
        }
        let matched = session.find_best_match(&request, platform)?;
        match &matched {
            Some(track) => add_to_all(session, track, &targets, &mut results)?,
            None => results.fail_all(&targets, NO_MATCH_REASON),
        }
        tracks.push(PlatformTrack {
            platform,
            track: matched,
        });
    }

    info!(
        track = %request.display_name(),
        added = results.added.len(),
        failed = results.failed.len(),
        "Mirrored manual entry"
    );
    Ok(MirrorReport {
        request,
        tracks,
        results,
    })
}
