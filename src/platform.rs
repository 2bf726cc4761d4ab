//! Streaming platforms a playlist can live on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Spotify,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Youtube, Platform::Spotify];

    /// Detect the platform a shared link points at.
    /// Matches on "yout" so both youtube.com and youtu.be links are caught.
    pub fn from_link(link: &str) -> Option<Platform> {
        if link.contains("yout") {
            Some(Platform::Youtube)
        } else if link.contains("spotify") {
            Some(Platform::Spotify)
        } else {
            None
        }
    }

    /// The platform searched when mirroring a track shared from `self`.
    pub fn cross(self) -> Platform {
        match self {
            Platform::Youtube => Platform::Spotify,
            Platform::Spotify => Platform::Youtube,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Platform::Youtube => "Youtube",
            Platform::Spotify => "Spotify",
        }
    }

    pub fn track_url(self, track_id: &str) -> String {
        match self {
            Platform::Youtube => format!("https://www.youtube.com/watch?v={}", track_id),
            Platform::Spotify => format!("https://open.spotify.com/track/{}", track_id),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown platform '{0}'")]
pub struct UnknownPlatform(pub String);

/// Accepts anything starting with `y` or `s` ("yt", "Spotify", "S", ...),
/// which is what slash-command users actually type.
impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().chars().next().map(|c| c.to_ascii_lowercase()) {
            Some('y') => Ok(Platform::Youtube),
            Some('s') => Ok(Platform::Spotify),
            _ => Err(UnknownPlatform(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_first_letter() {
        for s in ["y", "Y", "youtube", "YT"] {
            assert_eq!(s.parse::<Platform>(), Ok(Platform::Youtube));
        }
        for s in ["s", "S", "spotify"] {
            assert_eq!(s.parse::<Platform>(), Ok(Platform::Spotify));
        }
        assert!("deezer".parse::<Platform>().is_err());
        assert!("".parse::<Platform>().is_err());
    }

    #[test]
    fn test_from_link() {
        assert_eq!(
            Platform::from_link("https://www.youtube.com/watch?v=XPpTgCho5ZA"),
            Some(Platform::Youtube)
        );
        assert_eq!(Platform::from_link("https://youtu.be/XPpTgCho5ZA"), Some(Platform::Youtube));
        assert_eq!(
            Platform::from_link("spotify:track:6ECp64rv50XVz93WvxXMGF"),
            Some(Platform::Spotify)
        );
        assert_eq!(Platform::from_link("https://soundcloud.com/x/y"), None);
    }

    #[test]
    fn test_cross() {
        assert_eq!(Platform::Youtube.cross(), Platform::Spotify);
        assert_eq!(Platform::Spotify.cross(), Platform::Youtube);
    }
}
