//! Extract platform-native track ids from shared links.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::platform::Platform;

/// `watch?v=<id>` style web links; `v` may be any query parameter.
pub static YOUTUBE_WATCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&]v=([A-Za-z0-9_-]+)").unwrap());

/// Mobile share links: `youtu.be/<id>`, optionally followed by a query.
pub static YOUTUBE_SHORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"youtu\.be/([A-Za-z0-9_-]+)").unwrap());

/// Desktop URIs: `spotify:track:<id>`
pub static SPOTIFY_URI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"spotify:track:([A-Za-z0-9]+)").unwrap());

/// Web links: `open.spotify.com/track/<id>?si=...`
pub static SPOTIFY_WEB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"spotify\.com/(?:[a-z-]+/)?track/([A-Za-z0-9]+)").unwrap());

fn first_capture(re: &Regex, s: &str) -> Option<String> {
    re.captures(s)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Video id from a YouTube link. Share text around the link is tolerated:
/// only the first whitespace-separated token mentioning "yout" is parsed.
pub fn youtube_video_id(link: &str) -> Option<String> {
    let token = link.split_whitespace().find(|t| t.contains("yout"))?;
    first_capture(&YOUTUBE_WATCH, token).or_else(|| first_capture(&YOUTUBE_SHORT, token))
}

/// Track id from a Spotify URI or web link.
pub fn spotify_track_id(link: &str) -> Option<String> {
    first_capture(&SPOTIFY_URI, link).or_else(|| first_capture(&SPOTIFY_WEB, link))
}

/// Track id for `platform`, or `None` if the link is not a track link there.
pub fn track_id(platform: Platform, link: &str) -> Option<String> {
    match platform {
        Platform::Youtube => youtube_video_id(link),
        Platform::Spotify => spotify_track_id(link),
    }
}

/// Detect the platform and extract the id in one go.
pub fn parse_link(link: &str) -> Option<(Platform, String)> {
    let platform = Platform::from_link(link)?;
    track_id(platform, link).map(|id| (platform, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_web() {
        assert_eq!(
            youtube_video_id("https://www.youtube.com/watch?v=XPpTgCho5ZA").as_deref(),
            Some("XPpTgCho5ZA")
        );
        assert_eq!(
            youtube_video_id("https://www.youtube.com/watch?list=PL1&v=XPpTgCho5ZA&t=42").as_deref(),
            Some("XPpTgCho5ZA")
        );
    }

    #[test]
    fn test_youtube_mobile_share_text() {
        assert_eq!(youtube_video_id("https://youtu.be/XPpTgCho5ZA").as_deref(), Some("XPpTgCho5ZA"));
        assert_eq!(
            youtube_video_id("Check this out https://youtu.be/XPpTgCho5ZA?t=10 so good").as_deref(),
            Some("XPpTgCho5ZA")
        );
    }

    #[test]
    fn test_youtube_without_id() {
        assert_eq!(youtube_video_id("https://www.youtube.com/feed/trending"), None);
        assert_eq!(youtube_video_id("no link here"), None);
    }

    #[test]
    fn test_spotify_links() {
        assert_eq!(
            spotify_track_id("spotify:track:6ECp64rv50XVz93WvxXMGF").as_deref(),
            Some("6ECp64rv50XVz93WvxXMGF")
        );
        assert_eq!(
            spotify_track_id("https://open.spotify.com/track/6ECp64rv50XVz93WvxXMGF?si=lJluQIadSSaeutkEbIWquQ")
                .as_deref(),
            Some("6ECp64rv50XVz93WvxXMGF")
        );
        assert_eq!(spotify_track_id("https://open.spotify.com/album/1234"), None);
    }

    #[test]
    fn test_parse_link() {
        assert_eq!(
            parse_link("https://youtu.be/XPpTgCho5ZA"),
            Some((Platform::Youtube, "XPpTgCho5ZA".to_string()))
        );
        assert_eq!(
            parse_link("spotify:track:6ECp64rv50XVz93WvxXMGF"),
            Some((Platform::Spotify, "6ECp64rv50XVz93WvxXMGF".to_string()))
        );
        assert_eq!(parse_link("https://example.com"), None);
        // Wrong platform for the extractor
        assert_eq!(track_id(Platform::Youtube, "spotify:track:6ECp64rv50XVz93WvxXMGF"), None);
    }
}
