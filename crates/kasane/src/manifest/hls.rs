use regex::Regex;
use std::sync::LazyLock;

use super::{MasterPlaylist, MediaPlaylist, ParsedManifest, UriEntry};

const STREAM_INF: &str = "#EXT-X-STREAM-INF";
const AUDIO_MEDIA: &str = "#EXT-X-MEDIA:TYPE=AUDIO";
const SEGMENT_DURATION: &str = "#EXTINF";

static URI_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"URI="([^"]+)""#).unwrap());

/// Parse an HLS playlist.
///
/// Never fails: empty or unrecognised input becomes a media playlist without segments.
pub fn parse_m3u8(text: &str) -> ParsedManifest {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if text.contains(STREAM_INF) {
        let audio_tracks: Vec<_> = lines
            .iter()
            .filter(|line| line.starts_with(AUDIO_MEDIA))
            .filter_map(|line| URI_ATTRIBUTE.captures(line))
            .map(|caps| UriEntry::new(&caps[1]))
            .collect();
        let variants = uris_after_marker(&lines, STREAM_INF);

        tracing::debug!(
            "Parsed master playlist: {} audio track(s), {} variant(s)",
            audio_tracks.len(),
            variants.len()
        );
        ParsedManifest::HlsMaster(MasterPlaylist {
            audio_tracks,
            variants,
        })
    } else {
        let segments = uris_after_marker(&lines, SEGMENT_DURATION);

        tracing::debug!("Parsed media playlist: {} segment(s)", segments.len());
        ParsedManifest::HlsMedia(MediaPlaylist { segments })
    }
}

/// Collect the first non-comment line after each `marker` line.
///
/// Other tags between the marker and its URI (`#EXT-X-BYTERANGE`, ...) are skipped.
/// A marker without a URI before the next marker or the end of input yields nothing.
fn uris_after_marker(lines: &[&str], marker: &str) -> Vec<UriEntry> {
    let mut uris = Vec::new();
    let mut pending = false;
    for line in lines {
        if line.starts_with(marker) {
            pending = true;
        } else if line.starts_with('#') {
            continue;
        } else if pending {
            uris.push(UriEntry::new(*line));
            pending = false;
        }
    }
    uris
}
