use url::Url;

use super::ResolvedSegmentSet;
use crate::{
    host::HostIo,
    manifest::{parse_m3u8, ParsedManifest, UriEntry},
    util::url::join_with_query,
    KasaneError, KasaneResult, TrackKind,
};

/// Resolve an HLS playlist into segment URLs.
///
/// For a master playlist every audio track and every variant is fetched and its segments are
/// appended in list order; segment URIs are relative to their own media playlist. A media
/// playlist on its own has no separate audio, so all of its segments form the video track.
pub async fn resolve_hls<H>(
    host: &H,
    manifest: &ParsedManifest,
    manifest_url: &Url,
    query: Option<&str>,
) -> KasaneResult<ResolvedSegmentSet>
where
    H: HostIo,
{
    match manifest {
        ParsedManifest::HlsMaster(master) => {
            tracing::info!("Master playlist detected.");

            let mut segments = ResolvedSegmentSet::default();
            for track in &master.audio_tracks {
                let urls =
                    resolve_media_playlist(host, manifest_url, track, query, TrackKind::Audio)
                        .await?;
                segments.audio.extend(urls);
            }
            for variant in &master.variants {
                let urls =
                    resolve_media_playlist(host, manifest_url, variant, query, TrackKind::Video)
                        .await?;
                segments.video.extend(urls);
            }
            Ok(segments)
        }
        ParsedManifest::HlsMedia(media) => {
            tracing::info!("Media playlist detected.");
            Ok(ResolvedSegmentSet {
                audio: Vec::new(),
                video: resolve_entries(&media.segments, manifest_url, query)?,
            })
        }
        ParsedManifest::Dash(_) => Err(KasaneError::ManifestFormat(
            "expected an HLS playlist, found a DASH manifest".to_string(),
        )),
    }
}

async fn resolve_media_playlist<H>(
    host: &H,
    manifest_url: &Url,
    entry: &UriEntry,
    query: Option<&str>,
    kind: TrackKind,
) -> KasaneResult<Vec<Url>>
where
    H: HostIo,
{
    let playlist_url = join_with_query(manifest_url, &entry.uri, query)?;
    tracing::info!("Fetching {kind} playlist from: {playlist_url}");

    let text = host.fetch_text(&playlist_url).await?;
    match parse_m3u8(&text) {
        ParsedManifest::HlsMedia(media) => {
            tracing::info!(
                "Found {} {kind} segments in {}",
                media.segments.len(),
                entry.uri
            );
            resolve_entries(&media.segments, &playlist_url, query)
        }
        _ => {
            tracing::warn!("{kind} playlist {playlist_url} is not a media playlist, skipping.");
            Ok(Vec::new())
        }
    }
}

fn resolve_entries(entries: &[UriEntry], base: &Url, query: Option<&str>) -> KasaneResult<Vec<Url>> {
    entries
        .iter()
        .map(|entry| join_with_query(base, &entry.uri, query))
        .collect()
}
