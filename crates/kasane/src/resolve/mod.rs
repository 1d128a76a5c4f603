//! # Segment resolution
//!
//! Turns a [`ParsedManifest`] into absolute, ordered segment URLs per track. The order of each
//! list is playback order and is kept all the way to reassembly, because segments are joined by
//! plain concatenation.
//!
//! The query string of the manifest URL is re-applied to every URL produced here: signed
//! manifests keep their auth token in the query and every sub-resource needs it.

mod dash;
mod hls;
pub mod template;

pub use dash::{extract_segments, resolve_dash};
pub use hls::resolve_hls;

use url::Url;

use crate::{
    host::HostIo, manifest::ParsedManifest, util::url::signing_query, KasaneResult, TrackKind,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSegmentSet {
    pub audio: Vec<Url>,
    pub video: Vec<Url>,
}

impl ResolvedSegmentSet {
    pub fn track(&self, kind: TrackKind) -> &[Url] {
        match kind {
            TrackKind::Audio => &self.audio,
            TrackKind::Video => &self.video,
        }
    }

    /// Both tracks present: they are fetched separately and muxed together.
    pub fn is_split(&self) -> bool {
        !self.audio.is_empty() && !self.video.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.audio.is_empty() && self.video.is_empty()
    }

    pub fn total(&self) -> usize {
        self.audio.len() + self.video.len()
    }
}

/// Resolve any parsed manifest fetched from `manifest_url`.
///
/// HLS master playlists need their media playlists fetched, hence the [`HostIo`].
pub async fn resolve<H>(
    host: &H,
    manifest: &ParsedManifest,
    manifest_url: &Url,
) -> KasaneResult<ResolvedSegmentSet>
where
    H: HostIo,
{
    let query = signing_query(manifest_url);
    match manifest {
        ParsedManifest::Dash(mpd) => resolve_dash(mpd, manifest_url, query),
        _ => resolve_hls(host, manifest, manifest_url, query).await,
    }
}
