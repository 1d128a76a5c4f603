//! # Manifest parsing
//!
//! Two narrow, tolerance-first scanners turn raw manifest text into a [`ParsedManifest`]:
//!
//! * [`parse_m3u8`] splits an HLS playlist into lines and classifies it as a master playlist
//!   (it contains `#EXT-X-STREAM-INF`) or a media playlist.
//! * [`parse_mpd`] extracts `<AdaptationSet>` blocks with `contentType="audio"` or
//!   `contentType="video"` and the `<Representation>` blocks inside them.
//!
//! Neither is a general parser. Anything outside the documented subset is ignored rather than
//! rejected, and both functions are pure: the same text always yields the same model.

mod dash;
mod hls;

pub use dash::parse_mpd;
pub use hls::parse_m3u8;

use crate::TrackKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedManifest {
    /// A playlist whose body points to other playlists.
    HlsMaster(MasterPlaylist),
    /// A playlist whose body lists media segment URIs directly.
    HlsMedia(MediaPlaylist),
    Dash(DashManifest),
}

/// A URI exactly as written in the manifest, not yet resolved against any base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriEntry {
    pub uri: String,
}

impl UriEntry {
    pub fn new<S: Into<String>>(uri: S) -> Self {
        Self { uri: uri.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MasterPlaylist {
    pub audio_tracks: Vec<UriEntry>,
    pub variants: Vec<UriEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaPlaylist {
    pub segments: Vec<UriEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashManifest {
    pub adaptation_sets: Vec<AdaptationSet>,
}

impl DashManifest {
    /// First adaptation set carrying the given content type.
    pub fn adaptation_set(&self, kind: TrackKind) -> Option<&AdaptationSet> {
        self.adaptation_sets
            .iter()
            .find(|set| set.content_type == kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdaptationSet {
    pub content_type: TrackKind,
    /// `<SegmentTemplate>` declared on the adaptation set itself, shared by every
    /// representation that does not declare its own.
    pub segment_template: Option<String>,
    /// Sorted by descending bandwidth, so index 0 is the preferred representation.
    pub representations: Vec<Representation>,
}

impl AdaptationSet {
    pub fn best_representation(&self) -> Option<&Representation> {
        self.representations.first()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Representation {
    pub id: Option<String>,
    pub bandwidth: u64,
    /// Inner XML of the `<Representation>` element, kept verbatim.
    pub body: String,
}
