//! Resolve HLS and DASH manifests into segments and reassemble them into one file.
//!
//! ```text
//! ┌──────────────┐   text   ┌──────────────┐  urls   ┌──────────────┐
//! │              ├──────────►              ├─────────►              │
//! │   HostIo     │          │ parse_m3u8 / │         │SegmentFetcher│
//! │  fetch_text  │          │  parse_mpd   │         │  [batched]   │
//! │              │          │   resolve    │         │              │
//! └──────────────┘          └──────────────┘         └──────┬───────┘
//!                                                           │ audio / video
//!                                                           │ buffers
//! ┌──────────────┐  output  ┌──────────────┐  blobs  ┌──────▼───────┐
//! │              ◄──────────┤              ◄─────────┤              │
//! │   HostIo     │          │    Muxer     │         │ Reassembly   │
//! │ deliver_file │          │merge/convert │         │  Pipeline    │
//! │  [chunked]   │          │              │         │              │
//! └──────────────┘          └──────────────┘         └──────────────┘
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod deliver;
pub mod error;
pub mod event;
pub mod fetch;
pub mod host;
pub mod job;
pub mod manifest;
pub mod merge;
pub mod pipeline;
pub mod resolve;
pub mod util;


pub use config::PipelineConfig;
pub use error::*;
pub use event::{JobEvent, JobObserver};
pub use host::HostIo;
pub use merge::Muxer;
pub use pipeline::ReassemblyPipeline;

/// One elementary stream of a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }

    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type {
            "audio" => Some(Self::Audio),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
