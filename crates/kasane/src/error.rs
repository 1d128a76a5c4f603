use std::time::Duration;

use thiserror::Error;

use crate::TrackKind;

#[derive(Error, Debug)]
pub enum KasaneError {
    #[error("HTTP error: {0}")]
    HttpError(reqwest::StatusCode),

    #[error("Invalid manifest: {0}")]
    ManifestFormat(String),

    #[error("Could not find video adaptation set or representations in DASH manifest")]
    NoVideoAdaptationSet,

    #[error("No audio or video segments found in manifest")]
    NoSegments,

    #[error("Failed to download any {0} segments")]
    EmptyTrack(TrackKind),

    #[error("Muxer error: {0}")]
    Muxer(String),

    #[error("Muxer did not respond within {0:?}")]
    MuxerTimeout(Duration),

    #[error("Both merge and fallback downloads failed. Merge error: {merge}. Fallback error: {fallback}")]
    FallbackDelivery { merge: String, fallback: String },

    #[error("Download cancelled")]
    Cancelled,

    #[error("Blob not found in storage: {0}")]
    BlobNotFound(String),

    #[error("This video is password-protected. Please provide the correct password.")]
    PasswordRequired,

    #[error("Video not found or no download URL available")]
    VideoNotFound,

    #[error("Could not extract video ID from URL: {0}")]
    InvalidShareUrl(String),

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    #[error(transparent)]
    RequestError(#[from] reqwest::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    MissingExecutable(#[from] which::Error),
}

impl KasaneError {
    /// Cancellation is a terminal outcome of its own, not a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type KasaneResult<T> = Result<T, KasaneError>;
