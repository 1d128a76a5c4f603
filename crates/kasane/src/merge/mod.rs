//! Turning fetched track blobs into one playable file.
//!
//! The pipeline stores the concatenated track blobs in host storage and hands their keys to a
//! [`Muxer`]. The muxer writes its output under [`MuxRequest::output`] in the same storage and
//! answers with a [`MuxResponse`]. The request and response types are serializable so that a
//! muxer may live in another process or worker.

mod ffmpeg;

pub use ffmpeg::FfmpegCliMuxer;

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{KasaneError, KasaneResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MuxCommand {
    /// Combine a video and an audio input, copying both streams.
    Merge,
    /// Rewrap a single video input, copying the stream.
    Convert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuxInputs {
    pub video: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

impl MuxInputs {
    /// Storage keys of the inputs, video first.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        std::iter::once(&self.video).chain(self.audio.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MuxRequest {
    pub request_id: String,
    pub command: MuxCommand,
    pub inputs: MuxInputs,
    /// Storage key the muxer writes its output to.
    pub output: String,
}

impl MuxRequest {
    pub fn merge(request_id: String, video: String, audio: String, output: String) -> Self {
        Self {
            request_id,
            command: MuxCommand::Merge,
            inputs: MuxInputs {
                video,
                audio: Some(audio),
            },
            output,
        }
    }

    pub fn convert(request_id: String, video: String, output: String) -> Self {
        Self {
            request_id,
            command: MuxCommand::Convert,
            inputs: MuxInputs { video, audio: None },
            output,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuxError {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuxResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<MuxError>,
}

impl MuxResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed<S: Into<String>>(message: S) -> Self {
        Self {
            success: false,
            error: Some(MuxError {
                message: message.into(),
            }),
        }
    }

    pub fn into_result(self) -> KasaneResult<()> {
        if self.success {
            return Ok(());
        }
        let message = self
            .error
            .map(|e| e.message)
            .unwrap_or_else(|| "Unknown muxer error".to_string());
        Err(KasaneError::Muxer(message))
    }
}

pub trait Muxer: Send + Sync {
    /// Run one request to completion.
    ///
    /// Muxing failures are reported in the response. `Err` is for failures to
    /// reach the muxer or its storage at all.
    fn mux(&self, request: MuxRequest) -> impl Future<Output = KasaneResult<MuxResponse>> + Send;
}

impl<M> Muxer for Arc<M>
where
    M: Muxer,
{
    fn mux(&self, request: MuxRequest) -> impl Future<Output = KasaneResult<MuxResponse>> + Send {
        self.as_ref().mux(request)
    }
}

impl<M> Muxer for &M
where
    M: Muxer + ?Sized,
{
    fn mux(&self, request: MuxRequest) -> impl Future<Output = KasaneResult<MuxResponse>> + Send {
        (**self).mux(request)
    }
}
