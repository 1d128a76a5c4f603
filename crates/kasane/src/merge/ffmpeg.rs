use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
};

use bytes::Bytes;
use tokio::process::Command;

use super::{MuxCommand, MuxRequest, MuxResponse, Muxer};
use crate::{cache::BlobStore, KasaneError, KasaneResult};

const VIDEO_INPUT: &str = "video.webm";
const AUDIO_INPUT: &str = "audio.webm";
const OUTPUT: &str = "output.mp4";

/// [`Muxer`] backed by the `ffmpeg` executable.
///
/// Inputs are copied from the blob store into a temporary directory, ffmpeg runs there
/// with stream copy, and `output.mp4` is written back to the store.
pub struct FfmpegCliMuxer<B> {
    blobs: Arc<B>,
    executable: Option<PathBuf>,
}

impl<B> FfmpegCliMuxer<B>
where
    B: BlobStore,
{
    /// Uses the `ffmpeg` found in `PATH`.
    pub fn new(blobs: Arc<B>) -> Self {
        Self {
            blobs,
            executable: None,
        }
    }

    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = Some(executable.into());
        self
    }

    fn ffmpeg(&self) -> KasaneResult<PathBuf> {
        match &self.executable {
            Some(path) => Ok(path.clone()),
            None => Ok(which::which("ffmpeg")?),
        }
    }

    async fn load(&self, key: &str, path: &Path) -> KasaneResult<()> {
        let data = self
            .blobs
            .get(key)
            .await?
            .ok_or_else(|| KasaneError::BlobNotFound(key.to_string()))?;
        tokio::fs::write(path, &data).await?;
        Ok(())
    }

    async fn run(&self, request: &MuxRequest) -> KasaneResult<()> {
        let ffmpeg = self.ffmpeg()?;
        let workdir = tempfile::tempdir()?;

        self.load(&request.inputs.video, &workdir.path().join(VIDEO_INPUT))
            .await?;
        let args = match (request.command, &request.inputs.audio) {
            (MuxCommand::Merge, Some(audio)) => {
                self.load(audio, &workdir.path().join(AUDIO_INPUT)).await?;
                merge_args()
            }
            (MuxCommand::Merge, None) => {
                return Err(KasaneError::Muxer(
                    "merge requires an audio input".to_string(),
                ))
            }
            (MuxCommand::Convert, _) => convert_args(),
        };

        tracing::debug!("Running ffmpeg {}", args.join(" "));
        let output = Command::new(ffmpeg)
            .args(&args)
            .current_dir(workdir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<_> = stderr.lines().rev().take(5).collect();
            let tail: Vec<_> = tail.into_iter().rev().collect();
            return Err(KasaneError::Muxer(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                tail.join("\n")
            )));
        }

        let data = tokio::fs::read(workdir.path().join(OUTPUT)).await?;
        self.blobs.put(&request.output, Bytes::from(data)).await?;
        Ok(())
    }
}

impl<B> Muxer for FfmpegCliMuxer<B>
where
    B: BlobStore,
{
    async fn mux(&self, request: MuxRequest) -> KasaneResult<MuxResponse> {
        tracing::info!("Running {:?} for {}", request.command, request.request_id);
        match self.run(&request).await {
            Ok(()) => Ok(MuxResponse::ok()),
            Err(e) => {
                tracing::warn!("ffmpeg failed for {}: {e}", request.request_id);
                Ok(MuxResponse::failed(e.to_string()))
            }
        }
    }
}

fn merge_args() -> Vec<&'static str> {
    vec![
        "-i",
        VIDEO_INPUT,
        "-i",
        AUDIO_INPUT,
        "-c:v",
        "copy",
        "-c:a",
        "copy",
        "-avoid_negative_ts",
        "make_zero",
        "-y",
        OUTPUT,
    ]
}

fn convert_args() -> Vec<&'static str> {
    vec![
        "-i",
        VIDEO_INPUT,
        "-c:v",
        "copy",
        "-avoid_negative_ts",
        "make_zero",
        "-y",
        OUTPUT,
    ]
}
