use std::num::NonZeroUsize;

use kasane::{
    api::DirectUrl,
    event::ChannelObserver,
    job::{CancelHandle, JobState},
    JobEvent, JobObserver, PipelineConfig, ReassemblyPipeline,
};
use tokio::sync::mpsc::UnboundedReceiver;
use url::Url;
use wiremock::MockServer;

use crate::common::{init_tracing, local_host, ConcatMuxer, ServerMock};

fn drain(mut receiver: UnboundedReceiver<JobEvent>) -> Vec<JobEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

async fn serve_split_dash(server: &MockServer) {
    server
        .mock("/v/manifest.mpd", include_str!("../fixtures/dash/split.mpd"))
        .await;
    for (name, body) in [
        ("init", "VI"),
        ("5", "V5"),
        ("6", "V6"),
        ("7", "V7"),
        ("8", "V8"),
    ] {
        server.mock(&format!("/v/video/{name}.webm"), body).await;
    }
    for (name, body) in [("init", "AI"), ("1", "A1"), ("2", "A2")] {
        server.mock(&format!("/v/audio/{name}.webm"), body).await;
    }
}

#[tokio::test]
async fn test_dash_split_end_to_end() -> anyhow::Result<()> {
    init_tracing();
    let server = MockServer::start().await;
    serve_split_dash(&server).await;

    let dir = tempfile::tempdir()?;
    let host = local_host(dir.path());
    let blobs = host.blobs();
    let muxer = ConcatMuxer::new(blobs.clone());
    let (observer, receiver) = ChannelObserver::new();
    let pipeline = ReassemblyPipeline::new(host, muxer, observer);

    let url = Url::parse(&format!("{}/v/manifest.mpd", server.uri()))?;
    let state = pipeline
        .run_job(&url, "weekly.mp4", CancelHandle::new())
        .await;
    assert_eq!(state, JobState::Completed);

    let output = tokio::fs::read(dir.path().join("weekly.mp4")).await?;
    assert_eq!(output, b"VIV5V6V7V8AIA1A2");
    assert!(blobs.is_empty());

    let events = drain(receiver);
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(matches!(events.last(), Some(JobEvent::Completed { .. })));
    Ok(())
}

#[tokio::test]
async fn test_failed_segments_are_skipped() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server
        .mock(
            "/clip/index.m3u8",
            "#EXTM3U\n#EXTINF:4,\n0.ts\n#EXTINF:4,\n1.ts\n#EXTINF:4,\n2.ts\n#EXT-X-ENDLIST\n",
        )
        .await
        .mock("/clip/0.ts", "zero;")
        .await
        .mock_status("/clip/1.ts", 500)
        .await
        .mock("/clip/2.ts", "two;")
        .await;

    let dir = tempfile::tempdir()?;
    let host = local_host(dir.path());
    let muxer = ConcatMuxer::new(host.blobs());
    let pipeline = ReassemblyPipeline::new(host, muxer, ());

    let url = Url::parse(&format!("{}/clip/index.m3u8", server.uri()))?;
    let state = pipeline.run_job(&url, "clip.mp4", CancelHandle::new()).await;
    assert_eq!(state, JobState::Completed);

    let output = tokio::fs::read(dir.path().join("clip.mp4")).await?;
    assert_eq!(output, b"zero;two;");
    Ok(())
}

#[tokio::test]
async fn test_merge_failure_delivers_separate_tracks() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    serve_split_dash(&server).await;

    let dir = tempfile::tempdir()?;
    let host = local_host(dir.path());
    let blobs = host.blobs();
    let muxer = ConcatMuxer::failing(blobs.clone(), "unsupported codec");
    let pipeline = ReassemblyPipeline::new(host, muxer, ());

    let url = Url::parse(&format!("{}/v/manifest.mpd", server.uri()))?;
    let state = pipeline
        .run_job(&url, "weekly.mp4", CancelHandle::new())
        .await;
    assert_eq!(state, JobState::Completed);

    assert_eq!(
        tokio::fs::read(dir.path().join("weekly_video.webm")).await?,
        b"VIV5V6V7V8"
    );
    assert_eq!(
        tokio::fs::read(dir.path().join("weekly_audio.webm")).await?,
        b"AIA1A2"
    );
    assert!(!dir.path().join("weekly.mp4").exists());
    assert!(blobs.is_empty());
    Ok(())
}

/// Cancels the job once the first batch has been reported.
struct CancelAfterFirstBatch {
    cancel: CancelHandle,
}

impl JobObserver for CancelAfterFirstBatch {
    fn notify(&self, event: JobEvent) {
        if let JobEvent::Progress { status, .. } = &event {
            if status.starts_with("Downloaded ") {
                self.cancel.cancel();
            }
        }
    }
}

#[tokio::test]
async fn test_cancel_after_first_batch() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let playlist: String = std::iter::once("#EXTM3U\n".to_string())
        .chain((0..15).map(|i| format!("#EXTINF:4,\n{i}.ts\n")))
        .collect();
    server.mock("/live/index.m3u8", playlist).await;
    for i in 0..15 {
        server.mock(&format!("/live/{i}.ts"), "x").await;
    }

    let dir = tempfile::tempdir()?;
    let host = local_host(dir.path());
    let blobs = host.blobs();
    let muxer = ConcatMuxer::new(blobs.clone());
    let cancel = CancelHandle::new();
    let observer = CancelAfterFirstBatch {
        cancel: cancel.clone(),
    };
    let config = PipelineConfig::builder()
        .single_track_batch_size(NonZeroUsize::new(5).unwrap())
        .build();
    let pipeline = ReassemblyPipeline::new(host, muxer, observer).with_config(config);

    let url = Url::parse(&format!("{}/live/index.m3u8", server.uri()))?;
    let state = pipeline.run_job(&url, "live.mp4", cancel).await;
    assert_eq!(state, JobState::Cancelled);

    // the playlist and the first batch of five, nothing after the flag was seen
    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 6);
    assert!(!dir.path().join("live.mp4").exists());
    assert!(blobs.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_manifest_error_fails_job() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server.mock_status("/gone.m3u8", 403).await;

    let dir = tempfile::tempdir()?;
    let host = local_host(dir.path());
    let muxer = ConcatMuxer::new(host.blobs());
    let (observer, receiver) = ChannelObserver::new();
    let pipeline = ReassemblyPipeline::new(host, muxer, observer);

    let url = Url::parse(&format!("{}/gone.m3u8", server.uri()))?;
    let state = pipeline.run_job(&url, "gone.mp4", CancelHandle::new()).await;
    assert_eq!(state, JobState::Failed);

    let events = drain(receiver);
    let failures: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            JobEvent::Failed { reason } => Some(reason.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(failures, ["HTTP error: 403 Forbidden"]);
    Ok(())
}

#[tokio::test]
async fn test_direct_link_is_chunked_to_disk() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    server.mock("/files/recording.webm", "abcdefghij").await;

    let dir = tempfile::tempdir()?;
    let host = local_host(dir.path());
    let muxer = ConcatMuxer::new(host.blobs());
    let config = PipelineConfig::builder().chunk_size(6).build();
    let pipeline = ReassemblyPipeline::new(host, muxer, ()).with_config(config);

    let link = format!("{}/files/recording.webm", server.uri());
    let state = pipeline
        .run_link(&DirectUrl, &link, None, CancelHandle::new())
        .await;
    assert_eq!(state, JobState::Completed);

    let part0 = tokio::fs::read(dir.path().join("recording.mp4.part000")).await?;
    let part1 = tokio::fs::read(dir.path().join("recording.mp4.part001")).await?;
    assert_eq!([part0, part1].concat(), b"abcdefghij");

    let manifest: serde_json::Value = serde_json::from_slice(
        &tokio::fs::read(dir.path().join("recording.mp4.manifest.json")).await?,
    )?;
    assert_eq!(manifest["originalFileName"], "recording.mp4");
    assert_eq!(manifest["totalSize"], 10);
    assert_eq!(manifest["chunks"].as_array().map(Vec::len), Some(2));
    Ok(())
}
