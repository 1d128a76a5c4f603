use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use bytes::Bytes;
use url::Url;

use crate::{
    api::ManifestUrlResolver,
    config::PipelineConfig,
    deliver::deliver,
    event::{JobEvent, JobObserver},
    fetch::{BatchProgress, FetchedTrack, SegmentFetcher},
    host::HostIo,
    job::{ActiveJobs, CancelHandle, JobContext, JobState, ScopedStorage},
    manifest::{parse_m3u8, parse_mpd},
    merge::{MuxRequest, Muxer},
    resolve::{resolve, ResolvedSegmentSet},
    util::{file_name_with_suffix, url::unsplit_manifest_url},
    KasaneError, KasaneResult, TrackKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Hls,
    Dash,
    /// Anything that is not a known manifest is fetched as one file.
    Direct,
}

impl SourceKind {
    pub fn classify(url: &Url) -> Self {
        let path = url.path().to_ascii_lowercase();
        if path.ends_with(".m3u8") {
            Self::Hls
        } else if path.ends_with(".mpd") {
            Self::Dash
        } else {
            Self::Direct
        }
    }
}

/// Progress that never moves backwards, even when two tracks report out of step.
struct ProgressReporter<'a, O> {
    observer: &'a O,
    last: Mutex<f32>,
}

impl<'a, O> ProgressReporter<'a, O>
where
    O: JobObserver,
{
    fn new(observer: &'a O) -> Self {
        Self {
            observer,
            last: Mutex::new(0.),
        }
    }

    fn report<S: Into<String>>(&self, percentage: f32, status: S) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let percentage = percentage.clamp(*last, 100.);
        *last = percentage;
        self.observer.notify(JobEvent::progress(percentage, status));
    }
}

/// Drives one download from manifest URL to delivered file.
///
/// Every job notifies its observer with progress events followed by exactly one terminal
/// event, and removes everything it stored in host storage before returning.
pub struct ReassemblyPipeline<H, M, O> {
    host: H,
    muxer: M,
    observer: O,
    config: PipelineConfig,
}

impl<H, M, O> ReassemblyPipeline<H, M, O>
where
    H: HostIo,
    M: Muxer,
    O: JobObserver,
{
    pub fn new(host: H, muxer: M, observer: O) -> Self {
        Self {
            host,
            muxer,
            observer,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolve a share link (or whatever `resolver` accepts) to a manifest URL and run it.
    pub async fn run_link<R>(
        &self,
        resolver: &R,
        link: &str,
        password: Option<&str>,
        cancel: CancelHandle,
    ) -> JobState
    where
        R: ManifestUrlResolver,
    {
        let asset = match resolver.resolve_manifest_url(link, password).await {
            Ok(asset) => asset,
            Err(e) => {
                tracing::error!("Failed to resolve {link}: {e}");
                self.observer.notify(JobEvent::Failed {
                    reason: e.to_string(),
                });
                return JobState::Failed;
            }
        };

        let file_name = asset.file_name();
        self.run_job(&asset.manifest_url, &file_name, cancel).await
    }

    /// Run one job to its terminal state.
    pub async fn run_job(&self, manifest_url: &Url, file_name: &str, cancel: CancelHandle) -> JobState {
        let _guard = ActiveJobs::global().add();
        let mut job = JobContext::new(file_name, cancel);
        let storage = ScopedStorage::new(&self.host, job.id());
        let progress = ProgressReporter::new(&self.observer);
        tracing::info!("Job {} started for {manifest_url}", job.id());

        let result = self.execute(&mut job, &storage, &progress, manifest_url).await;
        storage.cleanup().await;

        match result {
            Ok(status) => {
                job.transition(JobState::Completed);
                progress.report(100., "Download complete!");
                self.observer.notify(JobEvent::Completed { status });
            }
            Err(e) if e.is_cancelled() => {
                job.transition(JobState::Cancelled);
                self.observer.notify(JobEvent::Cancelled);
            }
            Err(e) => {
                tracing::error!("Job {} failed: {e}", job.id());
                job.transition(JobState::Failed);
                self.observer.notify(JobEvent::Failed {
                    reason: e.to_string(),
                });
            }
        }
        job.state()
    }

    async fn execute(
        &self,
        job: &mut JobContext,
        storage: &ScopedStorage<'_, H>,
        progress: &ProgressReporter<'_, O>,
        manifest_url: &Url,
    ) -> KasaneResult<String> {
        job.cancel_handle().check()?;
        job.transition(JobState::Resolving);
        progress.report(5., "Starting download...");

        let kind = SourceKind::classify(manifest_url);
        let manifest_url = match kind {
            SourceKind::Hls => match unsplit_manifest_url(manifest_url.as_str()) {
                Some(url) => {
                    tracing::debug!("Using combined manifest {url}");
                    Url::parse(&url)?
                }
                None => manifest_url.clone(),
            },
            SourceKind::Dash => manifest_url.clone(),
            SourceKind::Direct => {
                return self.deliver_direct(job, progress, manifest_url).await;
            }
        };

        progress.report(10., "Resolving segments...");
        job.cancel_handle().check()?;
        let text = self.host.fetch_text(&manifest_url).await?;
        let manifest = match kind {
            SourceKind::Dash => parse_mpd(&text),
            _ => parse_m3u8(&text),
        };
        job.cancel_handle().check()?;

        let segments = resolve(&self.host, &manifest, &manifest_url).await?;
        job.cancel_handle().check()?;

        if kind == SourceKind::Dash && segments.video.is_empty() {
            tracing::warn!("No video segments in DASH manifest, downloading it as a single file");
            return self.deliver_direct(job, progress, &manifest_url).await;
        }
        if segments.is_empty() {
            return Err(KasaneError::NoSegments);
        }

        job.transition(JobState::Fetching);
        let (audio, video) = self.fetch_tracks(job, progress, &segments).await?;
        job.cancel_handle().check()?;

        job.transition(JobState::Reassembling);
        progress.report(75., "Processing and merging segments...");
        let file_name = job.file_name().to_string();
        match (video, audio) {
            (Some(video), Some(audio)) => {
                self.merge_tracks(job, storage, progress, video, audio).await
            }
            (Some(video), None) => {
                let video_key = storage.put("video", video.into_blob()).await?;
                let output_key = storage.key("merged");
                storage.record(&output_key);
                let request = MuxRequest::convert(
                    format!("convert_{}", job.id()),
                    video_key,
                    output_key.clone(),
                );
                let output = self.mux(storage, request).await?;
                self.deliver(job, progress, output, &file_name).await
            }
            (None, Some(audio)) => {
                tracing::info!("Audio-only stream, delivering without muxing");
                let audio_name = file_name_with_suffix(&file_name, "_audio", "webm");
                self.deliver(job, progress, audio.into_blob(), &audio_name)
                    .await
            }
            (None, None) => {
                let kind = if segments.video.is_empty() {
                    TrackKind::Audio
                } else {
                    TrackKind::Video
                };
                Err(KasaneError::EmptyTrack(kind))
            }
        }
    }

    /// Fetch every resolved track. A track that yields no segment at all comes back as `None`.
    async fn fetch_tracks(
        &self,
        job: &JobContext,
        progress: &ProgressReporter<'_, O>,
        segments: &ResolvedSegmentSet,
    ) -> KasaneResult<(Option<FetchedTrack>, Option<FetchedTrack>)> {
        let split = segments.is_split();
        let batch_size = self.config.batch_size_for(split);
        let total = segments.total();
        tracing::info!(
            "Fetching {} audio and {} video segments, batch size {batch_size}",
            segments.audio.len(),
            segments.video.len()
        );

        let range = self.config.fetch_progress;
        progress.report(range.start, "Downloading segments...");

        let audio_done = AtomicUsize::new(0);
        let video_done = AtomicUsize::new(0);
        let on_batch = |batch: BatchProgress| {
            match batch.kind {
                TrackKind::Audio => audio_done.store(batch.processed, Ordering::Relaxed),
                TrackKind::Video => video_done.store(batch.processed, Ordering::Relaxed),
            }
            let processed = audio_done.load(Ordering::Relaxed) + video_done.load(Ordering::Relaxed);
            progress.report(
                range.map(processed, total),
                format!("Downloaded {processed}/{total} segments"),
            );
        };

        let (audio, video) = tokio::join!(
            self.fetch_track(job, TrackKind::Audio, segments, batch_size, &on_batch),
            self.fetch_track(job, TrackKind::Video, segments, batch_size, &on_batch),
        );
        let (audio, video) = (audio?, video?);

        if split && (audio.is_none() || video.is_none()) {
            tracing::warn!(
                "One track could not be fetched at all (audio: {}, video: {})",
                audio.is_some(),
                video.is_some()
            );
        }
        Ok((audio, video))
    }

    async fn fetch_track<F>(
        &self,
        job: &JobContext,
        kind: TrackKind,
        segments: &ResolvedSegmentSet,
        batch_size: usize,
        on_batch: &F,
    ) -> KasaneResult<Option<FetchedTrack>>
    where
        F: Fn(BatchProgress) + Send + Sync,
    {
        let urls = segments.track(kind);
        if urls.is_empty() {
            return Ok(None);
        }

        let fetcher = SegmentFetcher::new(&self.host, kind, batch_size, job.cancel_handle().clone());
        let track = fetcher.fetch(urls, on_batch).await?;
        if track.is_degraded() {
            tracing::warn!(
                "{kind} track is missing segments {:?}",
                track.failed_indices
            );
        }
        Ok((!track.is_empty()).then_some(track))
    }

    /// Merge audio and video. When muxing fails, both tracks are delivered as separate files.
    async fn merge_tracks(
        &self,
        job: &mut JobContext,
        storage: &ScopedStorage<'_, H>,
        progress: &ProgressReporter<'_, O>,
        video: FetchedTrack,
        audio: FetchedTrack,
    ) -> KasaneResult<String> {
        let video = video.into_blob();
        let audio = audio.into_blob();
        tracing::debug!("Audio blob: {} bytes, video blob: {} bytes", audio.len(), video.len());

        let file_name = job.file_name().to_string();
        let merged = async {
            let video_key = storage.put("video", video.clone()).await?;
            let audio_key = storage.put("audio", audio.clone()).await?;
            let output_key = storage.key("merged");
            storage.record(&output_key);
            let request = MuxRequest::merge(
                format!("merge_{}", job.id()),
                video_key,
                audio_key,
                output_key,
            );
            self.mux(storage, request).await
        }
        .await;

        let merge_error = match merged {
            Ok(output) => return self.deliver(job, progress, output, &file_name).await,
            Err(e) => e,
        };

        tracing::warn!("Merge failed, delivering audio and video separately: {merge_error}");
        job.transition(JobState::Delivering);
        progress.report(90., "Saving audio and video separately...");
        let audio_name = file_name_with_suffix(&file_name, "_audio", "webm");
        let video_name = file_name_with_suffix(&file_name, "_video", "webm");
        let fallback = async {
            deliver(&self.host, audio, &audio_name, self.config.chunk_size).await?;
            deliver(&self.host, video, &video_name, self.config.chunk_size).await
        }
        .await;

        match fallback {
            Ok(_) => Ok(format!(
                "Saved {audio_name} and {video_name} separately (merge failed: {merge_error})"
            )),
            Err(fallback_error) => Err(KasaneError::FallbackDelivery {
                merge: merge_error.to_string(),
                fallback: fallback_error.to_string(),
            }),
        }
    }

    /// Send `request` and read back its output.
    async fn mux(&self, storage: &ScopedStorage<'_, H>, request: MuxRequest) -> KasaneResult<Bytes> {
        let timeout = self.config.mux_timeout();
        let output_key = request.output.clone();
        tracing::info!("Sending {:?} request {}", request.command, request.request_id);

        let response = tokio::time::timeout(timeout, self.muxer.mux(request))
            .await
            .map_err(|_| KasaneError::MuxerTimeout(timeout))??;
        tracing::debug!("Muxer response: {response:?}");
        response.into_result()?;

        storage
            .get(&output_key)
            .await?
            .ok_or(KasaneError::BlobNotFound(output_key))
    }

    async fn deliver(
        &self,
        job: &mut JobContext,
        progress: &ProgressReporter<'_, O>,
        bytes: Bytes,
        file_name: &str,
    ) -> KasaneResult<String> {
        job.transition(JobState::Delivering);
        progress.report(90., "Saving file...");
        deliver(&self.host, bytes, file_name, self.config.chunk_size).await?;
        Ok(format!("Saved {file_name}"))
    }

    async fn deliver_direct(
        &self,
        job: &mut JobContext,
        progress: &ProgressReporter<'_, O>,
        url: &Url,
    ) -> KasaneResult<String> {
        job.transition(JobState::Fetching);
        progress.report(10., "Downloading file...");
        job.cancel_handle().check()?;
        let bytes = self.host.fetch_bytes(url).await?;
        job.cancel_handle().check()?;

        let file_name = job.file_name().to_string();
        self.deliver(job, progress, bytes, &file_name).await
    }
}
