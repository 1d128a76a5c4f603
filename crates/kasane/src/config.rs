use std::{num::NonZeroUsize, time::Duration};

use serde::{Deserialize, Serialize};

/// Size of a delivered part when the output is too large for a single file: 1.5 GiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 1536 * 1024 * 1024;

/// Tunables of a [`ReassemblyPipeline`](crate::ReassemblyPipeline).
///
/// Every field has a default, so a partial TOML or JSON document is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Segments fetched concurrently when audio and video are fetched together.
    pub batch_size: NonZeroUsize,
    /// Segments fetched concurrently when only one track is fetched.
    pub single_track_batch_size: NonZeroUsize,
    pub chunk_size: u64,
    pub mux_timeout_secs: u64,
    /// Share of overall progress covered by segment fetching.
    pub fetch_progress: ProgressRange,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: NonZeroUsize::new(5).unwrap(),
            single_track_batch_size: NonZeroUsize::new(50).unwrap(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            mux_timeout_secs: 300,
            fetch_progress: ProgressRange::new(30., 70.),
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }

    pub fn mux_timeout(&self) -> Duration {
        Duration::from_secs(self.mux_timeout_secs)
    }

    /// Batch size for the given fetch mode.
    pub fn batch_size_for(&self, split: bool) -> usize {
        if split {
            self.batch_size.get()
        } else {
            self.single_track_batch_size.get()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressRange {
    pub start: f32,
    pub end: f32,
}

impl ProgressRange {
    pub const fn new(start: f32, end: f32) -> Self {
        Self { start, end }
    }

    /// Linear position of `done / total` inside the range.
    pub fn map(&self, done: usize, total: usize) -> f32 {
        if total == 0 {
            return self.end;
        }
        let ratio = (done.min(total) as f32) / (total as f32);
        self.start + (self.end - self.start) * ratio
    }
}

pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    pub fn batch_size(mut self, batch_size: NonZeroUsize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn single_track_batch_size(mut self, batch_size: NonZeroUsize) -> Self {
        self.config.single_track_batch_size = batch_size;
        self
    }

    pub fn chunk_size(mut self, chunk_size: u64) -> Self {
        self.config.chunk_size = chunk_size.max(1);
        self
    }

    pub fn mux_timeout(mut self, timeout: Duration) -> Self {
        self.config.mux_timeout_secs = timeout.as_secs();
        self
    }

    pub fn fetch_progress(mut self, start: f32, end: f32) -> Self {
        self.config.fetch_progress = ProgressRange::new(start, end);
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
