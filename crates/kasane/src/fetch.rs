use std::collections::BTreeSet;

use bytes::{Bytes, BytesMut};
use futures::future::join_all;
use url::Url;

use crate::{host::HostIo, job::CancelHandle, KasaneResult, TrackKind};

/// Segments of one track in playback order.
///
/// Segments that could not be fetched are left out of `buffers` and their positions
/// recorded in `failed_indices`.
#[derive(Debug, Default)]
pub struct FetchedTrack {
    pub buffers: Vec<Bytes>,
    pub failed_indices: BTreeSet<usize>,
    pub total: usize,
}

impl FetchedTrack {
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Some, but not all, segments failed.
    pub fn is_degraded(&self) -> bool {
        !self.failed_indices.is_empty() && !self.buffers.is_empty()
    }

    pub fn byte_len(&self) -> usize {
        self.buffers.iter().map(Bytes::len).sum()
    }

    /// Concatenate the fetched segments into one blob.
    pub fn into_blob(self) -> Bytes {
        let mut blob = BytesMut::with_capacity(self.byte_len());
        for buffer in self.buffers {
            blob.extend_from_slice(&buffer);
        }
        blob.freeze()
    }
}

/// Reported after every batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub kind: TrackKind,
    pub processed: usize,
    pub total: usize,
    pub failed: usize,
}

/// Fetches the segments of one track in fixed-size concurrent batches.
///
/// A failed segment does not fail the track. Cancellation is observed between batches.
pub struct SegmentFetcher<'a, H> {
    host: &'a H,
    kind: TrackKind,
    batch_size: usize,
    cancel: CancelHandle,
}

impl<'a, H> SegmentFetcher<'a, H>
where
    H: HostIo,
{
    pub fn new(host: &'a H, kind: TrackKind, batch_size: usize, cancel: CancelHandle) -> Self {
        Self {
            host,
            kind,
            batch_size: batch_size.max(1),
            cancel,
        }
    }

    pub async fn fetch<F>(&self, urls: &[Url], on_batch: F) -> KasaneResult<FetchedTrack>
    where
        F: Fn(BatchProgress) + Send + Sync,
    {
        let total = urls.len();
        let mut track = FetchedTrack {
            buffers: Vec::with_capacity(total),
            failed_indices: BTreeSet::new(),
            total,
        };

        for (batch_index, batch) in urls.chunks(self.batch_size).enumerate() {
            self.cancel.check()?;

            let offset = batch_index * self.batch_size;
            let results = join_all(batch.iter().map(|url| self.host.fetch_bytes(url))).await;
            for (i, result) in results.into_iter().enumerate() {
                match result {
                    Ok(bytes) => track.buffers.push(bytes),
                    Err(e) => {
                        let index = offset + i;
                        tracing::warn!("Failed to fetch {} segment {index}: {e}", self.kind);
                        track.failed_indices.insert(index);
                    }
                }
            }

            on_batch(BatchProgress {
                kind: self.kind,
                processed: offset + batch.len(),
                total,
                failed: track.failed_indices.len(),
            });
            self.cancel.check()?;
        }

        if !track.failed_indices.is_empty() {
            tracing::warn!(
                "{} of {total} {} segments failed",
                track.failed_indices.len(),
                self.kind
            );
        }
        tracing::debug!(
            "Fetched {} {} segments, {} bytes",
            track.buffers.len(),
            self.kind,
            track.byte_len()
        );
        Ok(track)
    }
}
