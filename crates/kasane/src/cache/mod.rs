pub mod file;
pub mod memory;

use crate::KasaneResult;
use bytes::Bytes;
use std::{future::Future, path::PathBuf, sync::Arc};

/// Key-value byte storage for intermediate track data and muxer output.
pub trait BlobStore: Send + Sync + 'static {
    fn put(&self, key: &str, data: Bytes) -> impl Future<Output = KasaneResult<()>> + Send;

    /// `None` when nothing is stored under `key`.
    fn get(&self, key: &str) -> impl Future<Output = KasaneResult<Option<Bytes>>> + Send;

    /// Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> impl Future<Output = KasaneResult<()>> + Send;

    /// Hint a location for the stored blobs.
    fn location_hint(&self) -> Option<String> {
        None
    }
}

impl<B> BlobStore for Arc<B>
where
    B: BlobStore,
{
    fn put(&self, key: &str, data: Bytes) -> impl Future<Output = KasaneResult<()>> + Send {
        self.as_ref().put(key, data)
    }

    fn get(&self, key: &str) -> impl Future<Output = KasaneResult<Option<Bytes>>> + Send {
        self.as_ref().get(key)
    }

    fn delete(&self, key: &str) -> impl Future<Output = KasaneResult<()>> + Send {
        self.as_ref().delete(key)
    }

    fn location_hint(&self) -> Option<String> {
        self.as_ref().location_hint()
    }
}

pub enum KasaneCache {
    Memory(memory::MemoryBlobStore),
    File(file::FileBlobStore),
}

impl KasaneCache {
    pub fn memory() -> Self {
        Self::Memory(memory::MemoryBlobStore::new())
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(file::FileBlobStore::new(path.into()))
    }
}

impl BlobStore for KasaneCache {
    async fn put(&self, key: &str, data: Bytes) -> KasaneResult<()> {
        match self {
            KasaneCache::Memory(cache) => cache.put(key, data).await,
            KasaneCache::File(cache) => cache.put(key, data).await,
        }
    }

    async fn get(&self, key: &str) -> KasaneResult<Option<Bytes>> {
        match self {
            KasaneCache::Memory(cache) => cache.get(key).await,
            KasaneCache::File(cache) => cache.get(key).await,
        }
    }

    async fn delete(&self, key: &str) -> KasaneResult<()> {
        match self {
            KasaneCache::Memory(cache) => cache.delete(key).await,
            KasaneCache::File(cache) => cache.delete(key).await,
        }
    }

    fn location_hint(&self) -> Option<String> {
        match self {
            KasaneCache::Memory(cache) => cache.location_hint(),
            KasaneCache::File(cache) => cache.location_hint(),
        }
    }
}
