use super::BlobStore;
use crate::KasaneResult;
use bytes::Bytes;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    cache: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: Bytes) -> KasaneResult<()> {
        if let Ok(mut cache) = self.cache.lock() {
            if cache.insert(key.to_string(), data).is_some() {
                tracing::debug!("Blob {key} overwritten.");
            }
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> KasaneResult<Option<Bytes>> {
        Ok(self
            .cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(key).cloned()))
    }

    async fn delete(&self, key: &str) -> KasaneResult<()> {
        if let Ok(mut cache) = self.cache.lock() {
            cache.remove(key);
        }
        Ok(())
    }
}
