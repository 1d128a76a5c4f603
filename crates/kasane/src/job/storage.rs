use std::sync::Mutex;

use bytes::Bytes;

use crate::{host::HostIo, KasaneResult};

/// Blob storage scoped to one job.
///
/// Keys are `{name}_{job_id}`. Every key written is remembered so that
/// [`cleanup`](Self::cleanup) can remove them all once the job ends.
pub struct ScopedStorage<'a, H> {
    host: &'a H,
    job_id: String,
    keys: Mutex<Vec<String>>,
}

impl<'a, H> ScopedStorage<'a, H>
where
    H: HostIo,
{
    pub fn new(host: &'a H, job_id: impl Into<String>) -> Self {
        Self {
            host,
            job_id: job_id.into(),
            keys: Mutex::new(Vec::new()),
        }
    }

    pub fn key(&self, name: &str) -> String {
        format!("{name}_{}", self.job_id)
    }

    /// Store `bytes` under `name` and return the full key.
    pub async fn put(&self, name: &str, bytes: Bytes) -> KasaneResult<String> {
        let key = self.key(name);
        // record first, a partially written blob must be cleaned up as well
        self.record(&key);
        self.host.blob_put(&key, bytes).await?;
        Ok(key)
    }

    pub async fn get(&self, key: &str) -> KasaneResult<Option<Bytes>> {
        self.host.blob_get(key).await
    }

    /// Remember a key written by someone else, such as the muxer output.
    pub fn record(&self, key: &str) {
        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Delete every recorded key. Failures are logged and never returned.
    pub async fn cleanup(&self) {
        let keys = std::mem::take(&mut *self.keys.lock().unwrap_or_else(|e| e.into_inner()));
        for key in keys {
            if let Err(e) = self.host.blob_delete(&key).await {
                tracing::warn!("Failed to clean up {key}: {e}");
            }
        }
    }
}
