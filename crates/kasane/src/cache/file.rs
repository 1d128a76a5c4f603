use super::BlobStore;
use crate::KasaneResult;
use bytes::Bytes;
use std::{io::ErrorKind, path::PathBuf};

pub struct FileBlobStore {
    cache_dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    async fn ensure_cache_dir(&self) -> KasaneResult<()> {
        if !self.cache_dir.exists() {
            tokio::fs::create_dir_all(&self.cache_dir).await?;
        }

        Ok(())
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        let filename = key.replace(['/', '\\'], "__");
        self.cache_dir.join(filename)
    }
}

impl BlobStore for FileBlobStore {
    async fn put(&self, key: &str, data: Bytes) -> KasaneResult<()> {
        self.ensure_cache_dir().await?;
        tokio::fs::write(self.blob_path(key), &data).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> KasaneResult<Option<Bytes>> {
        match tokio::fs::read(self.blob_path(key)).await {
            Ok(data) => Ok(Some(data.into())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> KasaneResult<()> {
        match tokio::fs::remove_file(self.blob_path(key)).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn location_hint(&self) -> Option<String> {
        Some(self.cache_dir.display().to_string())
    }
}
