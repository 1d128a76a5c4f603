use std::{future::Future, path::PathBuf, sync::Arc};

use bytes::Bytes;
use url::Url;

use crate::{cache::BlobStore, util::http::HttpClient, KasaneError, KasaneResult};

/// Everything the pipeline needs from the environment it runs in: network fetches,
/// key-value blob storage and saving the finished file.
pub trait HostIo: Send + Sync {
    fn fetch_text(&self, url: &Url) -> impl Future<Output = KasaneResult<String>> + Send;

    fn fetch_bytes(&self, url: &Url) -> impl Future<Output = KasaneResult<Bytes>> + Send;

    fn blob_put(&self, key: &str, bytes: Bytes) -> impl Future<Output = KasaneResult<()>> + Send;

    fn blob_get(&self, key: &str) -> impl Future<Output = KasaneResult<Option<Bytes>>> + Send;

    fn blob_delete(&self, key: &str) -> impl Future<Output = KasaneResult<()>> + Send;

    /// Save `bytes` under the suggested `file_name`.
    fn deliver_file(
        &self,
        bytes: Bytes,
        file_name: &str,
    ) -> impl Future<Output = KasaneResult<()>> + Send;
}

impl<H> HostIo for Arc<H>
where
    H: HostIo,
{
    fn fetch_text(&self, url: &Url) -> impl Future<Output = KasaneResult<String>> + Send {
        self.as_ref().fetch_text(url)
    }

    fn fetch_bytes(&self, url: &Url) -> impl Future<Output = KasaneResult<Bytes>> + Send {
        self.as_ref().fetch_bytes(url)
    }

    fn blob_put(&self, key: &str, bytes: Bytes) -> impl Future<Output = KasaneResult<()>> + Send {
        self.as_ref().blob_put(key, bytes)
    }

    fn blob_get(&self, key: &str) -> impl Future<Output = KasaneResult<Option<Bytes>>> + Send {
        self.as_ref().blob_get(key)
    }

    fn blob_delete(&self, key: &str) -> impl Future<Output = KasaneResult<()>> + Send {
        self.as_ref().blob_delete(key)
    }

    fn deliver_file(
        &self,
        bytes: Bytes,
        file_name: &str,
    ) -> impl Future<Output = KasaneResult<()>> + Send {
        self.as_ref().deliver_file(bytes, file_name)
    }
}

impl<H> HostIo for &H
where
    H: HostIo + ?Sized,
{
    fn fetch_text(&self, url: &Url) -> impl Future<Output = KasaneResult<String>> + Send {
        (**self).fetch_text(url)
    }

    fn fetch_bytes(&self, url: &Url) -> impl Future<Output = KasaneResult<Bytes>> + Send {
        (**self).fetch_bytes(url)
    }

    fn blob_put(&self, key: &str, bytes: Bytes) -> impl Future<Output = KasaneResult<()>> + Send {
        (**self).blob_put(key, bytes)
    }

    fn blob_get(&self, key: &str) -> impl Future<Output = KasaneResult<Option<Bytes>>> + Send {
        (**self).blob_get(key)
    }

    fn blob_delete(&self, key: &str) -> impl Future<Output = KasaneResult<()>> + Send {
        (**self).blob_delete(key)
    }

    fn deliver_file(
        &self,
        bytes: Bytes,
        file_name: &str,
    ) -> impl Future<Output = KasaneResult<()>> + Send {
        (**self).deliver_file(bytes, file_name)
    }
}

/// [`HostIo`] for a local process: HTTP through reqwest, blobs in a [`BlobStore`],
/// delivered files written into an output directory.
pub struct LocalHost<B> {
    client: HttpClient,
    blobs: Arc<B>,
    output_dir: PathBuf,
}

impl<B> LocalHost<B>
where
    B: BlobStore,
{
    pub fn new(client: HttpClient, blobs: Arc<B>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            blobs,
            output_dir: output_dir.into(),
        }
    }

    /// Shared handle to the blob store, for collaborators such as the muxer.
    pub fn blobs(&self) -> Arc<B> {
        self.blobs.clone()
    }

    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }

    async fn get(&self, url: &Url) -> KasaneResult<reqwest::Response> {
        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            if let Ok(body) = response.text().await {
                tracing::warn!("Error body: {body}");
            }
            return Err(KasaneError::HttpError(status));
        }
        Ok(response)
    }
}

impl<B> HostIo for LocalHost<B>
where
    B: BlobStore,
{
    async fn fetch_text(&self, url: &Url) -> KasaneResult<String> {
        Ok(self.get(url).await?.text().await?)
    }

    async fn fetch_bytes(&self, url: &Url) -> KasaneResult<Bytes> {
        Ok(self.get(url).await?.bytes().await?)
    }

    async fn blob_put(&self, key: &str, bytes: Bytes) -> KasaneResult<()> {
        self.blobs.put(key, bytes).await
    }

    async fn blob_get(&self, key: &str) -> KasaneResult<Option<Bytes>> {
        self.blobs.get(key).await
    }

    async fn blob_delete(&self, key: &str) -> KasaneResult<()> {
        self.blobs.delete(key).await
    }

    async fn deliver_file(&self, bytes: Bytes, file_name: &str) -> KasaneResult<()> {
        if !self.output_dir.exists() {
            tokio::fs::create_dir_all(&self.output_dir).await?;
        }

        let path = self.output_dir.join(file_name);
        tokio::fs::write(&path, &bytes).await?;
        tracing::info!(
            "Saved {} ({:.2} MB)",
            path.display(),
            bytes.len() as f64 / 1024. / 1024.
        );
        Ok(())
    }
}
