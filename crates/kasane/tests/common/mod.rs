use std::{path::Path, sync::Arc};

use bytes::Bytes;
use kasane::{
    cache::{memory::MemoryBlobStore, BlobStore},
    host::LocalHost,
    merge::{MuxRequest, MuxResponse, Muxer},
    util::http::HttpClient,
    KasaneResult,
};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

pub type TestHost = LocalHost<MemoryBlobStore>;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("kasane=debug")
        .with_test_writer()
        .try_init();
}

pub fn local_host(output_dir: &Path) -> TestHost {
    LocalHost::new(
        HttpClient::default(),
        Arc::new(MemoryBlobStore::new()),
        output_dir,
    )
}

pub trait ServerMock {
    async fn mock<B>(&self, mock_path: &str, body: B) -> &Self
    where
        B: Into<Vec<u8>>;

    async fn mock_status(&self, mock_path: &str, status: u16) -> &Self;
}

impl ServerMock for MockServer {
    async fn mock<B>(&self, mock_path: &str, body: B) -> &Self
    where
        B: Into<Vec<u8>>,
    {
        let body: Vec<u8> = body.into();
        Mock::given(method("GET"))
            .and(path(mock_path))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(self)
            .await;
        self
    }

    async fn mock_status(&self, mock_path: &str, status: u16) -> &Self {
        Mock::given(method("GET"))
            .and(path(mock_path))
            .respond_with(ResponseTemplate::new(status))
            .mount(self)
            .await;
        self
    }
}

/// Concatenates its inputs (video first) instead of running a real muxer.
pub struct ConcatMuxer {
    blobs: Arc<MemoryBlobStore>,
    fail_with: Option<String>,
}

impl ConcatMuxer {
    pub fn new(blobs: Arc<MemoryBlobStore>) -> Self {
        Self {
            blobs,
            fail_with: None,
        }
    }

    pub fn failing(blobs: Arc<MemoryBlobStore>, message: &str) -> Self {
        Self {
            blobs,
            fail_with: Some(message.to_string()),
        }
    }
}

impl Muxer for ConcatMuxer {
    async fn mux(&self, request: MuxRequest) -> KasaneResult<MuxResponse> {
        if let Some(message) = &self.fail_with {
            return Ok(MuxResponse::failed(message.as_str()));
        }

        let mut output = Vec::new();
        for key in request.inputs.keys() {
            if let Some(blob) = self.blobs.get(key).await? {
                output.extend_from_slice(&blob);
            }
        }
        self.blobs.put(&request.output, Bytes::from(output)).await?;
        Ok(MuxResponse::ok())
    }
}
