use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{host::HostIo, KasaneResult};

const REASSEMBLY_INSTRUCTIONS: &str =
    "Use 'cat file.part* > file' on Unix or 'copy /b file.part* file' on Windows";

/// Describes how to put a chunked delivery back together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkManifest {
    pub original_file_name: String,
    pub total_size: u64,
    pub chunk_size: u64,
    pub chunks: Vec<String>,
    pub reassembly_instructions: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Single { file_name: String },
    Chunked { manifest_file_name: String, manifest: ChunkManifest },
}

pub fn part_file_name(file_name: &str, index: usize) -> String {
    format!("{file_name}.part{index:03}")
}

pub fn manifest_file_name(file_name: &str) -> String {
    format!("{file_name}.manifest.json")
}

/// Deliver `bytes` as `file_name`.
///
/// Payloads larger than `chunk_size` are delivered as consecutive parts named
/// `{file_name}.part000`, `{file_name}.part001`, ... followed by
/// `{file_name}.manifest.json`. Concatenating the parts in name order restores the input.
pub async fn deliver<H>(
    host: &H,
    bytes: Bytes,
    file_name: &str,
    chunk_size: u64,
) -> KasaneResult<Delivery>
where
    H: HostIo,
{
    let total_size = bytes.len() as u64;
    let chunk_size = chunk_size.max(1);
    tracing::info!(
        "Delivering {file_name}, size: {:.2} MB",
        total_size as f64 / 1024. / 1024.
    );

    if total_size <= chunk_size {
        host.deliver_file(bytes, file_name).await?;
        return Ok(Delivery::Single {
            file_name: file_name.to_string(),
        });
    }

    tracing::info!(
        "{file_name} exceeds {:.2} GB, delivering in parts",
        chunk_size as f64 / 1024. / 1024. / 1024.
    );

    let step = usize::try_from(chunk_size).unwrap_or(usize::MAX);
    let mut chunks = Vec::new();
    let mut offset = 0;
    while offset < bytes.len() {
        let end = offset.saturating_add(step).min(bytes.len());
        let part_name = part_file_name(file_name, chunks.len());
        tracing::debug!("Delivering {part_name}, {} bytes", end - offset);
        host.deliver_file(bytes.slice(offset..end), &part_name)
            .await?;
        chunks.push(part_name);
        offset = end;
    }

    let manifest = ChunkManifest {
        original_file_name: file_name.to_string(),
        total_size,
        chunk_size,
        chunks,
        reassembly_instructions: REASSEMBLY_INSTRUCTIONS.to_string(),
    };
    let manifest_file_name = manifest_file_name(file_name);
    let json = serde_json::to_vec_pretty(&manifest)?;
    host.deliver_file(Bytes::from(json), &manifest_file_name)
        .await?;

    Ok(Delivery::Chunked {
        manifest_file_name,
        manifest,
    })
}
