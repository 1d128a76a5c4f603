mod config;

use std::{num::NonZeroUsize, path::PathBuf, sync::Arc, time::Duration};

use anyhow::bail;
use clap::Parser;
use kasane::{
    api::{DirectUrl, SessionApiResolver, ShareLink},
    cache::{BlobStore, KasaneCache},
    event::TracingObserver,
    host::LocalHost,
    job::{CancelHandle, JobState},
    merge::FfmpegCliMuxer,
    util::http::HttpClient,
    ReassemblyPipeline,
};

use crate::config::Config;

#[derive(Parser, Debug, Clone)]
#[clap(version, author)]
pub struct KasaneArgs {
    /// Debug output
    #[clap(long, alias = "debug")]
    verbose: bool,

    /// Configuration file
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Password of a protected video
    #[clap(short, long, env = "KASANE_PASSWORD")]
    password: Option<String>,

    /// Directory the downloaded file is saved into
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Directory for intermediate files
    #[clap(long, env = "TEMP")]
    temp_dir: Option<PathBuf>,

    /// Keep intermediate data in memory instead of the temporary directory
    #[clap(long)]
    memory_cache: bool,

    /// Segments fetched at the same time when audio and video are separate
    #[clap(long)]
    batch_size: Option<NonZeroUsize>,

    /// Path to the ffmpeg executable. Found in PATH if not set.
    #[clap(long)]
    ffmpeg: Option<PathBuf>,

    /// Request timeout in seconds
    #[clap(long, default_value = "60")]
    timeout: u64,

    /// Share link, manifest URL or direct file URL
    url: String,
}

impl KasaneArgs {
    fn temp_dir(&self, config: &Config) -> anyhow::Result<PathBuf> {
        Ok(match self.temp_dir.as_ref().or(config.temp_dir.as_ref()) {
            Some(temp_dir) => {
                if !temp_dir.exists() {
                    tracing::error!("Temporary path directory does not exist.");
                    bail!("Temporary path directory does not exist.");
                }
                let temp_dir = temp_dir.canonicalize()?;
                tracing::info!("Temporary path sets to {}", temp_dir.display());
                temp_dir
            }
            None => std::env::temp_dir(),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = KasaneArgs::parse();

    let default_filter = if args.verbose {
        "kasane=debug"
    } else {
        "kasane=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let mut pipeline_config = config.pipeline.clone();
    if let Some(batch_size) = args.batch_size {
        pipeline_config.batch_size = batch_size;
    }

    let cache = if args.memory_cache {
        KasaneCache::memory()
    } else {
        let started_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)?
            .as_millis();
        KasaneCache::file(args.temp_dir(&config)?.join(format!("kasane_{started_at}")))
    };
    let blobs = Arc::new(cache);
    if let Some(location) = blobs.location_hint() {
        tracing::info!("Intermediate data is kept in {location}");
    }

    let output_dir = args
        .output
        .clone()
        .or(config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let client = HttpClient::with_timeout(Duration::from_secs(args.timeout))?;
    let host = LocalHost::new(client.clone(), blobs.clone(), output_dir);

    let mut muxer = FfmpegCliMuxer::new(blobs);
    if let Some(ffmpeg) = &args.ffmpeg {
        muxer = muxer.with_executable(ffmpeg);
    }

    let pipeline = ReassemblyPipeline::new(host, muxer, TracingObserver).with_config(pipeline_config);

    let cancel = CancelHandle::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl-C received, stopping after the current batch...");
                cancel.cancel();
            }
        }
    });

    let password = args.password.as_deref();
    let state = if ShareLink::parse(&args.url).is_ok() {
        let resolver = SessionApiResolver::new(client)?;
        pipeline.run_link(&resolver, &args.url, password, cancel).await
    } else {
        pipeline.run_link(&DirectUrl, &args.url, password, cancel).await
    };

    match state {
        JobState::Completed => Ok(()),
        JobState::Cancelled => bail!("Download cancelled"),
        _ => bail!("Download failed"),
    }
}
