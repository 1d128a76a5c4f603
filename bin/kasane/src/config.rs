use std::path::{Path, PathBuf};

use kasane::PipelineConfig;
use serde::{Deserialize, Serialize};

/// Contents of the `--config` file.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output_dir: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub pipeline: PipelineConfig,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config = toml::from_str(&data)?;
        Ok(config)
    }
}
