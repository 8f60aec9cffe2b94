use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use s3local_core::{Backend, StoreConfig};

const CONFIG_FILE: &str = "s3local.toml";

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("s3local")
        .join(CONFIG_FILE)
}

pub fn open_store(path: Option<&Path>) -> Result<Arc<dyn Backend>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
    debug!(path = %path.display(), "loading store config");

    let config = StoreConfig::load(&path)?;
    s3local_core::open(&config)
        .with_context(|| format!("failed to open {} store", config.backend_type))
}
