pub mod local;
pub mod s3;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncRead;
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};

use self::local::LocalBackend;
use self::s3::S3Backend;

#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend kind, `"local"` or `"s3"`.
    fn store_type(&self) -> &'static str;

    /// Full contents of the object at `key`.
    async fn read(&self, key: &str) -> Result<Vec<u8>>;

    /// Keys starting with `prefix` and ending with `suffix`. Order is backend specific.
    async fn list(&self, prefix: &str, suffix: &str) -> Result<Vec<String>>;

    /// Create or overwrite `key` with everything readable from `content`.
    async fn write(&self, key: &str, content: &mut (dyn AsyncRead + Unpin + Send)) -> Result<()>;
}

/// Build the backend named by `config.backend_type`.
pub fn open(config: &StoreConfig) -> Result<Arc<dyn Backend>> {
    debug!(backend = %config.backend_type, "opening store");
    match config.backend_type.as_str() {
        "local" => Ok(Arc::new(LocalBackend::from_settings(&config.settings))),
        "s3" => Ok(Arc::new(S3Backend::from_settings(&config.settings)?)),
        other => Err(StoreError::Config(format!("invalid type: {other:?}"))),
    }
}
