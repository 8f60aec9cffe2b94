use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use s3local_core::Backend;

#[derive(Args)]
pub struct WriteArgs {
    /// Object key
    key: String,

    /// Read from this file instead of stdin
    #[arg(short, long)]
    input: Option<PathBuf>,
}

pub async fn run(store: &dyn Backend, args: WriteArgs) -> Result<()> {
    let result = match &args.input {
        Some(path) => {
            let mut file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            store.write(&args.key, &mut file).await
        }
        None => store.write(&args.key, &mut tokio::io::stdin()).await,
    };
    result.with_context(|| format!("failed to write {}", args.key))?;

    info!("Stored {} in {} store", args.key, store.store_type());
    Ok(())
}
