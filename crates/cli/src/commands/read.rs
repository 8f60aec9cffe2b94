use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tokio::io::AsyncWriteExt;
use tracing::info;

use s3local_core::Backend;

#[derive(Args)]
pub struct ReadArgs {
    /// Object key
    key: String,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub async fn run(store: &dyn Backend, args: ReadArgs) -> Result<()> {
    let data = store
        .read(&args.key)
        .await
        .with_context(|| format!("failed to read {}", args.key))?;

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, &data)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote {} bytes to {}", data.len(), path.display());
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&data).await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}
