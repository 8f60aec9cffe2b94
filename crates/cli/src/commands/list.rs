use anyhow::{Context, Result};
use clap::Args;

use s3local_core::Backend;

#[derive(Args)]
pub struct ListArgs {
    /// Only keys starting with this prefix
    #[arg(long, default_value = "")]
    prefix: String,

    /// Only keys ending with this suffix
    #[arg(long, default_value = "")]
    suffix: String,

    /// Print a JSON array instead of one key per line
    #[arg(long)]
    json: bool,
}

pub async fn run(store: &dyn Backend, args: ListArgs) -> Result<()> {
    let keys = store
        .list(&args.prefix, &args.suffix)
        .await
        .with_context(|| format!("failed to list prefix {:?}", args.prefix))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&keys)?);
    } else {
        for key in &keys {
            println!("{key}");
        }
    }

    Ok(())
}
