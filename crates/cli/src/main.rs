mod commands;
mod config;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "s3local",
    version,
    about = "Read, list and write objects in a local or S3 store"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Store config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let store = config::open_store(cli.config.as_deref())?;

    match cli.command {
        commands::Command::Type => commands::kind::run(store.as_ref()),
        commands::Command::Read(args) => commands::read::run(store.as_ref(), args).await,
        commands::Command::List(args) => commands::list::run(store.as_ref(), args).await,
        commands::Command::Write(args) => commands::write::run(store.as_ref(), args).await,
    }
}
