pub mod kind;
pub mod list;
pub mod read;
pub mod write;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Command {
    /// Print the backend type of the configured store
    Type,
    /// Print the contents of an object
    Read(read::ReadArgs),
    /// List object keys
    List(list::ListArgs),
    /// Store data under a key
    Write(write::WriteArgs),
}
