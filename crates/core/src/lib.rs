pub mod backend;
pub mod config;
pub mod error;

pub use backend::{Backend, open};
pub use config::StoreConfig;
pub use error::{Result, StoreError};
