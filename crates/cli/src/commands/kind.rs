use anyhow::Result;

use s3local_core::Backend;

pub fn run(store: &dyn Backend) -> Result<()> {
    println!("{}", store.store_type());
    Ok(())
}
