use anyhow::Context;
use country_sales::{config::Config, pipeline, storage};

fn main() -> anyhow::Result<()> {
    country_sales::init_tracing();

    let config = Config::from_env()?;
    let stores = storage::from_config(&config)?;
    let stores: Vec<&dyn storage::ObjectStore> = stores.iter().map(|store| store.as_ref()).collect();

    pipeline::run(&config, &stores).context("country sales report failed")?;
    Ok(())
}
