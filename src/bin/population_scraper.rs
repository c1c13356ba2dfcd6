use anyhow::Context;
use country_sales::{config::Config, scrape};

fn main() -> anyhow::Result<()> {
    country_sales::init_tracing();

    let config = Config::from_env()?;
    scrape::run(&config).with_context(|| format!("could not scrape {}", config.population_url))?;

    Ok(())
}
