//! The country sales report: both ingestion exercises end to end.

use tracing::{debug, info, info_span};

use crate::{
    config::{
        Config, COUNTRY_SALES_FILE, EXERCISE1_FILE, EXERCISE2_FILE, FIRST_BATCH_FILE,
        GEO_CATALOG_FILE, POPULATION_FILE, SECOND_BATCH_FILE,
    },
    csv,
    domain::{
        geography::GeoCatalog,
        population::{CountryPopulation, PopulationTable},
        sales::{self, CountrySales},
        transaction::Transaction,
    },
    error::Result,
    storage::{self, ObjectStore},
};

pub struct Inputs {
    pub batch1: Vec<Transaction>,
    pub batch2: Vec<Transaction>,
    pub geography: GeoCatalog,
    pub population: PopulationTable,
}

#[derive(Debug)]
pub struct Outputs {
    /// First batch only.
    pub exercise1: Vec<CountrySales>,
    /// Both batches, second one without the sales the first already had.
    pub exercise2: Vec<CountrySales>,
}

pub fn load(config: &Config) -> Result<Inputs> {
    let geography = GeoCatalog::new(csv::read_file(&config.path(GEO_CATALOG_FILE))?);
    let population = PopulationTable::new(csv::read_file::<CountryPopulation>(
        &config.path(POPULATION_FILE),
    )?);
    let batch1: Vec<Transaction> = csv::read_file(&config.path(FIRST_BATCH_FILE))?;
    let batch2: Vec<Transaction> = csv::read_file(&config.path(SECOND_BATCH_FILE))?;

    info!(
        regions = geography.len(),
        countries = population.len(),
        batch1 = batch1.len(),
        batch2 = batch2.len(),
        "inputs loaded"
    );

    Ok(Inputs {
        batch1,
        batch2,
        geography,
        population,
    })
}

/// Both exercises over `inputs`. Fails only when a sum leaves the decimal range.
pub fn aggregate(inputs: Inputs) -> Result<Outputs> {
    let Inputs {
        batch1,
        batch2,
        geography,
        population,
    } = inputs;

    let span = info_span!("exercise1").entered();
    let first_totals = sales::dedupe(batch1)?;
    debug!(tickets = first_totals.len(), "first batch deduplicated");

    let fresh = sales::exclude_seen(batch2, &first_totals);
    let first = sales::by_country_day(sales::enrich(first_totals, &geography))?;
    let exercise1 = sorted(sales::country_sales(sales::with_population(
        first.clone(),
        &population,
    ))?);
    info!(rows = exercise1.len(), "exercise 1 aggregated");
    drop(span);

    let _span = info_span!("exercise2").entered();
    debug!(transactions = fresh.len(), "second batch after excluding seen sales");
    let second = sales::by_country_day(sales::enrich(sales::dedupe(fresh)?, &geography))?;
    let exercise2 = sorted(sales::country_sales(sales::merge(first, second, &population)?)?);
    info!(rows = exercise2.len(), "exercise 2 aggregated");

    Ok(Outputs {
        exercise1,
        exercise2,
    })
}

/// Stable file order; the aggregation itself defines none.
fn sorted(mut rows: Vec<CountrySales>) -> Vec<CountrySales> {
    rows.sort_by(|a, b| (a.date, &a.country).cmp(&(b.date, &b.country)));
    rows
}

/// Write the local reports, then publish the country sales table to `stores`.
pub fn run(config: &Config, stores: &[&dyn ObjectStore]) -> Result<Outputs> {
    let outputs = aggregate(load(config)?)?;

    csv::write_file(&config.path(EXERCISE1_FILE), &outputs.exercise1)?;
    csv::write_file(&config.path(EXERCISE2_FILE), &outputs.exercise2)?;

    let country_sales = config.path(COUNTRY_SALES_FILE);
    csv::write_file(&country_sales, &outputs.exercise2)?;
    info!(path = %country_sales.display(), "reports written");

    for store in stores {
        storage::publish(*store, &country_sales)?;
    }

    Ok(outputs)
}
