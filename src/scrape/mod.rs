//! Population figures scraped from an encyclopedia table.

use std::{
    collections::{BTreeMap, HashSet},
    sync::LazyLock,
    time::Duration,
};

use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::{
    config::{Config, GEO_CATALOG_FILE, POPULATION_FILE},
    domain::{
        geography::{GeoCatalog, Region},
        population::CountryPopulation,
    },
};

pub mod clean;

use clean::{clean_country_name, parse_population_text, title_case};

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Rows with fewer cells are headers or separators.
const MIN_CELLS: usize = 4;
const COUNTRY_CELL: usize = 1;
const POPULATION_CELL: usize = 3;

static TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.wikitable").expect("Invalid table selector"));
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("Invalid row selector"));
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("Invalid cell selector"));

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("could not build the HTTP client")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("received HTTP {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("no table found on the page")]
    MissingTable,
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

pub fn client() -> Result<Client> {
    Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(ScrapeError::Client)
}

/// GET `url` once. A non-success status is an error, there are no retries.
#[instrument(skip(client))]
pub fn fetch(client: &Client, url: &str) -> Result<String> {
    let request_error = |source| ScrapeError::Request {
        url: url.to_string(),
        source,
    };

    let response = client.get(url).send().map_err(request_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(ScrapeError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().map_err(request_error)?;
    debug!(bytes = body.len(), "page fetched");
    Ok(body)
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text().collect()
}

/// Populations of the `known` countries found in the first `wikitable`.
///
/// Matching is case-insensitive on the cleaned name; results are keyed by the
/// title-cased name and a later row for the same country replaces an earlier one.
pub fn parse_population<'a>(
    html: &str,
    known: impl IntoIterator<Item = &'a str>,
) -> Result<BTreeMap<String, Option<u64>>> {
    let known: HashSet<String> = known
        .into_iter()
        .map(|country| country.trim().to_lowercase())
        .collect();

    let document = Html::parse_document(html);
    let table = document.select(&TABLE).next().ok_or(ScrapeError::MissingTable)?;

    let mut populations = BTreeMap::new();
    for row in table.select(&ROW) {
        let cells: Vec<_> = row.select(&CELL).collect();
        if cells.len() < MIN_CELLS {
            continue;
        }

        let country = clean_country_name(&cell_text(&cells[COUNTRY_CELL]).trim().to_lowercase());
        let population = parse_population_text(&cell_text(&cells[POPULATION_CELL]));

        if known.contains(&country) {
            debug!(%country, ?population, "matched country");
            populations.insert(title_case(&country), population);
        }
    }

    Ok(populations)
}

/// Fetch `url` and extract the population of every `known` country.
pub fn scrape_population<'a>(
    client: &Client,
    url: &str,
    known: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<CountryPopulation>> {
    let html = fetch(client, url)?;
    let populations = parse_population(&html, known)?;
    debug!(countries = populations.len(), "population table scraped");

    Ok(populations
        .into_iter()
        .map(|(country, population)| CountryPopulation {
            country,
            population,
        })
        .collect())
}

/// Scrape the countries of the region catalog and write the population table
/// the sales report reads.
pub fn run(config: &Config) -> crate::error::Result<Vec<CountryPopulation>> {
    let catalog = GeoCatalog::new(crate::csv::read_file::<Region>(&config.path(GEO_CATALOG_FILE))?);

    let client = client()?;
    let populations = scrape_population(&client, &config.population_url, catalog.countries())?;

    let path = config.path(POPULATION_FILE);
    crate::csv::write_file(&path, &populations)?;
    info!(path = %path.display(), countries = populations.len(), "population table written");

    Ok(populations)
}
