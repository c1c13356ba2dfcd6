use std::{collections::HashMap, hash::Hash};

use chrono::NaiveDate;
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::Serialize;

use super::{
    error::{Error, Result},
    geography::GeoCatalog,
    population::PopulationTable,
    transaction::{DedupKey, Transaction},
};

/// Source amounts are expressed in millions of currency units.
const SALE_SCALE: i64 = 1_000_000;

/// Summed sale amount per deduplicated transaction.
pub type TicketTotals = HashMap<DedupKey, Decimal>;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct EnrichedTicket {
    pub key: DedupKey,
    pub total: Decimal,
    pub country: Option<String>,
    pub continent: Option<String>,
}

#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct CountryDay {
    pub date: NaiveDate,
    pub country: Option<String>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CountryDayTotal {
    pub day: CountryDay,
    pub total: Decimal,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PopulatedTotal {
    pub day: CountryDay,
    pub population: Option<u64>,
    pub total: Decimal,
}

/// Output row, one per country and day.
#[derive(Debug, Serialize, PartialEq, Eq, Clone)]
pub struct CountrySales {
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
    #[serde(rename = "País")]
    pub country: Option<String>,
    #[serde(rename = "Población")]
    pub population: Option<u64>,
    #[serde(rename = "Total_Venta")]
    pub total_sale: Decimal,
    #[serde(rename = "Venta_por_hab")]
    pub sale_per_capita: Option<Decimal>,
}

/// Sum the amounts of every key; `overflow` names the group that left the
/// decimal range.
fn sum_by_key<K: Hash + Eq>(
    pairs: impl IntoIterator<Item = (K, Decimal)>,
    overflow: impl Fn(K) -> Error,
) -> Result<HashMap<K, Decimal>> {
    pairs
        .into_iter()
        .into_grouping_map()
        .fold(Some(Decimal::ZERO), |total, _, amount| {
            total.and_then(|total| total.checked_add(amount))
        })
        .into_iter()
        .map(|(key, total)| match total {
            Some(total) => Ok((key, total)),
            None => Err(overflow(key)),
        })
        .collect()
}

/// Collapse duplicate submissions of the same sale by summing their amounts.
pub fn dedupe(txns: impl IntoIterator<Item = Transaction>) -> Result<TicketTotals> {
    sum_by_key(
        txns.into_iter().map(|tx| (tx.dedup_key(), tx.amount)),
        |key| Error::TicketTotalOverflow { ticket: key.ticket },
    )
}

fn day_overflow(day: CountryDay) -> Error {
    Error::CountryDayOverflow {
        date: day.date,
        country: day.country,
    }
}

/// Drop every transaction whose key was already ingested.
pub fn exclude_seen(
    txns: impl IntoIterator<Item = Transaction>,
    seen: &TicketTotals,
) -> Vec<Transaction> {
    txns.into_iter()
        .filter(|tx| !seen.contains_key(&tx.dedup_key()))
        .collect()
}

/// Left join on the region name. Unknown regions keep `None` country and continent.
pub fn enrich(totals: TicketTotals, geography: &GeoCatalog) -> Vec<EnrichedTicket> {
    totals
        .into_iter()
        .map(|(key, total)| {
            let region = geography.locate(&key.region);
            EnrichedTicket {
                country: region.map(|r| r.country.clone()),
                continent: region.map(|r| r.continent.clone()),
                key,
                total,
            }
        })
        .collect()
}

pub fn by_country_day(
    enriched: impl IntoIterator<Item = EnrichedTicket>,
) -> Result<Vec<CountryDayTotal>> {
    let totals = sum_by_key(
        enriched.into_iter().map(|ticket| {
            let day = CountryDay {
                date: ticket.key.date(),
                country: ticket.country,
            };
            (day, ticket.total)
        }),
        day_overflow,
    )?;

    Ok(totals
        .into_iter()
        .map(|(day, total)| CountryDayTotal { day, total })
        .collect())
}

/// Left join on the country name.
pub fn with_population(
    totals: impl IntoIterator<Item = CountryDayTotal>,
    population: &PopulationTable,
) -> Vec<PopulatedTotal> {
    totals
        .into_iter()
        .map(|CountryDayTotal { day, total }| PopulatedTotal {
            population: population.population_of(day.country.as_deref()),
            day,
            total,
        })
        .collect()
}

/// Concatenate both exercises, attach population and sum again per
/// `(date, country, population)` so a pair present on both sides yields one row.
pub fn merge(
    first: impl IntoIterator<Item = CountryDayTotal>,
    second: impl IntoIterator<Item = CountryDayTotal>,
    population: &PopulationTable,
) -> Result<Vec<PopulatedTotal>> {
    let totals = sum_by_key(
        with_population(first.into_iter().chain(second), population)
            .into_iter()
            .map(|row| ((row.day, row.population), row.total)),
        |(day, _)| day_overflow(day),
    )?;

    Ok(totals
        .into_iter()
        .map(|((day, population), total)| PopulatedTotal {
            day,
            population,
            total,
        })
        .collect())
}

/// Per-capita figure is computed on the unscaled total; the reported total is
/// then rescaled to currency units.
pub fn country_sales(rows: impl IntoIterator<Item = PopulatedTotal>) -> Result<Vec<CountrySales>> {
    rows.into_iter()
        .map(|row| {
            let Some(total_sale) = row.total.checked_mul(Decimal::from(SALE_SCALE)) else {
                return Err(day_overflow(row.day));
            };

            Ok(CountrySales {
                date: row.day.date,
                sale_per_capita: per_capita(row.total, row.population),
                total_sale,
                country: row.day.country,
                population: row.population,
            })
        })
        .collect()
}

/// `None` for a missing or zero population, never an infinite value.
pub fn per_capita(total: Decimal, population: Option<u64>) -> Option<Decimal> {
    population.and_then(|people| total.checked_div(Decimal::from(people)))
}
