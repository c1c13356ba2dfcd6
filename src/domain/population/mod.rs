use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct CountryPopulation {
    #[serde(rename = "País")]
    pub country: String,
    #[serde(rename = "Población", deserialize_with = "deserialize_population")]
    pub population: Option<u64>,
}

/// Whole numbers, also in the `126014024.0` form that float-typed writers use
/// for an integer column holding nulls.
fn deserialize_population<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let text = raw.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let whole = match text.split_once('.') {
        Some((whole, fraction)) if fraction.bytes().all(|digit| digit == b'0') => whole,
        Some(_) => {
            return Err(serde::de::Error::custom(format!(
                "population {raw:?} is not a whole number"
            )))
        }
        None => text,
    };

    whole
        .parse()
        .map(Some)
        .map_err(|err| serde::de::Error::custom(format!("invalid population {raw:?}: {err}")))
}

/// Country name to population. Names are matched exactly, without any case or
/// accent folding, so a spelling difference yields no population.
#[derive(Debug, Default)]
pub struct PopulationTable {
    by_country: HashMap<String, Option<u64>>,
}

impl PopulationTable {
    pub fn new(rows: impl IntoIterator<Item = CountryPopulation>) -> Self {
        let by_country = rows
            .into_iter()
            .map(|row| (row.country, row.population))
            .collect();

        Self { by_country }
    }

    pub fn population_of(&self, country: Option<&str>) -> Option<u64> {
        country.and_then(|country| self.by_country.get(country).copied().flatten())
    }

    pub fn len(&self) -> usize {
        self.by_country.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_country.is_empty()
    }
}
