use std::collections::{hash_map::Entry, HashMap};

use itertools::Itertools;
use serde::Deserialize;
use tracing::warn;

/// One row of the region catalog.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
pub struct Region {
    #[serde(rename = "Estado/Provincia")]
    pub name: String,
    #[serde(rename = "País")]
    pub country: String,
    #[serde(rename = "Continente")]
    pub continent: String,
}

/// Region name to country/continent lookup. Many regions map to one country.
#[derive(Debug, Default)]
pub struct GeoCatalog {
    regions: Vec<Region>,
    by_name: HashMap<String, usize>,
}

impl GeoCatalog {
    pub fn new(regions: Vec<Region>) -> Self {
        let mut by_name = HashMap::with_capacity(regions.len());

        for (idx, region) in regions.iter().enumerate() {
            match by_name.entry(region.name.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(idx);
                }
                Entry::Occupied(_) => {
                    warn!(region = %region.name, "region listed twice in catalog, keeping first row");
                }
            }
        }

        Self { regions, by_name }
    }

    /// Exact, case-sensitive match on the region name.
    pub fn locate(&self, region: &str) -> Option<&Region> {
        self.by_name.get(region).map(|&idx| &self.regions[idx])
    }

    /// Distinct country names, in the order they first appear.
    pub fn countries(&self) -> Vec<&str> {
        self.regions
            .iter()
            .map(|region| region.country.as_str())
            .unique()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
