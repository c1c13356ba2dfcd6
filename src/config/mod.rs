//! Run configuration, read once from the environment at start-up and passed
//! explicitly to every stage.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::storage::{azure::AzureConfig, s3::S3Config};

pub const DEFAULT_POPULATION_URL: &str =
    "https://es.wikipedia.org/wiki/Anexo:Países_y_territorios_dependientes_por_densidad_de_población";

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_AWS_REGION: &str = "us-west-1";

pub const GEO_CATALOG_FILE: &str = "Catálogo de relación geográfica.csv";
pub const FIRST_BATCH_FILE: &str = "Primera ingesta.csv";
pub const SECOND_BATCH_FILE: &str = "Segunda ingesta.csv";
pub const POPULATION_FILE: &str = "country_population.csv";
pub const EXERCISE1_FILE: &str = "Ejercicio_1.csv";
pub const EXERCISE2_FILE: &str = "Ejercicio_2.csv";
pub const COUNTRY_SALES_FILE: &str = "ventas_por_pais.csv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be set when {enabled_by} is set")]
    Missing {
        var: &'static str,
        enabled_by: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub population_url: String,
    /// `None` when `S3_BUCKET_NAME` is unset.
    pub s3: Option<S3Config>,
    /// `None` when `AZURE_CONTAINER_NAME` is unset.
    pub azure: Option<AzureConfig>,
}

impl Config {
    /// Read the process environment, after loading a `.env` file if present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let require = |var: &'static str, enabled_by: &'static str| {
            get(var).ok_or(ConfigError::Missing { var, enabled_by })
        };

        let s3 = match get("S3_BUCKET_NAME") {
            Some(bucket) => Some(S3Config {
                bucket,
                region: get("AWS_REGION").unwrap_or_else(|| DEFAULT_AWS_REGION.to_string()),
                access_key_id: require("AWS_ACCESS_KEY_ID", "S3_BUCKET_NAME")?,
                secret_access_key: require("AWS_SECRET_ACCESS_KEY", "S3_BUCKET_NAME")?,
                session_token: get("AWS_SESSION_TOKEN"),
                endpoint: get("S3_ENDPOINT"),
            }),
            None => None,
        };

        let azure = match get("AZURE_CONTAINER_NAME") {
            Some(container) => Some(AzureConfig {
                container,
                account_name: require("AZURE_ACCOUNT_NAME", "AZURE_CONTAINER_NAME")?,
                account_key: require("AZURE_ACCOUNT_KEY", "AZURE_CONTAINER_NAME")?,
            }),
            None => None,
        };

        Ok(Self {
            data_dir: get("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            population_url: get("POPULATION_URL")
                .unwrap_or_else(|| DEFAULT_POPULATION_URL.to_string()),
            s3,
            azure,
        })
    }

    /// Local-only configuration rooted at `data_dir`.
    pub fn local(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            population_url: DEFAULT_POPULATION_URL.to_string(),
            s3: None,
            azure: None,
        }
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }
}
