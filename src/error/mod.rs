use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not open {}", path.display())]
    FileError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("row in {} does not match the expected schema", path.display())]
    SchemaViolation {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("could not write CSV rows to {}", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error(transparent)]
    AggregationError(#[from] crate::domain::error::Error),
    #[error(transparent)]
    ScrapeError(#[from] crate::scrape::ScrapeError),
    #[error(transparent)]
    StorageError(#[from] crate::storage::StorageError),
}

pub type Result<T> = std::result::Result<T, Error>;
