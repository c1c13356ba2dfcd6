//! Publishing to cloud object stores.
//!
//! Both backends talk plain REST over a blocking `reqwest` client and sign
//! their own requests; [`ObjectStore`] is the seam the pipeline depends on.

use std::{fs, path::Path};

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::Config;

pub mod azure;
pub mod s3;

use azure::AzureBlobStore;
use s3::S3Store;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{container} already exists")]
    AlreadyExists { container: String },
    #[error("{operation} failed with HTTP {status}: {code}")]
    Status {
        operation: &'static str,
        status: u16,
        code: String,
    },
    #[error("request to object store failed")]
    Request(#[from] reqwest::Error),
    #[error("could not read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid credentials: {0}")]
    Credentials(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

pub trait ObjectStore {
    /// Human readable target, used in logs.
    fn name(&self) -> &str;

    /// Create the bucket or container. Must report an existing one as
    /// [`StorageError::AlreadyExists`].
    fn create_container(&self) -> Result<()>;

    /// Store `body` under `key`, replacing any previous object.
    fn put(&self, key: &str, body: Vec<u8>) -> Result<()>;
}

/// Every store enabled in `config`; unconfigured ones are skipped with a warning.
pub fn from_config(config: &Config) -> Result<Vec<Box<dyn ObjectStore>>> {
    let mut stores: Vec<Box<dyn ObjectStore>> = Vec::new();

    match &config.s3 {
        Some(s3) => stores.push(Box::new(S3Store::new(s3.clone())?)),
        None => warn!("S3_BUCKET_NAME not set, skipping S3 upload"),
    }
    match &config.azure {
        Some(azure) => stores.push(Box::new(AzureBlobStore::new(azure.clone())?)),
        None => warn!("AZURE_CONTAINER_NAME not set, skipping Azure upload"),
    }

    Ok(stores)
}

/// Upload `path` under its base file name, creating the container first.
///
/// An already existing container is fine; any other provisioning error and
/// every upload error is returned.
#[instrument(skip(store), fields(object_store = store.name()))]
pub fn publish(store: &dyn ObjectStore, path: &Path) -> Result<()> {
    match store.create_container() {
        Ok(()) => info!("container created"),
        Err(StorageError::AlreadyExists { container }) => {
            info!(%container, "container already exists")
        }
        Err(err) => return Err(err),
    }

    let key = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());

    let body = fs::read(path).map_err(|source| StorageError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let size = body.len();
    store.put(&key, body)?;
    info!(%key, size, "uploaded");

    Ok(())
}

/// Percent-encode per RFC 3986, leaving unreserved characters and, when
/// `keep_slash` is set, path separators.
pub(crate) fn uri_encode(input: &str, keep_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());

    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b'/' if keep_slash => out.push('/'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }

    out
}
