use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
};

use csv::{Reader, Result, Writer};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Error;

/// Parse every row of a headed CSV document into `T`.
///
/// The schema is strict: the first row that does not deserialize aborts the
/// whole read, there is no best-effort skipping.
pub fn read<T: DeserializeOwned>(reader: impl Read) -> Result<Vec<T>> {
    Reader::from_reader(reader).into_deserialize().collect()
}

pub fn write<T: Serialize>(rows: impl IntoIterator<Item = T>, writer: impl Write) -> Result<()> {
    let mut writer = Writer::from_writer(writer);

    for row in rows {
        writer.serialize(row)?;
    }

    writer.flush()?;
    Ok(())
}

/// [`read`] from a file, tagging failures with the file path.
pub fn read_file<T: DeserializeOwned>(path: &Path) -> crate::error::Result<Vec<T>> {
    let file = File::open(path).map_err(|source| Error::FileError {
        path: path.to_path_buf(),
        source,
    })?;

    read(file).map_err(|source| Error::SchemaViolation {
        path: path.to_path_buf(),
        source,
    })
}

/// [`write`] to a file, truncating whatever was there before.
pub fn write_file<T: Serialize>(
    path: &Path,
    rows: impl IntoIterator<Item = T>,
) -> crate::error::Result<()> {
    let file = File::create(path).map_err(|source| Error::FileError {
        path: path.to_path_buf(),
        source,
    })?;

    write(rows, file).map_err(|source| Error::WriteError {
        path: path.to_path_buf(),
        source,
    })
}
