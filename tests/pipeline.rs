// tests/pipeline.rs
use std::{cell::RefCell, collections::HashMap, fs, path::Path};

use country_sales::{
    config::{
        Config, COUNTRY_SALES_FILE, EXERCISE1_FILE, EXERCISE2_FILE, FIRST_BATCH_FILE,
        GEO_CATALOG_FILE, POPULATION_FILE, SECOND_BATCH_FILE,
    },
    error::Error,
    pipeline,
    storage::{ObjectStore, StorageError},
};
use tempfile::TempDir;

#[derive(Default)]
struct RecordingStore {
    exists: bool,
    uploads: RefCell<Vec<(String, Vec<u8>)>>,
}

impl ObjectStore for RecordingStore {
    fn name(&self) -> &str {
        "recording"
    }

    fn create_container(&self) -> Result<(), StorageError> {
        if self.exists {
            return Err(StorageError::AlreadyExists {
                container: "recording".into(),
            });
        }
        Ok(())
    }

    fn put(&self, key: &str, body: Vec<u8>) -> Result<(), StorageError> {
        self.uploads.borrow_mut().push((key.to_string(), body));
        Ok(())
    }
}

fn write(dir: &Path, file: &str, contents: &str) {
    fs::write(dir.join(file), contents).unwrap();
}

fn data_dir(batch1: &str, batch2: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        GEO_CATALOG_FILE,
        "Estado/Provincia,País,Continente\nA,México,América\nB,Perú,América\n",
    );
    write(dir.path(), POPULATION_FILE, "País,Población\nMéxico,7\nPerú,\n");
    write(dir.path(), FIRST_BATCH_FILE, batch1);
    write(dir.path(), SECOND_BATCH_FILE, batch2);
    dir
}

/// Rows keyed by `(fecha, País)`, remaining columns as raw text.
fn read_report(path: &Path) -> HashMap<(String, String), Vec<String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    assert_eq!(
        reader.headers().unwrap().iter().collect::<Vec<_>>(),
        vec!["fecha", "País", "Población", "Total_Venta", "Venta_por_hab"]
    );

    reader
        .records()
        .map(|record| {
            let record = record.unwrap();
            let fields: Vec<String> = record.iter().map(String::from).collect();
            ((fields[0].clone(), fields[1].clone()), fields[2..].to_vec())
        })
        .collect()
}

fn number(text: &str) -> f64 {
    text.parse().unwrap()
}

const HEADER: &str = "Venta,Timestamp,Ticket,Estado/Provincia\n";

#[test]
fn second_batch_resubmission_is_not_double_counted() {
    let dir = data_dir(
        &format!("{HEADER}10.0,01/01/2023 10:00,1,A\n5.0,01/01/2023 10:00,1,A\n"),
        &format!("{HEADER}5.0,01/01/2023 10:00,1,A\n20.0,01/01/2023 12:00,2,A\n"),
    );
    let config = Config::local(dir.path());
    let store = RecordingStore::default();

    pipeline::run(&config, &[&store]).unwrap();

    let key = ("2023-01-01".to_string(), "México".to_string());

    let first = read_report(&dir.path().join(EXERCISE1_FILE));
    assert_eq!(first.len(), 1);
    assert_eq!(first[&key][0], "7");
    assert_eq!(number(&first[&key][1]), 15_000_000.0);

    let second = read_report(&dir.path().join(EXERCISE2_FILE));
    assert_eq!(second.len(), 1);
    assert_eq!(number(&second[&key][1]), 35_000_000.0);
    assert_eq!(number(&second[&key][2]), 5.0);

    let published = fs::read(dir.path().join(COUNTRY_SALES_FILE)).unwrap();
    assert_eq!(published, fs::read(dir.path().join(EXERCISE2_FILE)).unwrap());

    let uploads = store.uploads.borrow();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, COUNTRY_SALES_FILE);
    assert_eq!(uploads[0].1, published);
}

#[test]
fn null_population_and_unknown_region_are_reported_empty() {
    let dir = data_dir(
        &format!("{HEADER}3,01/01/2023 10:00,1,B\n4,01/01/2023 10:00,2,Z\n"),
        HEADER,
    );
    let config = Config::local(dir.path());

    pipeline::run(&config, &[]).unwrap();

    let report = read_report(&dir.path().join(EXERCISE2_FILE));
    let peru = &report[&("2023-01-01".to_string(), "Perú".to_string())];
    assert_eq!(peru[0], "");
    assert_eq!(number(&peru[1]), 3_000_000.0);
    assert_eq!(peru[2], "");

    let unknown = &report[&("2023-01-01".to_string(), String::new())];
    assert_eq!(unknown[0], "");
    assert_eq!(number(&unknown[1]), 4_000_000.0);
}

#[test]
fn existing_container_still_gets_the_upload() {
    let dir = data_dir(&format!("{HEADER}1,01/01/2023 10:00,1,A\n"), HEADER);
    let store = RecordingStore {
        exists: true,
        ..Default::default()
    };

    pipeline::run(&Config::local(dir.path()), &[&store]).unwrap();

    assert_eq!(store.uploads.borrow().len(), 1);
}

#[test]
fn malformed_row_aborts_the_run() {
    let dir = data_dir(
        &format!("{HEADER}1,01/01/2023 10:00,1,A\n"),
        &format!("{HEADER}1,2023-01-01T10:00,2,A\n"),
    );

    let err = pipeline::run(&Config::local(dir.path()), &[]).unwrap_err();

    match err {
        Error::SchemaViolation { path, .. } => assert!(path.ends_with(SECOND_BATCH_FILE)),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join(EXERCISE1_FILE).exists());
}

#[test]
fn missing_population_file_is_reported() {
    let dir = data_dir(HEADER, HEADER);
    fs::remove_file(dir.path().join(POPULATION_FILE)).unwrap();

    let err = pipeline::run(&Config::local(dir.path()), &[]).unwrap_err();

    assert!(matches!(err, Error::FileError { .. }));
}

#[test]
fn amount_too_large_to_rescale_aborts_with_an_error() {
    let dir = data_dir(&format!("{HEADER}1e23,01/01/2023 10:00,1,A\n"), HEADER);

    let err = pipeline::run(&Config::local(dir.path()), &[]).unwrap_err();

    assert!(matches!(err, Error::AggregationError(_)));
    assert!(!dir.path().join(EXERCISE1_FILE).exists());
}
