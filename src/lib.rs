pub mod config;
pub mod csv;
pub mod domain;
pub mod error;
pub mod pipeline;
pub mod scrape;
pub mod storage;

use tracing_subscriber::EnvFilter;

/// Log to stderr, filtered by `RUST_LOG` (default `country_sales=info`).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "country_sales=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
