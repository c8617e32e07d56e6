//! Trade statistics pipeline.
//!
//! Monthly COMEXT archives are fetched and extracted in parallel, each extracted
//! file is aggregated chunk by chunk into a SQLite table, and the query layer
//! derives MoM, YoY and a 12-month moving average per declarant and direction.

pub mod analysis;
pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod models;

pub use config::{IngestConfig, StoreConfig};
pub use error::{Error, Result};
pub use models::{AggregatedRow, MonthlyStat, TradeType};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global fmt subscriber. `RUST_LOG` wins over `default_filter`.
/// Calling it twice is harmless; the second call leaves the first subscriber in place.
pub fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
