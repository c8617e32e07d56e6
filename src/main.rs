//! Ingestion entry point: fetch the monthly archives, load them, build the index.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use trade_analyzer_lib::config::{
    default_workers, DEFAULT_BASE_URL, DEFAULT_CHUNK_SIZE, DEFAULT_DB_PATH, DEFAULT_FILENAME_TEMPLATE,
    DEFAULT_TABLE,
};
use trade_analyzer_lib::core::orchestrator::Orchestrator;
use trade_analyzer_lib::core::timeseries::parse_date_arg;
use trade_analyzer_lib::{IngestConfig, StoreConfig};

#[derive(Parser, Debug)]
#[command(name = "trade-analyzer", version, about = "Load COMEXT monthly trade archives into SQLite")]
struct Cli {
    /// Directory archives are extracted into
    #[arg(long, env = "TRADES_EXTRACT_DIR", default_value = "extracted")]
    extract_dir: PathBuf,

    /// Bulk download endpoint
    #[arg(long, env = "TRADES_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Remote archive path, strftime placeholders allowed
    #[arg(long, env = "TRADES_FILENAME_TEMPLATE", default_value = DEFAULT_FILENAME_TEMPLATE)]
    filename_template: String,

    /// SQLite database file
    #[arg(long, env = "TRADES_DB_NAME", default_value = DEFAULT_DB_PATH)]
    db_name: PathBuf,

    #[arg(long, env = "TRADES_TABLE_NAME", default_value = DEFAULT_TABLE)]
    table_name: String,

    /// First month to fetch (YYYY-MM-DD or YYYY-MM)
    #[arg(long, env = "TRADES_START_DATE", default_value = "2013-01-01", value_parser = parse_date_arg)]
    start_date: NaiveDate,

    /// Month after the last one to fetch
    #[arg(long, env = "TRADES_END_DATE", default_value = "2018-05-01", value_parser = parse_date_arg)]
    end_date: NaiveDate,

    /// Delete the extracted files once they are loaded
    #[arg(long, env = "TRADES_CLEAR_DIR")]
    clear_dir: bool,

    /// Rows per chunk when reading extracted files
    #[arg(long, env = "TRADES_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Concurrent downloads (defaults to the number of CPUs)
    #[arg(long, env = "TRADES_WORKERS")]
    workers: Option<usize>,

    /// Only load what is already in the extract directory
    #[arg(long, env = "TRADES_SKIP_FETCH")]
    skip_fetch: bool,
}

impl Cli {
    fn into_config(self) -> IngestConfig {
        IngestConfig {
            extract_dir: self.extract_dir,
            base_url: self.base_url,
            filename_template: self.filename_template,
            store: StoreConfig {
                db_path: self.db_name,
                table_name: self.table_name,
            },
            start_date: self.start_date,
            end_date: self.end_date,
            clear_dir: self.clear_dir,
            chunk_size: self.chunk_size,
            workers: self.workers.unwrap_or_else(default_workers),
            skip_fetch: self.skip_fetch,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    trade_analyzer_lib::init_tracing("trade_analyzer=info,trade_analyzer_lib=info,sqlx=warn");

    let config = Cli::parse().into_config();
    info!(db = %config.store.db_path.display(), table = %config.store.table_name, "Ingestion configured");

    let report = Orchestrator::from_config(config)
        .run()
        .await
        .context("ingestion run failed")?;

    if !report.months_failed.is_empty() {
        let months: Vec<String> = report.months_failed.iter().map(|m| m.format("%Y-%m").to_string()).collect();
        info!(months = %months.join(", "), "Some months could not be fetched");
    }
    println!(
        "Loaded {} rows from {} files ({} of {} months fetched)",
        report.rows_loaded, report.files_processed, report.months_fetched, report.months_requested
    );
    Ok(())
}
