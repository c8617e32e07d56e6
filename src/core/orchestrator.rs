use crate::config::IngestConfig;
use crate::core::aggregator::aggregate;
use crate::core::timeseries::month_range;
use crate::db::{read_chunked, TradeStore};
use crate::error::{Error, Result};
use crate::fetcher::{ArchiveSource, ComextFetcher};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Composite index built after every run, in this column order.
pub const INDEX_COLUMNS: [&str; 4] = ["DECLARANT_ISO", "TRADE_TYPE", "VALUE_IN_EUROS", "PERIOD"];

pub fn index_name(table: &str) -> String {
    format!("{}_declarant_type_value_period_idx", table)
}

/// Outcome of the fetch phase, months in ascending order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchSummary {
    pub fetched: Vec<NaiveDate>,
    pub failed: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub months_requested: usize,
    pub months_fetched: usize,
    pub months_failed: Vec<NaiveDate>,
    pub files_processed: usize,
    pub chunks_loaded: usize,
    pub rows_loaded: u64,
    pub files_removed: usize,
}

/// Drives one batch run: fetch every month, load every extracted file, index, clean up.
pub struct Orchestrator {
    config: IngestConfig,
    source: Arc<dyn ArchiveSource>,
}

impl Orchestrator {
    pub fn new(config: IngestConfig, source: Arc<dyn ArchiveSource>) -> Self {
        Self { config, source }
    }

    /// Orchestrator backed by the HTTP archive fetcher described by `config`.
    pub fn from_config(config: IngestConfig) -> Self {
        let fetcher = ComextFetcher::new(
            config.base_url.clone(),
            config.filename_template.clone(),
            config.extract_dir.clone(),
        );
        Self::new(config, Arc::new(fetcher))
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<IngestReport> {
        self.config.validate()?;
        let months = month_range(self.config.start_date, self.config.end_date);
        info!(
            source = self.source.name(),
            months = months.len(),
            workers = self.config.workers,
            start = %self.config.start_date,
            end = %self.config.end_date,
            "Starting ingestion run"
        );

        // 1. Fetch phase. Failed months are skipped, never fatal.
        let fetch = if self.config.skip_fetch {
            info!("Fetch phase skipped, ingesting existing files only");
            FetchSummary::default()
        } else {
            self.fetch_all(&months).await
        };

        // 2. Load phase, strictly sequential on one connection.
        std::fs::create_dir_all(&self.config.extract_dir)?;
        let files = list_files(&self.config.extract_dir)?;
        info!(files = files.len(), dir = %self.config.extract_dir.display(), "Loading extracted files");

        let mut store = TradeStore::open(&self.config.store);
        let loaded = self.load_all(&mut store, &files).await;
        store.close().await;
        let (chunks_loaded, rows_loaded) = loaded?;

        // 3. Cleanup of exactly the files this run enumerated.
        let files_removed = if self.config.clear_dir {
            remove_files(&files)
        } else {
            0
        };

        let report = IngestReport {
            months_requested: months.len(),
            months_fetched: fetch.fetched.len(),
            months_failed: fetch.failed,
            files_processed: files.len(),
            chunks_loaded,
            rows_loaded,
            files_removed,
        };
        info!(
            fetched = report.months_fetched,
            failed = report.months_failed.len(),
            files = report.files_processed,
            chunks = report.chunks_loaded,
            rows = report.rows_loaded,
            removed = report.files_removed,
            "Ingestion run complete"
        );
        Ok(report)
    }

    /// Fetch all months on a bounded pool and wait for every task.
    pub async fn fetch_all(&self, months: &[NaiveDate]) -> FetchSummary {
        let permits = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let mut tasks = JoinSet::new();

        for &month in months {
            let source = Arc::clone(&self.source);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                (month, source.fetch_and_extract(month).await)
            });
        }

        let mut summary = FetchSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((month, Ok(()))) => {
                    debug!(month = %month, "Archive extracted");
                    summary.fetched.push(month);
                }
                Ok((month, Err(e))) => {
                    warn!(month = %month, status = ?e.status_code(), error = %e, "Fetch failed, skipping month");
                    summary.failed.push(month);
                }
                Err(e) => warn!(error = %e, "Fetch task aborted"),
            }
        }

        // Months whose task panicked never reported back.
        let reported: HashSet<NaiveDate> = summary.fetched.iter().chain(&summary.failed).copied().collect();
        summary
            .failed
            .extend(months.iter().filter(|m| !reported.contains(*m)).copied());

        summary.fetched.sort();
        summary.failed.sort();
        info!(
            fetched = summary.fetched.len(),
            failed = summary.failed.len(),
            "Fetch phase finished"
        );
        summary
    }

    async fn load_all(&self, store: &mut TradeStore, files: &[PathBuf]) -> Result<(usize, u64)> {
        let table = self.config.store.table_name.as_str();
        let mut chunks = 0;
        let mut rows = 0;

        for (i, file) in files.iter().enumerate() {
            let (file_chunks, file_rows) = self
                .load_file(store, file)
                .await
                .map_err(|e| Error::Ingest {
                    file: file.clone(),
                    source: Box::new(e),
                })?;
            info!(
                progress = %format!("{}/{}", i + 1, files.len()),
                file = %file.display(),
                chunks = file_chunks,
                rows = file_rows,
                "Loaded file"
            );
            chunks += file_chunks;
            rows += file_rows;
        }

        if store.table_exists(table).await? {
            store.create_index(table, &index_name(table), &INDEX_COLUMNS).await?;
        } else {
            warn!(table, "Nothing loaded yet, skipping index creation");
        }

        Ok((chunks, rows))
    }

    async fn load_file(&self, store: &mut TradeStore, file: &Path) -> Result<(usize, u64)> {
        let table = self.config.store.table_name.as_str();
        let mut chunks = 0;
        let mut rows = 0;

        for chunk in read_chunked(file, self.config.chunk_size)? {
            let aggregated = aggregate(&chunk?)?;
            rows += store.load(table, &aggregated).await?;
            chunks += 1;
        }

        Ok((chunks, rows))
    }
}

/// Regular files directly under `dir`, sorted by name.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Best-effort removal; returns how many files were deleted.
fn remove_files(files: &[PathBuf]) -> usize {
    let mut removed = 0;
    for file in files {
        match std::fs::remove_file(file) {
            Ok(()) => removed += 1,
            Err(e) => warn!(file = %file.display(), error = %e, "Could not remove extracted file"),
        }
    }
    removed
}
