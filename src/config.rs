//! Configuration values threaded through the store, fetcher and orchestrator.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str =
    "https://ec.europa.eu/eurostat/estat-navtree-portlet-prod/BulkDownloadListing";
pub const DEFAULT_FILENAME_TEMPLATE: &str = "comext/COMEXT_DATA/PRODUCTS/full%Y%m.7z";
pub const DEFAULT_DB_PATH: &str = "eurostat.db";
pub const DEFAULT_TABLE: &str = "trades";
pub const DEFAULT_CHUNK_SIZE: usize = 1_000_000;

/// Where the trade table lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub table_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            table_name: DEFAULT_TABLE.to_string(),
        }
    }
}

/// Everything one ingestion run needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Directory archives are extracted into and read back from.
    pub extract_dir: PathBuf,
    /// Bulk download endpoint.
    pub base_url: String,
    /// Remote path with strftime placeholders, e.g. `full%Y%m.7z`.
    pub filename_template: String,
    pub store: StoreConfig,
    pub start_date: NaiveDate,
    /// End of the range; the month of `end_date` itself is not fetched.
    pub end_date: NaiveDate,
    /// Remove the processed files from `extract_dir` after loading.
    pub clear_dir: bool,
    /// Rows per chunk when reading extracted files.
    pub chunk_size: usize,
    /// Concurrent downloads.
    pub workers: usize,
    /// Ingest what is already in `extract_dir` without downloading.
    pub skip_fetch: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            extract_dir: PathBuf::from("extracted"),
            base_url: DEFAULT_BASE_URL.to_string(),
            filename_template: DEFAULT_FILENAME_TEMPLATE.to_string(),
            store: StoreConfig::default(),
            start_date: NaiveDate::from_ymd_opt(2013, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2018, 5, 1).unwrap_or_default(),
            clear_dir: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: default_workers(),
            skip_fetch: false,
        }
    }
}

impl IngestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::invalid_argument("chunk_size must be at least 1"));
        }
        if self.workers == 0 {
            return Err(Error::invalid_argument("workers must be at least 1"));
        }
        if self.base_url.trim().is_empty() {
            return Err(Error::config("base_url is empty"));
        }
        reqwest::Url::parse(&self.base_url)
            .map_err(|e| Error::config(format!("base_url '{}' is not a valid URL: {}", self.base_url, e)))?;
        if self.extract_dir.is_file() {
            return Err(Error::config(format!(
                "extract_dir {} is a file, not a directory",
                self.extract_dir.display()
            )));
        }
        crate::db::validate_identifier(&self.store.table_name)?;
        // Renders the template once so a bad placeholder fails before any download.
        crate::fetcher::comext::render_filename(&self.filename_template, self.start_date)?;
        Ok(())
    }
}

/// Number of available processing units, 1 if it cannot be determined.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = IngestConfig::default();
        assert_eq!(config.store.table_name, "trades");
        assert_eq!(config.chunk_size, 1_000_000);
        assert!(config.workers >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let config = IngestConfig {
            chunk_size: 0,
            ..IngestConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_validate_rejects_bad_table_name() {
        let mut config = IngestConfig::default();
        config.store.table_name = "trades; DROP TABLE trades".to_string();
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_validate_rejects_file_as_extract_dir() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = IngestConfig {
            extract_dir: file.path().to_path_buf(),
            ..IngestConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_unparseable_base_url() {
        let config = IngestConfig {
            base_url: "not a url".to_string(),
            ..IngestConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
