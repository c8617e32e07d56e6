use super::extract::{Extractor, SevenZipExtractor};
use super::ArchiveSource;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode, Url};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Substitute `month` into a strftime-style remote path template.
pub fn render_filename(template: &str, month: NaiveDate) -> Result<String> {
    let items: Vec<Item> = StrftimeItems::new(template).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(Error::invalid_argument(format!(
            "filename template '{}' has an invalid placeholder",
            template
        )));
    }

    let mut rendered = String::new();
    write!(rendered, "{}", month.format_with_items(items.iter())).map_err(|_| {
        Error::invalid_argument(format!(
            "filename template '{}' cannot be formatted with a date",
            template
        ))
    })?;
    Ok(rendered)
}

fn validate_status(status: StatusCode) -> Result<()> {
    if status != StatusCode::OK {
        return Err(Error::RemoteFetch {
            status_code: status.as_u16(),
        });
    }
    Ok(())
}

/// Downloads monthly archives from the Eurostat bulk download listing.
pub struct ComextFetcher {
    client: Client,
    base_url: String,
    filename_template: String,
    extract_dir: PathBuf,
    extractor: Arc<dyn Extractor>,
}

impl ComextFetcher {
    pub fn new(base_url: impl Into<String>, filename_template: impl Into<String>, extract_dir: impl Into<PathBuf>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("TradeAnalyzer/1.0"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into(),
            filename_template: filename_template.into(),
            extract_dir: extract_dir.into(),
            extractor: Arc::new(SevenZipExtractor),
        }
    }

    /// Swap the archive format handler.
    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn extract_dir(&self) -> &Path {
        &self.extract_dir
    }

    /// `{base_url}?file={template formatted with month}`, form-encoded.
    pub fn build_url(&self, month: NaiveDate) -> Result<Url> {
        let file = render_filename(&self.filename_template, month)?;
        Url::parse_with_params(&self.base_url, &[("file", file.as_str())])
            .map_err(|e| Error::invalid_argument(format!("base url '{}': {}", self.base_url, e)))
    }
}

#[async_trait]
impl ArchiveSource for ComextFetcher {
    fn name(&self) -> &str {
        "comext"
    }

    async fn fetch_and_extract(&self, month: NaiveDate) -> Result<()> {
        let url = self.build_url(month)?;
        debug!(%url, "Fetching archive");

        let mut response = self.client.get(url).send().await?;
        validate_status(response.status())?;

        // Removed on drop, whichever way extraction ends.
        let mut archive = tempfile::NamedTempFile::new()?;
        let mut bytes = 0usize;
        while let Some(chunk) = response.chunk().await? {
            archive.write_all(&chunk)?;
            bytes += chunk.len();
        }
        archive.flush()?;
        debug!(month = %month, bytes, "Archive downloaded");

        let extractor = Arc::clone(&self.extractor);
        let dest = self.extract_dir.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            std::fs::create_dir_all(&dest)?;
            let extracted = extractor.extract(archive.path(), &dest);
            drop(archive);
            extracted
        })
        .await
        .map_err(|e| Error::Extraction(format!("extraction task failed: {}", e)))?
    }
}
