use async_trait::async_trait;
use chrono::NaiveDate;
use crate::error::Result;

pub mod comext;
pub mod extract;

pub use comext::ComextFetcher;
pub use extract::{Extractor, SevenZipExtractor};

/// A remote source of monthly archive files.
///
/// One call fetches the archive for `month` and leaves its extracted
/// contents on disk. Implementations do not retry.
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch_and_extract(&self, month: NaiveDate) -> Result<()>;
}
