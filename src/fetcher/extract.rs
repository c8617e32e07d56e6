use crate::error::{Error, Result};
use std::path::Path;

/// Unpacks a downloaded archive into a directory.
pub trait Extractor: Send + Sync {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;
}

/// 7z archives, as published by the Comext bulk download service.
#[derive(Debug, Default, Clone, Copy)]
pub struct SevenZipExtractor;

impl Extractor for SevenZipExtractor {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        std::fs::create_dir_all(dest)?;
        sevenz_rust::decompress_file(archive, dest)
            .map_err(|e| Error::Extraction(format!("{}: {}", archive.display(), e)))
    }
}
