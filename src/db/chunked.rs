//! Bounded-memory reading of extracted archive files.

use crate::error::{Error, Result};
use crate::models::RawTradeRow;
use csv::{Reader, ReaderBuilder, StringRecord};
use std::fs::File;
use std::path::Path;

/// Forward-only sequence of row chunks over one delimited file.
///
/// Yields at most `chunk_size` rows per item. Stops for good after the
/// last row or after the first error.
pub struct ChunkedReader {
    reader: Reader<File>,
    headers: StringRecord,
    chunk_size: usize,
    finished: bool,
}

/// Open `path` for chunked reading.
pub fn read_chunked(path: &Path, chunk_size: usize) -> Result<ChunkedReader> {
    if chunk_size == 0 {
        return Err(Error::invalid_argument("chunk_size must be at least 1"));
    }

    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);
    let headers = reader.headers()?.clone();

    Ok(ChunkedReader {
        reader,
        headers,
        chunk_size,
        finished: false,
    })
}

impl ChunkedReader {
    fn next_chunk(&mut self) -> Result<Vec<RawTradeRow>> {
        let mut chunk = Vec::with_capacity(self.chunk_size.min(64 * 1024));
        let mut record = StringRecord::new();

        while chunk.len() < self.chunk_size {
            if !self.reader.read_record(&mut record)? {
                self.finished = true;
                break;
            }
            chunk.push(record.deserialize(Some(&self.headers))?);
        }

        Ok(chunk)
    }
}

impl Iterator for ChunkedReader {
    type Item = Result<Vec<RawTradeRow>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.next_chunk() {
            Ok(chunk) if chunk.is_empty() => None,
            Ok(chunk) => Some(Ok(chunk)),
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
