//! Error types for the trade statistics pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The archive endpoint answered with something other than 200.
    #[error("Archive endpoint returned {status_code} instead of expected 200")]
    RemoteFetch { status_code: u16 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A row in a chunk could not be normalised. `row` is 1-based within the chunk.
    #[error("Malformed row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("Failed to ingest {}: {source}", file.display())]
    Ingest {
        file: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// Stored data that cannot be read back (e.g. an unparseable month label).
    #[error("Data error: {0}")]
    Data(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Status code carried by a `RemoteFetch` error, if this is one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::RemoteFetch { status_code } => Some(*status_code),
            _ => None,
        }
    }
}
