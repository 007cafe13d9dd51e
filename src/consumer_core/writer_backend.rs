//! Writer backend trait for normalized records
//!
//! Both sinks (SQLite aggregate store, CSV log) implement `RecordWriter`.

use super::normalizer::NormalizedRecord;
use async_trait::async_trait;

#[derive(Debug)]
pub enum WriterError {
    Io(std::io::Error),
    Database(String),
    Csv(String),
}

impl From<std::io::Error> for WriterError {
    fn from(err: std::io::Error) -> Self {
        WriterError::Io(err)
    }
}

impl From<rusqlite::Error> for WriterError {
    fn from(err: rusqlite::Error) -> Self {
        WriterError::Database(err.to_string())
    }
}

impl From<csv::Error> for WriterError {
    fn from(err: csv::Error) -> Self {
        WriterError::Csv(err.to_string())
    }
}

impl std::fmt::Display for WriterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriterError::Io(e) => write!(f, "IO error: {}", e),
            WriterError::Database(e) => write!(f, "Database error: {}", e),
            WriterError::Csv(e) => write!(f, "CSV error: {}", e),
        }
    }
}

impl std::error::Error for WriterError {}

#[async_trait]
pub trait RecordWriter: Send {
    /// Persist a single normalized record
    async fn write(&mut self, record: &NormalizedRecord) -> Result<(), WriterError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}
