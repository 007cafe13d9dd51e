//! CSV writer for normalized messages - append-only log with a self-initializing header

use super::normalizer::NormalizedRecord;
use super::writer_backend::{RecordWriter, WriterError};
use async_trait::async_trait;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

pub const CSV_HEADER: [&str; 6] = [
    "message",
    "author",
    "timestamp",
    "category",
    "sentiment",
    "keyword_mentioned",
];

/// Appends one row per record. No file handle is held between calls.
#[derive(Debug, Clone)]
pub struct CsvRecordWriter {
    path: PathBuf,
}

impl CsvRecordWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &NormalizedRecord) -> Result<(), WriterError> {
        // Checked before opening, since opening creates the file
        let file_exists = self.path.exists();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::Writer::from_writer(file);
        if !file_exists {
            writer.write_record(CSV_HEADER)?;
        }
        writer.write_record(record.csv_row())?;
        writer.flush()?;

        Ok(())
    }
}

#[async_trait]
impl RecordWriter for CsvRecordWriter {
    async fn write(&mut self, record: &NormalizedRecord) -> Result<(), WriterError> {
        self.append(record)
    }

    fn backend_type(&self) -> &'static str {
        "CSV"
    }
}
