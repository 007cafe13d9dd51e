//! SQLite store for normalized messages and the rolling sentiment aggregate
//!
//! Tables:
//! - `streamed_messages` - one row per normalized message (dropped on initialize)
//! - `sentiment_insights` - single aggregate row, recomputed from the full table on every insert
//!
//! Each operation opens its own connection; it is closed when the call returns,
//! on success or error.

use super::normalizer::NormalizedRecord;
use super::writer_backend::{RecordWriter, WriterError};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub average_sentiment: f64,
    pub total_messages: i64,
    pub last_updated: String,
}

#[derive(Debug, Clone)]
pub struct SqliteAggregateStore {
    db_path: PathBuf,
}

impl SqliteAggregateStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection, WriterError> {
        Ok(Connection::open(&self.db_path)?)
    }

    /// Fresh-start setup, run once per process.
    ///
    /// Drops and recreates `streamed_messages`, creates `sentiment_insights` if absent
    /// and seeds it with `(0.0, 0, now)` when it has no rows.
    pub fn initialize(&self) -> Result<(), WriterError> {
        // Ensure parent directory exists
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    WriterError::Io(std::io::Error::new(
                        e.kind(),
                        format!("Failed to create database directory {}: {}", parent.display(), e),
                    ))
                })?;
            }
        }

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        tx.execute_batch(
            "DROP TABLE IF EXISTS streamed_messages;
             CREATE TABLE IF NOT EXISTS streamed_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                message TEXT,
                author TEXT,
                timestamp TEXT,
                category TEXT,
                sentiment REAL,
                keyword_mentioned TEXT
             );
             CREATE TABLE IF NOT EXISTS sentiment_insights (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                average_sentiment REAL,
                total_messages INTEGER,
                last_updated TEXT
             );",
        )?;

        let rows: i64 = tx.query_row("SELECT COUNT(*) FROM sentiment_insights", [], |row| {
            row.get(0)
        })?;
        if rows == 0 {
            tx.execute(
                "INSERT INTO sentiment_insights (average_sentiment, total_messages, last_updated)
                 VALUES (0.0, 0, datetime('now'))",
                [],
            )?;
        }

        tx.commit()?;

        log::info!("✅ SQLite database initialized: {}", self.db_path.display());
        Ok(())
    }

    /// Insert one message and refresh the aggregate row in a single transaction.
    pub fn insert(&self, record: &NormalizedRecord) -> Result<(), WriterError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO streamed_messages
             (message, author, timestamp, category, sentiment, keyword_mentioned)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.message,
                record.author,
                record.timestamp,
                record.category,
                record.sentiment,
                record.keyword_mentioned,
            ],
        )?;

        let (total_messages, average_sentiment): (i64, Option<f64>) = tx.query_row(
            "SELECT COUNT(*), AVG(sentiment) FROM streamed_messages",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        // AVG is NULL only for an empty table
        if let Some(average_sentiment) = average_sentiment {
            tx.execute(
                "UPDATE sentiment_insights
                 SET average_sentiment = ?1, total_messages = ?2, last_updated = datetime('now')
                 WHERE id = (
                    SELECT id FROM sentiment_insights
                    ORDER BY last_updated DESC, id DESC
                    LIMIT 1
                 )",
                params![average_sentiment, total_messages],
            )?;
        }

        tx.commit()?;

        log::debug!(
            "✅ Inserted message ({} total, avg sentiment {:.4})",
            total_messages,
            average_sentiment.unwrap_or_default()
        );
        Ok(())
    }

    /// Most recently updated aggregate row, if the table has one
    pub fn aggregate(&self) -> Result<Option<AggregateRow>, WriterError> {
        let conn = self.connect()?;
        let row = conn
            .query_row(
                "SELECT average_sentiment, total_messages, last_updated
                 FROM sentiment_insights
                 ORDER BY last_updated DESC, id DESC
                 LIMIT 1",
                [],
                |row| {
                    Ok(AggregateRow {
                        average_sentiment: row.get(0)?,
                        total_messages: row.get(1)?,
                        last_updated: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn record_count(&self) -> Result<i64, WriterError> {
        let conn = self.connect()?;
        let count = conn.query_row("SELECT COUNT(*) FROM streamed_messages", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[async_trait]
impl RecordWriter for SqliteAggregateStore {
    async fn write(&mut self, record: &NormalizedRecord) -> Result<(), WriterError> {
        self.insert(record)
    }

    fn backend_type(&self) -> &'static str {
        "SQLite"
    }
}
