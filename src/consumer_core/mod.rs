//! Consumer Core - Live Data File Tailing Engine
//!
//! This module tails a growing newline-delimited JSON file, normalizes each message,
//! and records it in two sinks: a SQLite table with a rolling sentiment aggregate and
//! an append-only CSV log.
//!
//! # Architecture
//!
//! ```text
//! live data file (JSONL) → TailReader (byte offset, complete lines only)
//!     ↓
//! RawRecord::from_jsonl → normalize() → NormalizedRecord
//!     ↓
//! SqliteAggregateStore (insert + aggregate refresh)   ← authoritative, written first
//!     ↓
//! CsvRecordWriter (append, header on first write)     ← best-effort log
//! ```
//!
//! `FileConsumer` owns the read offset and drives one pass at a time; the offset only
//! moves forward once a whole pass has been dispatched.

pub mod config;
pub mod csv_writer;
pub mod normalizer;
pub mod reader;
pub mod runner;
pub mod sqlite_store;
pub mod writer_backend;

pub use config::{ConfigError, ConsumerConfig, ConsumerSettings};
pub use csv_writer::{CsvRecordWriter, CSV_HEADER};
pub use normalizer::{normalize, DecodeError, NormalizeError, NormalizedRecord, RawRecord};
pub use reader::{ReadError, TailBatch, TailReader, DEFAULT_MAX_LINES};
pub use runner::{ConsumerState, FileConsumer, PassOutcome, PassStats};
pub use sqlite_store::{AggregateRow, SqliteAggregateStore};
pub use writer_backend::{RecordWriter, WriterError};
