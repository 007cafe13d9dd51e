use crate::consumer_core::{
    config::ConsumerSettings,
    csv_writer::CsvRecordWriter,
    normalizer::{normalize, RawRecord},
    reader::{ReadError, TailReader},
    sqlite_store::SqliteAggregateStore,
    writer_backend::RecordWriter,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Polling,
    Shutdown,
}

/// Counters for one pass over newly available lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Non-empty lines seen
    pub lines: usize,
    pub written: usize,
    pub undecodable: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// At least one non-empty line was read, or the read cap left more lines
    /// waiting; the next pass starts immediately
    Consumed(PassStats),
    NoNewData,
    SourceMissing,
    Failed,
}

impl PassOutcome {
    pub fn should_sleep(&self) -> bool {
        !matches!(self, PassOutcome::Consumed(_))
    }
}

/// Tails the live data file and feeds each normalized message to both sinks.
///
/// `store` is authoritative and is always written before `log_sink`.
pub struct FileConsumer {
    reader: TailReader,
    store: Box<dyn RecordWriter>,
    log_sink: Box<dyn RecordWriter>,
    interval: Duration,
}

impl FileConsumer {
    pub fn new(
        reader: TailReader,
        store: Box<dyn RecordWriter>,
        log_sink: Box<dyn RecordWriter>,
        interval: Duration,
    ) -> Self {
        Self {
            reader,
            store,
            log_sink,
            interval,
        }
    }

    /// SQLite store + CSV log at the configured paths, reading from offset 0.
    ///
    /// Does not initialize the database; run `SqliteAggregateStore::initialize` first.
    pub fn from_settings(settings: &impl ConsumerSettings) -> Self {
        Self::new(
            TailReader::new(settings.source_path().to_path_buf()),
            Box::new(SqliteAggregateStore::new(settings.store_path())),
            Box::new(CsvRecordWriter::new(settings.csv_path())),
            settings.interval(),
        )
    }

    pub fn offset(&self) -> u64 {
        self.reader.offset()
    }

    /// Read the next batch of new lines, dispatch it, then commit the offset.
    ///
    /// Bad lines and failed writes are logged and skipped; nothing here returns an error.
    pub async fn run_pass(&mut self) -> PassOutcome {
        let batch = match self.reader.poll_lines().await {
            Ok(batch) => batch,
            Err(ReadError::NotFound(path)) => {
                log::error!(
                    "❌ Live data file not found: {}. Retrying in {} seconds.",
                    path.display(),
                    self.interval.as_secs()
                );
                return PassOutcome::SourceMissing;
            }
            Err(e) => {
                log::error!("❌ Unexpected error occurred: {}", e);
                return PassOutcome::Failed;
            }
        };

        let mut stats = PassStats::default();

        for line in &batch.lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            stats.lines += 1;

            let raw = match RawRecord::from_jsonl(line) {
                Ok(raw) => raw,
                Err(e) => {
                    log::error!("❌ Failed to decode line: {} ({})", e, line);
                    stats.undecodable += 1;
                    continue;
                }
            };

            // normalize() logs both outcomes itself
            let Ok(record) = normalize(&raw) else {
                stats.dropped += 1;
                continue;
            };

            if let Err(e) = self.store.write(&record).await {
                log::error!(
                    "❌ Failed to insert message into {}: {}",
                    self.store.backend_type(),
                    e
                );
            }
            if let Err(e) = self.log_sink.write(&record).await {
                log::error!(
                    "❌ Failed to write to {} file: {}",
                    self.log_sink.backend_type(),
                    e
                );
            }
            stats.written += 1;
        }

        self.reader.advance(batch.end_offset);

        if stats.lines == 0 && !batch.truncated {
            PassOutcome::NoNewData
        } else {
            log::debug!(
                "✅ Pass complete: {} lines, {} dispatched, {} undecodable, {} dropped (offset {})",
                stats.lines,
                stats.written,
                stats.undecodable,
                stats.dropped,
                self.reader.offset()
            );
            PassOutcome::Consumed(stats)
        }
    }

    /// Poll until `shutdown` is cancelled.
    ///
    /// Cancellation is checked between passes and interrupts the idle sleep.
    pub async fn run(&mut self, shutdown: CancellationToken) -> ConsumerState {
        log::info!(
            "📖 Started consuming messages from {}",
            self.reader.path().display()
        );

        let mut state = ConsumerState::Polling;
        while state == ConsumerState::Polling {
            if shutdown.is_cancelled() {
                state = ConsumerState::Shutdown;
                continue;
            }

            let outcome = self.run_pass().await;
            if !outcome.should_sleep() {
                continue;
            }

            if outcome == PassOutcome::NoNewData {
                log::info!("No new messages found, sleeping...");
            }

            tokio::select! {
                _ = shutdown.cancelled() => state = ConsumerState::Shutdown,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        log::info!("🛑 Consumer stopped at offset {}", self.reader.offset());
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer_core::normalizer::NormalizedRecord;
    use crate::consumer_core::writer_backend::WriterError;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    type CallLog = Arc<Mutex<Vec<(&'static str, NormalizedRecord)>>>;

    /// Records every call in a log shared with the test
    struct RecordingWriter {
        name: &'static str,
        calls: CallLog,
        fail: bool,
    }

    #[async_trait]
    impl RecordWriter for RecordingWriter {
        async fn write(&mut self, record: &NormalizedRecord) -> Result<(), WriterError> {
            self.calls.lock().unwrap().push((self.name, record.clone()));
            if self.fail {
                return Err(WriterError::Database("disk I/O error".to_string()));
            }
            Ok(())
        }

        fn backend_type(&self) -> &'static str {
            self.name
        }
    }

    fn consumer_for(path: &Path, fail_store: bool) -> (FileConsumer, CallLog) {
        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let consumer = FileConsumer::new(
            TailReader::new(path.to_path_buf()),
            Box::new(RecordingWriter {
                name: "store",
                calls: calls.clone(),
                fail: fail_store,
            }),
            Box::new(RecordingWriter {
                name: "csv",
                calls: calls.clone(),
                fail: false,
            }),
            Duration::from_millis(10),
        );
        (consumer, calls)
    }

    #[tokio::test]
    async fn test_store_written_before_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.json");
        std::fs::write(&path, "{\"message\":\"hi\",\"sentiment\":0.5}\n").unwrap();

        let (mut consumer, calls) = consumer_for(&path, false);
        let outcome = consumer.run_pass().await;

        assert_eq!(
            outcome,
            PassOutcome::Consumed(PassStats {
                lines: 1,
                written: 1,
                undecodable: 0,
                dropped: 0
            })
        );
        let calls = calls.lock().unwrap();
        let order: Vec<&str> = calls.iter().map(|(name, _)| *name).collect();
        assert_eq!(order, vec!["store", "csv"]);
        assert_eq!(calls[0].1.sentiment, 0.5);
    }

    #[tokio::test]
    async fn test_dropped_record_reaches_no_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.json");
        std::fs::write(&path, "{\"message\":\"bye\",\"sentiment\":\"bad\"}\n").unwrap();

        let (mut consumer, calls) = consumer_for(&path, false);
        let outcome = consumer.run_pass().await;

        assert!(matches!(outcome, PassOutcome::Consumed(s) if s.dropped == 1 && s.written == 0));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_line_does_not_abort_pass() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.json");
        std::fs::write(
            &path,
            "{\"sentiment\":0.1}\nnot json at all\n[1,2]\n{\"sentiment\":0.2}\n",
        )
        .unwrap();

        let (mut consumer, calls) = consumer_for(&path, false);
        let outcome = consumer.run_pass().await;

        assert!(matches!(outcome, PassOutcome::Consumed(s) if s.undecodable == 2 && s.written == 2));
        assert_eq!(calls.lock().unwrap().len(), 4);
        assert_eq!(consumer.offset(), std::fs::metadata(&path).unwrap().len());
    }

    #[tokio::test]
    async fn test_store_failure_still_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.json");
        std::fs::write(&path, "{\"sentiment\":0.3}\n").unwrap();

        let (mut consumer, calls) = consumer_for(&path, true);
        let outcome = consumer.run_pass().await;

        assert!(matches!(outcome, PassOutcome::Consumed(_)));
        let names: Vec<&str> = calls.lock().unwrap().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["store", "csv"]);
    }

    #[tokio::test]
    async fn test_only_blank_lines_is_no_new_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.json");
        std::fs::write(&path, "\n  \n").unwrap();

        let (mut consumer, calls) = consumer_for(&path, false);

        assert_eq!(consumer.run_pass().await, PassOutcome::NoNewData);
        assert_eq!(consumer.offset(), 4);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_capped_blank_batch_does_not_sleep() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.json");
        std::fs::write(&path, "\n\n{\"sentiment\":0.4}\n").unwrap();

        let (mut consumer, calls) = consumer_for(&path, false);
        consumer.reader = TailReader::new(path.clone()).with_max_lines(2);

        let first = consumer.run_pass().await;
        assert_eq!(first, PassOutcome::Consumed(PassStats::default()));
        assert!(!first.should_sleep());
        assert_eq!(consumer.offset(), 2);

        let second = consumer.run_pass().await;
        assert!(matches!(second, PassOutcome::Consumed(s) if s.written == 1));
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_source_sleeps() {
        let dir = tempfile::tempdir().unwrap();
        let (mut consumer, _) = consumer_for(&dir.path().join("absent.json"), false);

        let outcome = consumer.run_pass().await;
        assert_eq!(outcome, PassOutcome::SourceMissing);
        assert!(outcome.should_sleep());
        assert_eq!(consumer.offset(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_source_is_treated_as_idle() {
        let dir = tempfile::tempdir().unwrap();
        // A directory opens but cannot be read as lines
        let (mut consumer, calls) = consumer_for(dir.path(), false);

        let outcome = consumer.run_pass().await;
        assert_eq!(outcome, PassOutcome::Failed);
        assert!(outcome.should_sleep());
        assert_eq!(consumer.offset(), 0);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_when_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let (mut consumer, _) = consumer_for(&dir.path().join("absent.json"), false);

        let shutdown = CancellationToken::new();
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let state = tokio::time::timeout(Duration::from_secs(2), consumer.run(shutdown))
            .await
            .unwrap();
        assert_eq!(state, ConsumerState::Shutdown);
    }

    #[tokio::test]
    async fn test_run_with_cancelled_token_does_no_work() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.json");
        std::fs::write(&path, "{\"sentiment\":0.3}\n").unwrap();
        let (mut consumer, calls) = consumer_for(&path, false);

        let shutdown = CancellationToken::new();
        shutdown.cancel();

        assert_eq!(consumer.run(shutdown).await, ConsumerState::Shutdown);
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(consumer.offset(), 0);
    }
}
