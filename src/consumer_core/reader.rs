//! Byte-offset JSONL tail reader
//!
//! Each poll reopens the file, seeks to the stored offset, and returns the complete
//! lines currently available, up to a per-poll cap. The offset only moves when the
//! caller commits a batch.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};

/// Lines returned by a single poll unless overridden with `with_max_lines`
pub const DEFAULT_MAX_LINES: usize = 1000;

#[derive(Debug)]
pub enum ReadError {
    NotFound(PathBuf),
    Io(std::io::Error),
}

impl From<std::io::Error> for ReadError {
    fn from(err: std::io::Error) -> Self {
        ReadError::Io(err)
    }
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::NotFound(path) => write!(f, "Live data file not found: {}", path.display()),
            ReadError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ReadError {}

/// Lines read in one poll, and the offset just past the last of them
#[derive(Debug, Clone, PartialEq)]
pub struct TailBatch {
    pub lines: Vec<String>,
    pub end_offset: u64,
    /// The line cap was hit; more complete lines may follow `end_offset`
    pub truncated: bool,
}

pub struct TailReader {
    path: PathBuf,
    offset: u64,
    max_lines: usize,
}

impl TailReader {
    pub fn new(path: PathBuf) -> Self {
        Self::with_offset(path, 0)
    }

    /// Resume from a known byte offset instead of the start of the file
    pub fn with_offset(path: PathBuf, offset: u64) -> Self {
        Self {
            path,
            offset,
            max_lines: DEFAULT_MAX_LINES,
        }
    }

    /// Cap the number of lines a single poll returns (at least 1)
    pub fn with_max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = max_lines.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read complete lines after the current offset, at most `max_lines` of them.
    ///
    /// A trailing line without its newline is left in place for the next poll.
    pub async fn poll_lines(&self) -> Result<TailBatch, ReadError> {
        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ReadError::NotFound(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let len = file.metadata().await?.len();
        if len < self.offset {
            log::warn!(
                "⚠️  {} shrank below read offset ({} < {}), waiting for new data",
                self.path.display(),
                len,
                self.offset
            );
            return Ok(TailBatch {
                lines: Vec::new(),
                end_offset: self.offset,
                truncated: false,
            });
        }

        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(self.offset)).await?;

        let mut lines = Vec::new();
        let mut position = self.offset;
        let mut buf = Vec::new();
        let mut truncated = false;

        loop {
            if lines.len() >= self.max_lines {
                truncated = true;
                break;
            }
            buf.clear();
            let n = reader.read_until(b'\n', &mut buf).await?;
            if n == 0 || buf.last() != Some(&b'\n') {
                break;
            }
            position += n as u64;
            lines.push(String::from_utf8_lossy(&buf).into_owned());
        }

        Ok(TailBatch {
            lines,
            end_offset: position,
            truncated,
        })
    }

    /// Move the offset forward; never rewinds.
    pub fn advance(&mut self, end_offset: u64) {
        if end_offset > self.offset {
            self.offset = end_offset;
        }
    }
}
