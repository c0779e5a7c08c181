//! Incremental log file reader.
//!
//! Reads only bytes appended since the last read and yields complete lines.
//! A trailing fragment without a newline is held back until the rest of the
//! line arrives.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::error::WatcherError;
use crate::event::RawLine;

/// Default upper bound on bytes read per call.
pub const DEFAULT_MAX_READ_BYTES: u64 = 4 * 1024 * 1024;

/// A held back fragment longer than this is emitted as a line.
const MAX_PENDING_BYTES: usize = 1024 * 1024;

/// Bytes scanned from the end of a file when backfilling.
const BACKFILL_WINDOW_BYTES: u64 = 16 * 1024 * 1024;

/// Outcome of one read.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TailBatch {
    /// The file shrank or vanished since the last successful read. `lines`
    /// then belong to the new generation only.
    pub rotated: bool,
    pub lines: Vec<RawLine>,
    /// Appended bytes not read yet because of the per-read bound.
    pub remaining: u64,
}

/// Incremental reader that tracks its byte offset in one file.
#[derive(Debug)]
pub struct LogTailer {
    /// Path to the log file.
    path: PathBuf,
    /// Bytes consumed so far, including the pending fragment.
    offset: u64,
    /// Incomplete trailing line.
    pending: Vec<u8>,
    /// Offset where `pending` starts.
    pending_offset: u64,
    max_read: u64,
    /// The file disappeared after being read; its replacement is a new
    /// generation.
    vanished: bool,
}

impl LogTailer {
    /// Create a tailer that reads the file from the beginning.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self::with_offset(path, 0)
    }

    /// Create a tailer starting at a specific offset.
    #[must_use]
    pub fn with_offset(path: PathBuf, offset: u64) -> Self {
        Self {
            path,
            offset,
            pending: Vec::new(),
            pending_offset: offset,
            max_read: DEFAULT_MAX_READ_BYTES,
            vanished: false,
        }
    }

    /// Create a tailer whose baseline is the current file size, so only
    /// lines appended from now on are read.
    ///
    /// # Errors
    ///
    /// Returns an error if the file's metadata cannot be read.
    pub async fn at_end(path: PathBuf) -> Result<Self, WatcherError> {
        let len = tokio::fs::metadata(&path)
            .await
            .map_err(|e| WatcherError::from_io(&path, e))?
            .len();
        Ok(Self::with_offset(path, len))
    }

    /// Bound the bytes read per call.
    #[must_use]
    pub fn with_max_read(mut self, max_read: u64) -> Self {
        self.max_read = max_read.max(1);
        self
    }

    /// Get the current byte offset.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Get the path being tailed.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read complete lines appended since the last read.
    ///
    /// If the file is smaller than the current offset it was rotated or
    /// truncated: the offset and any pending fragment are dropped and
    /// reading restarts at the beginning of the new file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or an I/O error
    /// occurs. A missing file drops the offset, and the next successful
    /// read starts the recreated file from the beginning as a rotation.
    /// Other failures leave the offset unchanged.
    pub async fn read_new_lines(&mut self) -> Result<TailBatch, WatcherError> {
        let mut file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) => return Err(self.open_failed(e)),
        };
        let file_len = file.metadata().await?.len();

        let mut batch = TailBatch::default();
        if self.vanished {
            tracing::warn!(path = %self.path.display(), len = file_len, "Log file recreated, treating as rotation");
            self.vanished = false;
            batch.rotated = true;
        } else if file_len < self.offset {
            tracing::warn!(
                path = %self.path.display(),
                old_offset = self.offset,
                new_len = file_len,
                "Log file shrank, treating as rotation"
            );
            self.reset();
            batch.rotated = true;
        }

        if file_len == self.offset {
            return Ok(batch);
        }

        let available = file_len - self.offset;
        let to_read = available.min(self.max_read);
        file.seek(SeekFrom::Start(self.offset)).await?;

        let mut chunk = Vec::with_capacity(usize::try_from(to_read).unwrap_or(0));
        file.take(to_read).read_to_end(&mut chunk).await?;

        self.offset += chunk.len() as u64;
        batch.remaining = file_len.saturating_sub(self.offset);
        batch.lines = self.split(&chunk);
        Ok(batch)
    }

    fn open_failed(&mut self, e: std::io::Error) -> WatcherError {
        let err = WatcherError::from_io(&self.path, e);
        if matches!(err, WatcherError::FileMissing(_)) && (self.offset > 0 || !self.pending.is_empty()) {
            self.reset();
            self.vanished = true;
        }
        err
    }

    /// Append a chunk to the pending fragment and cut out complete lines.
    fn split(&mut self, chunk: &[u8]) -> Vec<RawLine> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.pending[start..].iter().position(|b| *b == b'\n') {
            let end = start + pos;
            let line_offset = self.pending_offset + start as u64;
            lines.push(decode(&self.pending[start..end], line_offset));
            start = end + 1;
        }

        self.pending.drain(..start);
        self.pending_offset += start as u64;

        if self.pending.len() > MAX_PENDING_BYTES {
            tracing::warn!(
                path = %self.path.display(),
                bytes = self.pending.len(),
                "Oversized line without newline, emitting as is"
            );
            if let Some(line) = self.take_partial() {
                lines.push(line);
            }
        }
        lines
    }

    /// Take the held back fragment, if any, as a line.
    pub fn take_partial(&mut self) -> Option<RawLine> {
        if self.pending.is_empty() {
            return None;
        }
        let line = decode(&self.pending, self.pending_offset);
        self.pending_offset += self.pending.len() as u64;
        self.pending.clear();
        Some(line)
    }

    /// Reset the offset to the beginning of the file.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.pending.clear();
        self.pending_offset = 0;
    }
}

/// Decode one line, tolerating invalid UTF-8, a BOM and a `\r` terminator.
fn decode(bytes: &[u8], offset: u64) -> RawLine {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    let text = String::from_utf8_lossy(bytes);
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    RawLine {
        text: text.to_string(),
        offset,
    }
}

/// The last `count` complete lines of a file and the file length they
/// were read against.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub async fn read_last_lines(path: &Path, count: usize) -> Result<(Vec<RawLine>, u64), WatcherError> {
    let mut file = File::open(path).await.map_err(|e| WatcherError::from_io(path, e))?;
    let len = file.metadata().await?.len();
    if count == 0 {
        return Ok((Vec::new(), len));
    }

    let start = len.saturating_sub(BACKFILL_WINDOW_BYTES);
    file.seek(SeekFrom::Start(start)).await?;
    let mut window = Vec::new();
    file.take(len - start).read_to_end(&mut window).await?;

    let mut tailer = LogTailer::with_offset(path.to_path_buf(), start);
    let mut lines = tailer.split(&window);
    // The first line of a window that starts mid-file is a fragment.
    if start > 0 && !lines.is_empty() {
        lines.remove(0);
    }
    let skip = lines.len().saturating_sub(count);
    Ok((lines.split_off(skip), len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn texts(batch: &TailBatch) -> Vec<&str> {
        batch.lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[tokio::test]
    async fn test_lines_split_on_crlf_with_offsets() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "first\r\nsecond\n").unwrap();
        file.flush().unwrap();

        let mut tailer = LogTailer::new(file.path().to_path_buf());
        let batch = tailer.read_new_lines().await.unwrap();

        assert_eq!(texts(&batch), vec!["first", "second"]);
        assert_eq!(batch.lines[1].offset, 7);
        assert_eq!(tailer.offset(), 14);
    }

    #[tokio::test]
    async fn test_partial_line_held_until_newline() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "complete\nhalf").unwrap();
        file.flush().unwrap();

        let mut tailer = LogTailer::new(file.path().to_path_buf());
        assert_eq!(texts(&tailer.read_new_lines().await.unwrap()), vec!["complete"]);

        write!(file, " done\n").unwrap();
        file.flush().unwrap();
        let batch = tailer.read_new_lines().await.unwrap();
        assert_eq!(texts(&batch), vec!["half done"]);
        assert_eq!(batch.lines[0].offset, 9);
    }

    #[tokio::test]
    async fn test_at_end_skips_existing_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "old").unwrap();
        file.flush().unwrap();

        let mut tailer = LogTailer::at_end(file.path().to_path_buf()).await.unwrap();
        assert!(tailer.read_new_lines().await.unwrap().lines.is_empty());

        writeln!(file, "new").unwrap();
        file.flush().unwrap();
        assert_eq!(texts(&tailer.read_new_lines().await.unwrap()), vec!["new"]);
    }

    #[tokio::test]
    async fn test_shrunk_file_restarts_from_zero() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();
        std::fs::write(&path, "gen one line a\ngen one line b\n").unwrap();

        let mut tailer = LogTailer::new(path.clone());
        assert_eq!(tailer.read_new_lines().await.unwrap().lines.len(), 2);

        std::fs::write(&path, "gen two\n").unwrap();
        let batch = tailer.read_new_lines().await.unwrap();
        assert!(batch.rotated);
        assert_eq!(texts(&batch), vec!["gen two"]);
        assert_eq!(tailer.offset(), 8);
    }

    #[tokio::test]
    async fn test_burst_size_bounded() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "aaaa\nbbbb\ncccc\n").unwrap();
        file.flush().unwrap();

        let mut tailer = LogTailer::new(file.path().to_path_buf()).with_max_read(6);
        let first = tailer.read_new_lines().await.unwrap();
        assert_eq!(texts(&first), vec!["aaaa"]);
        assert_eq!(first.remaining, 9);

        let second = tailer.read_new_lines().await.unwrap();
        assert_eq!(texts(&second), vec!["bbbb"]);
        let third = tailer.read_new_lines().await.unwrap();
        assert_eq!(texts(&third), vec!["cccc"]);
        assert_eq!(third.remaining, 0);
    }

    #[tokio::test]
    async fn test_missing_file_reported() {
        let mut tailer = LogTailer::new(PathBuf::from("/tmp/nonexistent-verse-watch-12345.log"));
        let result = tailer.read_new_lines().await;
        assert!(matches!(result, Err(WatcherError::FileMissing(_))));
        assert_eq!(tailer.offset(), 0);
    }

    #[tokio::test]
    async fn test_vanished_file_drops_offset() {
        let mut tailer = LogTailer::with_offset(PathBuf::from("/tmp/nonexistent-verse-watch-67890.log"), 4096);
        assert!(tailer.read_new_lines().await.is_err());
        assert_eq!(tailer.offset(), 0);
    }

    #[tokio::test]
    async fn test_tailer_strips_bom_and_tolerates_invalid_utf8() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"\xEF\xBB\xBFstart\nbad \xFF byte\n").unwrap();
        file.flush().unwrap();

        let mut tailer = LogTailer::new(file.path().to_path_buf());
        let batch = tailer.read_new_lines().await.unwrap();
        assert_eq!(batch.lines[0].text, "start");
        assert_eq!(batch.lines[1].text, "bad \u{fffd} byte");
    }

    #[tokio::test]
    async fn test_read_last_lines() {
        let mut file = NamedTempFile::new().unwrap();
        for i in 0..10 {
            writeln!(file, "line {i}").unwrap();
        }
        write!(file, "partial").unwrap();
        file.flush().unwrap();

        let (lines, len) = read_last_lines(file.path(), 3).await.unwrap();
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["line 7", "line 8", "line 9"]);
        assert_eq!(len, std::fs::metadata(file.path()).unwrap().len());
    }

    #[test]
    fn test_take_partial_and_reset() {
        let mut tailer = LogTailer::with_offset(PathBuf::from("/tmp/Game.log"), 100);
        let lines = tailer.split(b"tail");
        assert!(lines.is_empty());
        let partial = tailer.take_partial().unwrap();
        assert_eq!(partial.text, "tail");
        assert_eq!(partial.offset, 100);

        tailer.reset();
        assert_eq!(tailer.offset(), 0);
        assert!(tailer.take_partial().is_none());
    }
}
