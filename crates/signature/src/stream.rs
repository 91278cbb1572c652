//! crates/signature/src/stream.rs
//!
//! Bounded read-ahead over byte streams.
//!
//! [`ChunkCursor`] owns a fixed buffer and hands out the unconsumed region.
//! Callers process as much of the region as they can, report the count with
//! [`consume`](ChunkCursor::consume) and ask for more with
//! [`fill`](ChunkCursor::fill). Unconsumed bytes are moved to the front of the
//! buffer before the next read so a window that straddles a read boundary is
//! always contiguous.

use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// A stream that cannot be used in the requested way.
#[derive(Debug, Error)]
pub enum StreamStateError {
    /// The path does not exist or cannot be opened.
    #[error("'{}' is not readable: {source}", path.display())]
    Unreadable {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying open error.
        #[source]
        source: io::Error,
    },
    /// The path names a directory.
    #[error("'{}' is a directory, not a byte stream", path.display())]
    Directory {
        /// Offending path.
        path: PathBuf,
    },
    /// The stream must support seeking but was given as a pipe.
    #[error("{what} must be a seekable file")]
    NotSeekable {
        /// Human readable name of the stream.
        what: &'static str,
    },
}

/// Opens `path` for reading, rejecting directories.
pub fn open_readable(path: &Path) -> Result<File, StreamStateError> {
    let unreadable = |source| StreamStateError::Unreadable {
        path: path.to_path_buf(),
        source,
    };
    let metadata = std::fs::metadata(path).map_err(unreadable)?;
    if metadata.is_dir() {
        return Err(StreamStateError::Directory {
            path: path.to_path_buf(),
        });
    }
    File::open(path).map_err(unreadable)
}

/// Fixed-capacity read-ahead over a [`Read`] source.
#[derive(Debug)]
pub struct ChunkCursor<R> {
    reader: R,
    buffer: Box<[u8]>,
    start: usize,
    end: usize,
    position: u64,
    eof: bool,
}

impl<R> ChunkCursor<R> {
    /// Wraps `reader` with a buffer of `capacity` bytes (at least one).
    pub fn new(reader: R, capacity: usize) -> Self {
        Self {
            reader,
            buffer: vec![0u8; capacity.max(1)].into_boxed_slice(),
            start: 0,
            end: 0,
            position: 0,
            eof: false,
        }
    }

    /// Returns the buffer capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the buffered bytes that have not been consumed.
    #[must_use]
    pub fn buffered(&self) -> &[u8] {
        &self.buffer[self.start..self.end]
    }

    /// Returns the stream offset of the first buffered byte.
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.position
    }

    /// Reports whether the source has signalled end of stream.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.eof
    }

    /// Marks `count` buffered bytes as processed.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds the buffered length.
    pub fn consume(&mut self, count: usize) {
        assert!(
            count <= self.end - self.start,
            "consumed {count} bytes with only {} buffered",
            self.end - self.start
        );
        self.start += count;
        self.position += count as u64;
        if self.start == self.end {
            self.start = 0;
            self.end = 0;
        }
    }

    /// Returns the wrapped reader, discarding any buffered bytes.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn wants_more(&self, min: usize) -> bool {
        !self.eof && self.end - self.start < min
    }

    /// Moves unconsumed bytes to the front once the tail is full.
    fn compact(&mut self) {
        if self.end == self.buffer.len() && self.start > 0 {
            self.buffer.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }
    }
}

impl<R: Read> ChunkCursor<R> {
    /// Reads until at least `min` bytes are buffered or the source is exhausted.
    ///
    /// `min` is clamped to the capacity. A shorter region is only returned at
    /// end of stream. Interrupted reads are retried.
    pub fn fill(&mut self, min: usize) -> io::Result<&[u8]> {
        let min = min.min(self.buffer.len());
        while self.wants_more(min) {
            self.compact();
            match self.reader.read(&mut self.buffer[self.end..]) {
                Ok(0) => self.eof = true,
                Ok(read) => self.end += read,
                Err(error) if error.kind() == ErrorKind::Interrupted => {}
                Err(error) => return Err(error),
            }
        }
        Ok(self.buffered())
    }
}

#[cfg(feature = "async")]
impl<R: tokio::io::AsyncRead + Unpin> ChunkCursor<R> {
    /// Asynchronous counterpart of [`fill`](Self::fill).
    pub async fn fill_async(&mut self, min: usize) -> io::Result<&[u8]> {
        use tokio::io::AsyncReadExt;

        let min = min.min(self.buffer.len());
        while self.wants_more(min) {
            self.compact();
            match self.reader.read(&mut self.buffer[self.end..]).await {
                Ok(0) => self.eof = true,
                Ok(read) => self.end += read,
                Err(error) if error.kind() == ErrorKind::Interrupted => {}
                Err(error) => return Err(error),
            }
        }
        Ok(self.buffered())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Reader that returns at most `step` bytes per call and injects an
    /// interruption before every successful read.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
        interrupt: bool,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::Error::from(ErrorKind::Interrupted));
            }
            let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn fill_returns_at_least_min_until_eof() {
        let mut cursor = ChunkCursor::new(Cursor::new(b"hello world".to_vec()), 8);
        assert_eq!(cursor.fill(3).unwrap().len(), 8);
        cursor.consume(6);
        assert_eq!(cursor.position(), 6);
        assert_eq!(cursor.fill(5).unwrap(), b"world");
        cursor.consume(5);
        assert!(cursor.fill(1).unwrap().is_empty());
        assert!(cursor.is_eof());
    }

    #[test]
    fn unconsumed_bytes_survive_compaction() {
        let data: Vec<u8> = (0..=255).collect();
        let reader = Trickle {
            data: data.clone(),
            pos: 0,
            step: 3,
            interrupt: false,
        };
        let mut cursor = ChunkCursor::new(reader, 10);
        let mut seen = Vec::new();
        loop {
            let region = cursor.fill(4).unwrap();
            if region.is_empty() {
                break;
            }
            let take = region.len().min(3);
            seen.extend_from_slice(&region[..take]);
            cursor.consume(take);
        }
        assert_eq!(seen, data);
        assert_eq!(cursor.position(), 256);
    }

    #[test]
    fn min_is_clamped_to_capacity() {
        let mut cursor = ChunkCursor::new(Cursor::new(vec![7u8; 100]), 16);
        assert_eq!(cursor.fill(1000).unwrap().len(), 16);
    }

    #[test]
    fn read_errors_propagate() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("disk on fire"))
            }
        }
        let mut cursor = ChunkCursor::new(Broken, 4);
        let error = cursor.fill(1).unwrap_err();
        assert_eq!(error.to_string(), "disk on fire");
    }

    #[test]
    #[should_panic(expected = "consumed 5 bytes")]
    fn over_consumption_panics() {
        let mut cursor = ChunkCursor::new(Cursor::new(vec![1u8; 4]), 8);
        cursor.fill(4).unwrap();
        cursor.consume(5);
    }

    #[test]
    fn open_readable_rejects_directories_and_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            open_readable(dir.path()),
            Err(StreamStateError::Directory { .. })
        ));
        assert!(matches!(
            open_readable(&dir.path().join("missing")),
            Err(StreamStateError::Unreadable { .. })
        ));
        let file = dir.path().join("present");
        std::fs::write(&file, b"x").unwrap();
        assert!(open_readable(&file).is_ok());
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn async_fill_matches_sync_fill() {
        let data = b"async cursor data".to_vec();
        let mut cursor = ChunkCursor::new(&data[..], 6);
        let mut seen = Vec::new();
        loop {
            let region = cursor.fill_async(2).await.unwrap();
            if region.is_empty() {
                break;
            }
            let take = region.len();
            seen.extend_from_slice(region);
            cursor.consume(take);
        }
        assert_eq!(seen, data);
    }
}
