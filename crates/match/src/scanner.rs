//! crates/match/src/scanner.rs
//!
//! Rolling-checksum scan of a target stream against a [`SignatureMap`].
//!
//! The scan slides a window of one block over the target. Each window's weak
//! checksum is looked up in the map and confirmed with the strong hash. A
//! confirmed match emits a copy and jumps a whole block; a miss adds one byte
//! to the pending literal run and rotates the checksum by one byte. Once
//! fewer than one block of target bytes remains, the tail is compared once
//! as a whole against the map's short final block.
//!
//! [`ScanState`] holds all scan state and only ever sees buffered regions, so
//! the same state machine serves the blocking and async drivers.

use std::io::Read;
use std::mem;
use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

use checksums::strong::{StrongAlgorithm, StrongHash};
use checksums::{WeakAlgorithm, WeakChecksum};
use signature::{ChunkCursor, SignatureMap, open_readable, validate_sizes};

use crate::error::DeltaError;
use crate::script::{DeltaOp, DeltaScript};

/// Number of target bytes processed between cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 4096;

/// Longest literal run carried by a single write.
const MAX_LITERAL_RUN: usize = u32::MAX as usize;

/// Produces delta scripts for target streams against a shared signature map.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use matching::{DeltaOp, DeltaScanner};
/// use signature::build_signature_map;
///
/// let map = build_signature_map(&b"abcde"[..], 1, 2).expect("map");
/// let script = DeltaScanner::new(Arc::new(map))
///     .scan(&b"abXde"[..])
///     .expect("scan");
///
/// assert_eq!(script.ops().len(), 5);
/// assert!(matches!(
///     &script.ops()[2],
///     DeltaOp::Write { literal, target_offset: 2, length: 1 } if literal == b"X"
/// ));
/// ```
#[derive(Clone, Debug)]
pub struct DeltaScanner<W = WeakAlgorithm, S = StrongAlgorithm> {
    map: Option<Arc<SignatureMap<W, S>>>,
    buffer_size: Option<usize>,
    cancel: Option<CancellationToken>,
}

impl<W, S> DeltaScanner<W, S> {
    /// Creates a scanner over `map`, reading with the map's buffer size.
    #[must_use]
    pub const fn new(map: Arc<SignatureMap<W, S>>) -> Self {
        Self {
            map: Some(map),
            buffer_size: None,
            cancel: None,
        }
    }

    /// Creates a scanner with no map attached.
    ///
    /// Scanning fails with [`DeltaError::PrecursorMissing`] until a map is
    /// attached with [`with_map`](Self::with_map).
    #[must_use]
    pub const fn unbound() -> Self {
        Self {
            map: None,
            buffer_size: None,
            cancel: None,
        }
    }

    /// Attaches a built map.
    pub fn with_map(mut self, map: Arc<SignatureMap<W, S>>) -> Self {
        self.map = Some(map);
        self
    }

    /// Overrides the read-ahead buffer size. It must exceed the block size.
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = Some(buffer_size);
        self
    }

    /// Aborts scans with [`DeltaError::Cancelled`] once `token` fires.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Returns the attached map, if any.
    #[must_use]
    pub const fn map(&self) -> Option<&Arc<SignatureMap<W, S>>> {
        self.map.as_ref()
    }
}

impl<W, S> Default for DeltaScanner<W, S> {
    fn default() -> Self {
        Self::unbound()
    }
}

impl<W: WeakChecksum, S: StrongHash> DeltaScanner<W, S> {
    /// Checks the preconditions of a scan without touching any stream.
    fn prepare(&self) -> Result<(&SignatureMap<W, S>, usize), DeltaError> {
        let map = self.map.as_deref().ok_or(DeltaError::PrecursorMissing)?;
        let buffer_size = self
            .buffer_size
            .unwrap_or_else(|| map.config().buffer_size());
        validate_sizes(map.block_size(), buffer_size)?;
        Ok((map, buffer_size))
    }

    /// Scans `reader` to the end and returns the delta script.
    ///
    /// No partial script is returned when the scan fails.
    #[instrument(skip_all, name = "delta_scan")]
    pub fn scan<R: Read>(&self, reader: R) -> Result<DeltaScript, DeltaError> {
        let (map, buffer_size) = self.prepare()?;
        scan_reader(map, buffer_size, self.cancel.as_ref(), reader)
    }

    /// Opens `path` and scans its contents.
    pub fn scan_path(&self, path: impl AsRef<Path>) -> Result<DeltaScript, DeltaError> {
        self.prepare()?;
        let file = open_readable(path.as_ref())?;
        self.scan(file)
    }

    /// Asynchronous counterpart of [`scan`](Self::scan).
    #[cfg(feature = "async")]
    #[instrument(skip_all, name = "delta_scan")]
    pub async fn scan_async<R>(&self, reader: R) -> Result<DeltaScript, DeltaError>
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        let (map, buffer_size) = self.prepare()?;
        let mut cursor = ChunkCursor::new(reader, buffer_size);
        let capacity = cursor.capacity();
        let mut state = ScanState::new(map, self.cancel.as_ref());
        loop {
            state.check_cancelled()?;
            let region = cursor.fill_async(capacity).await?;
            if region.len() < state.block_size {
                break;
            }
            let used = state.consume(region)?;
            cursor.consume(used);
        }
        Ok(state.finish(cursor.buffered()))
    }
}

/// Scans `reader` against `map` using the map's buffer size.
pub fn generate_delta<R, W, S>(map: &SignatureMap<W, S>, reader: R) -> Result<DeltaScript, DeltaError>
where
    R: Read,
    W: WeakChecksum,
    S: StrongHash,
{
    scan_reader(map, map.config().buffer_size(), None, reader)
}

fn scan_reader<R, W, S>(
    map: &SignatureMap<W, S>,
    buffer_size: usize,
    cancel: Option<&CancellationToken>,
    reader: R,
) -> Result<DeltaScript, DeltaError>
where
    R: Read,
    W: WeakChecksum,
    S: StrongHash,
{
    let mut cursor = ChunkCursor::new(reader, buffer_size);
    let capacity = cursor.capacity();
    let mut state = ScanState::new(map, cancel);
    loop {
        state.check_cancelled()?;
        let region = cursor.fill(capacity)?;
        if region.len() < state.block_size {
            break;
        }
        let used = state.consume(region)?;
        cursor.consume(used);
    }
    Ok(state.finish(cursor.buffered()))
}

/// How the checksum of the next window is obtained.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum NextWindow {
    /// From scratch: at scan start and after every match.
    Calculate,
    /// By rotating out the first byte of the previous window.
    Rotate { removed: u8 },
}

/// Scan state carried across buffered regions of one target stream.
struct ScanState<'a, W, S> {
    map: &'a SignatureMap<W, S>,
    cancel: Option<&'a CancellationToken>,
    block_size: usize,
    /// Target offset of the current window.
    pos: u64,
    checksum: u32,
    next: NextWindow,
    /// Target offset where the pending literal run began.
    literal_start: Option<u64>,
    literal: Vec<u8>,
    max_literal: usize,
    ops: Vec<DeltaOp>,
    unchecked: usize,
}

impl<'a, W: WeakChecksum, S: StrongHash> ScanState<'a, W, S> {
    fn new(map: &'a SignatureMap<W, S>, cancel: Option<&'a CancellationToken>) -> Self {
        Self {
            map,
            cancel,
            block_size: map.block_size(),
            pos: 0,
            checksum: 0,
            next: NextWindow::Calculate,
            literal_start: None,
            literal: Vec::new(),
            max_literal: MAX_LITERAL_RUN,
            ops: Vec::new(),
            unchecked: 0,
        }
    }

    fn check_cancelled(&self) -> Result<(), DeltaError> {
        match self.cancel {
            Some(token) if token.is_cancelled() => Err(DeltaError::Cancelled { offset: self.pos }),
            _ => Ok(()),
        }
    }

    /// Evaluates every whole window in `region`, whose first byte is at
    /// `self.pos`, and returns the number of bytes moved past.
    ///
    /// Fewer than one block of `region` is left unconsumed.
    fn consume(&mut self, region: &[u8]) -> Result<usize, DeltaError> {
        let map = self.map;
        let weak = map.weak_algorithm();
        let block_size = self.block_size;
        let mut consumed = 0;

        while region.len() - consumed >= block_size {
            let window = &region[consumed..consumed + block_size];
            self.checksum = match self.next {
                NextWindow::Calculate => weak.calculate(window),
                NextWindow::Rotate { removed } => {
                    weak.rotate(self.checksum, block_size, removed, window[block_size - 1])
                }
            };

            let advanced = if let Some(block) = map.find_match(self.checksum, window) {
                self.copy(block.offset(), block.length());
                self.next = NextWindow::Calculate;
                block_size
            } else {
                self.miss(window[0]);
                self.next = NextWindow::Rotate { removed: window[0] };
                1
            };

            consumed += advanced;
            self.unchecked += advanced;
            if self.unchecked >= CANCEL_CHECK_INTERVAL {
                self.unchecked = 0;
                self.check_cancelled()?;
            }
        }
        Ok(consumed)
    }

    /// Matches the final partial window and closes the script.
    fn finish(mut self, tail: &[u8]) -> DeltaScript {
        let map = self.map;
        if !tail.is_empty() {
            let checksum = map.weak_algorithm().calculate(tail);
            if let Some(block) = map.find_match(checksum, tail) {
                self.copy(block.offset(), block.length());
            } else {
                for &byte in tail {
                    self.miss(byte);
                }
            }
        }
        self.flush_literal();

        let script = DeltaScript::new(self.ops);
        debug!(
            ops = script.ops().len(),
            target_len = script.target_len(),
            copy_bytes = script.copy_bytes(),
            literal_bytes = script.literal_bytes(),
            "delta scan finished"
        );
        script
    }

    fn copy(&mut self, source_offset: u64, length: u32) {
        self.flush_literal();
        self.ops.push(DeltaOp::Copy {
            source_offset,
            length,
            target_offset: self.pos,
        });
        self.pos += u64::from(length);
    }

    fn miss(&mut self, byte: u8) {
        if self.literal_start.is_none() {
            self.literal_start = Some(self.pos);
        }
        self.literal.push(byte);
        self.pos += 1;
        if self.literal.len() >= self.max_literal {
            self.flush_literal();
        }
    }

    fn flush_literal(&mut self) {
        let Some(target_offset) = self.literal_start.take() else {
            return;
        };
        let literal = mem::take(&mut self.literal);
        let length = literal.len() as u32;
        trace!(
            target: "blockdelta::scan",
            offset = target_offset,
            length,
            "unmatched range"
        );
        self.ops.push(DeltaOp::Write {
            literal,
            target_offset,
            length,
        });
    }
}
