//! crates/match/src/script.rs
//!
//! Delta operations, scripts and the reference reconstructor.

use std::cmp::min;
use std::io::{self, Read, Seek, SeekFrom, Write};

use tracing::debug;

use crate::error::ScriptError;

/// One step of a delta script.
///
/// Every operation covers `[target_offset, target_offset + length)` of the
/// target stream.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "op", rename_all = "lowercase"))]
pub enum DeltaOp {
    /// Target bytes are identical to base bytes at `source_offset`.
    Copy {
        /// Offset of the matching bytes in the base stream.
        source_offset: u64,
        /// Number of bytes copied.
        length: u32,
        /// Offset of the range in the target stream.
        target_offset: u64,
    },
    /// Target bytes carried verbatim.
    Write {
        /// The literal bytes.
        #[cfg_attr(feature = "serde", serde(with = "crate::literal_base64"))]
        literal: Vec<u8>,
        /// Offset of the range in the target stream.
        target_offset: u64,
        /// Number of literal bytes.
        length: u32,
    },
}

impl DeltaOp {
    /// Creates a write whose length is taken from `literal`.
    pub fn write(target_offset: u64, literal: Vec<u8>) -> Result<Self, ScriptError> {
        let length = u32::try_from(literal.len()).map_err(|_| ScriptError::LiteralTooLong {
            length: literal.len(),
        })?;
        Ok(Self::Write {
            literal,
            target_offset,
            length,
        })
    }

    /// Returns the target offset of the operation.
    #[must_use]
    pub const fn target_offset(&self) -> u64 {
        match self {
            Self::Copy { target_offset, .. } | Self::Write { target_offset, .. } => *target_offset,
        }
    }

    /// Returns the number of target bytes covered.
    #[must_use]
    pub const fn length(&self) -> u32 {
        match self {
            Self::Copy { length, .. } | Self::Write { length, .. } => *length,
        }
    }

    /// Returns the offset one past the last target byte covered.
    #[must_use]
    pub const fn target_end(&self) -> u64 {
        self.target_offset() + self.length() as u64
    }

    /// Returns `true` for [`DeltaOp::Copy`].
    #[must_use]
    pub const fn is_copy(&self) -> bool {
        matches!(self, Self::Copy { .. })
    }
}

/// Ordered operations that rebuild a target from a base plus literal data.
///
/// Deserialized scripts are rebuilt from their operations and validated;
/// stored totals are ignored.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawScript"))]
pub struct DeltaScript {
    ops: Vec<DeltaOp>,
    target_len: u64,
    literal_bytes: u64,
}

impl DeltaScript {
    /// Creates a script from an operation list.
    ///
    /// No invariant is checked here; see [`validate`](Self::validate).
    #[must_use]
    pub fn new(ops: Vec<DeltaOp>) -> Self {
        let target_len = ops.iter().map(|op| u64::from(op.length())).sum();
        let literal_bytes = ops
            .iter()
            .filter(|op| !op.is_copy())
            .map(|op| u64::from(op.length()))
            .sum();
        Self {
            ops,
            target_len,
            literal_bytes,
        }
    }

    /// Returns the operations in target order.
    #[must_use]
    pub fn ops(&self) -> &[DeltaOp] {
        &self.ops
    }

    /// Consumes the script and returns its operations.
    #[must_use]
    pub fn into_ops(self) -> Vec<DeltaOp> {
        self.ops
    }

    /// Returns the length of the target the script rebuilds.
    #[must_use]
    pub const fn target_len(&self) -> u64 {
        self.target_len
    }

    /// Returns the number of bytes carried as literals.
    #[must_use]
    pub const fn literal_bytes(&self) -> u64 {
        self.literal_bytes
    }

    /// Returns the number of bytes copied from the base.
    #[must_use]
    pub const fn copy_bytes(&self) -> u64 {
        self.target_len - self.literal_bytes
    }

    /// Returns `true` when the script has no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Checks that the operations partition `[0, target_len)` in order and
    /// that every write carries exactly its declared number of bytes.
    pub fn validate(&self) -> Result<(), ScriptError> {
        let mut expected = 0u64;
        for (index, op) in self.ops.iter().enumerate() {
            if op.target_offset() != expected {
                return Err(ScriptError::Discontiguous {
                    index,
                    offset: op.target_offset(),
                    expected,
                });
            }
            if op.length() == 0 {
                return Err(ScriptError::EmptyOperation { index });
            }
            if let DeltaOp::Write {
                literal, length, ..
            } = op
                && literal.len() != *length as usize
            {
                return Err(ScriptError::LiteralLength {
                    index,
                    length: *length,
                    actual: literal.len(),
                });
            }
            expected = op.target_end();
        }
        Ok(())
    }

    /// Merges adjacent writes, and adjacent copies whose source ranges are
    /// also contiguous, as long as the merged length fits in `u32`.
    #[must_use]
    pub fn coalesced(&self) -> Self {
        let mut merged: Vec<DeltaOp> = Vec::with_capacity(self.ops.len());
        for op in &self.ops {
            if let Some(last) = merged.last_mut()
                && try_merge(last, op)
            {
                continue;
            }
            merged.push(op.clone());
        }
        Self::new(merged)
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawScript {
    ops: Vec<DeltaOp>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawScript> for DeltaScript {
    type Error = ScriptError;

    fn try_from(raw: RawScript) -> Result<Self, Self::Error> {
        let script = Self::new(raw.ops);
        script.validate()?;
        Ok(script)
    }
}

fn try_merge(last: &mut DeltaOp, next: &DeltaOp) -> bool {
    if last.target_end() != next.target_offset() {
        return false;
    }
    let Some(combined) = last.length().checked_add(next.length()) else {
        return false;
    };
    match (last, next) {
        (
            DeltaOp::Copy {
                source_offset,
                length,
                ..
            },
            DeltaOp::Copy {
                source_offset: next_source,
                ..
            },
        ) if source_offset.checked_add(u64::from(*length)) == Some(*next_source) => {
            *length = combined;
            true
        }
        (
            DeltaOp::Write {
                literal, length, ..
            },
            DeltaOp::Write {
                literal: next_literal,
                ..
            },
        ) => {
            literal.extend_from_slice(next_literal);
            *length = combined;
            true
        }
        _ => false,
    }
}

/// Rebuilds the target by applying `script` to `base`, writing to `output`.
///
/// Copies seek within `base`; consecutive copies of adjacent base ranges
/// reuse the current position.
pub fn apply_delta<R, W>(mut base: R, mut output: W, script: &DeltaScript) -> io::Result<()>
where
    R: Read + Seek,
    W: Write,
{
    debug!(
        ops = script.ops().len(),
        target_len = script.target_len(),
        literal_bytes = script.literal_bytes(),
        "applying delta"
    );

    let mut buffer = vec![0u8; 64 * 1024];
    let mut base_position: Option<u64> = None;

    for op in script.ops() {
        match op {
            DeltaOp::Write { literal, .. } => output.write_all(literal)?,
            DeltaOp::Copy {
                source_offset,
                length,
                ..
            } => {
                if base_position != Some(*source_offset) {
                    base.seek(SeekFrom::Start(*source_offset))?;
                }

                let mut remaining = *length as usize;
                while remaining > 0 {
                    let chunk = min(remaining, buffer.len());
                    base.read_exact(&mut buffer[..chunk])?;
                    output.write_all(&buffer[..chunk])?;
                    remaining -= chunk;
                }
                base_position = Some(*source_offset + u64::from(*length));
            }
        }
    }
    output.flush()
}
