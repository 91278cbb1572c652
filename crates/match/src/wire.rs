//! crates/match/src/wire.rs
//!
//! Binary record encoding of delta scripts.
//!
//! A stream starts with the magic `BDLT` and a version byte, followed by one
//! record per operation and a single `0x00` end tag. Integers are little
//! endian.
//!
//! | tag    | record                                                        |
//! |--------|---------------------------------------------------------------|
//! | `0x01` | copy: source offset `u64`, length `u32`, target offset `u64`  |
//! | `0x02` | write: target offset `u64`, length `u32`, `length` literal bytes |
//! | `0x00` | end of script                                                 |

use std::io::{self, ErrorKind, Read, Write};

use crate::error::ScriptError;
use crate::script::{DeltaOp, DeltaScript};

/// Leading bytes of every encoded delta.
pub const MAGIC: [u8; 4] = *b"BDLT";
/// Format version written by [`encode`].
pub const VERSION: u8 = 1;

const TAG_END: u8 = 0x00;
const TAG_COPY: u8 = 0x01;
const TAG_WRITE: u8 = 0x02;

/// Writes `script` to `writer`.
pub fn encode<W: Write>(script: &DeltaScript, mut writer: W) -> io::Result<()> {
    writer.write_all(&MAGIC)?;
    writer.write_all(&[VERSION])?;
    for op in script.ops() {
        match op {
            DeltaOp::Copy {
                source_offset,
                length,
                target_offset,
            } => {
                writer.write_all(&[TAG_COPY])?;
                writer.write_all(&source_offset.to_le_bytes())?;
                writer.write_all(&length.to_le_bytes())?;
                writer.write_all(&target_offset.to_le_bytes())?;
            }
            DeltaOp::Write {
                literal,
                target_offset,
                length,
            } => {
                writer.write_all(&[TAG_WRITE])?;
                writer.write_all(&target_offset.to_le_bytes())?;
                writer.write_all(&length.to_le_bytes())?;
                writer.write_all(literal)?;
            }
        }
    }
    writer.write_all(&[TAG_END])?;
    writer.flush()
}

/// Encodes `script` into a new buffer.
#[must_use]
pub fn encode_to_vec(script: &DeltaScript) -> Vec<u8> {
    let capacity = 6 + script.ops().len() * 21 + script.literal_bytes() as usize;
    let mut bytes = Vec::with_capacity(capacity);
    encode(script, &mut bytes).expect("encoding into a Vec cannot fail");
    bytes
}

/// Reads an encoded script from `reader`.
///
/// The decoded script is checked with [`DeltaScript::validate`] and the
/// stream must end right after the end record.
pub fn decode<R: Read>(reader: R) -> Result<DeltaScript, ScriptError> {
    let mut reader = Counted { inner: reader, read: 0 };

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(ScriptError::BadMagic);
    }
    let version = read_u8(&mut reader)?;
    if version != VERSION {
        return Err(ScriptError::UnsupportedVersion(version));
    }

    let mut ops = Vec::new();
    loop {
        let offset = reader.read;
        match read_u8(&mut reader)? {
            TAG_END => break,
            TAG_COPY => {
                let source_offset = read_u64(&mut reader)?;
                let length = read_u32(&mut reader)?;
                let target_offset = read_u64(&mut reader)?;
                ops.push(DeltaOp::Copy {
                    source_offset,
                    length,
                    target_offset,
                });
            }
            TAG_WRITE => {
                let target_offset = read_u64(&mut reader)?;
                let length = read_u32(&mut reader)?;
                let mut literal = Vec::new();
                (&mut reader)
                    .take(u64::from(length))
                    .read_to_end(&mut literal)?;
                if literal.len() != length as usize {
                    return Err(ScriptError::Truncated);
                }
                ops.push(DeltaOp::Write {
                    literal,
                    target_offset,
                    length,
                });
            }
            tag => return Err(ScriptError::UnknownTag { tag, offset }),
        }
    }

    if has_more(&mut reader)? {
        return Err(ScriptError::TrailingData);
    }

    let script = DeltaScript::new(ops);
    script.validate()?;
    Ok(script)
}

/// Decodes a script held in memory.
pub fn decode_slice(bytes: &[u8]) -> Result<DeltaScript, ScriptError> {
    decode(bytes)
}

/// Reader adapter that tracks the number of bytes consumed.
struct Counted<R> {
    inner: R,
    read: u64,
}

impl<R: Read> Read for Counted<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.read += n as u64;
        Ok(n)
    }
}

fn read_u8<R: Read>(reader: &mut R) -> io::Result<u8> {
    let mut bytes = [0u8; 1];
    reader.read_exact(&mut bytes)?;
    Ok(bytes[0])
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

fn read_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes)?;
    Ok(u64::from_le_bytes(bytes))
}

fn has_more<R: Read>(reader: &mut R) -> io::Result<bool> {
    let mut probe = [0u8; 1];
    loop {
        match reader.read(&mut probe) {
            Ok(n) => return Ok(n != 0),
            Err(error) if error.kind() == ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
}
