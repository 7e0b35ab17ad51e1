//! Commitment operations: pure message-to-message transforms.
//!
//! A timestamp proof rewrites a leaf message into each anchor's committed
//! value by applying a sequence of operations. Every operation is a total
//! function over byte strings with a one-byte wire tag; operations with
//! immediate data encode it as a varuint length followed by the body.
//!
//! The set is closed: unknown tags are only representable in the codec's
//! skip path, never as an in-memory value.

use std::fmt;

use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use sha3::Keccak256;
use thiserror::Error;

use crate::codec::CodecError;
use crate::ser::{ByteReader, ByteWriter};

#[cfg(test)]
mod tests;

/// Wire tag for SHA-1.
pub const TAG_SHA1: u8 = 0x02;
/// Wire tag for RIPEMD-160.
pub const TAG_RIPEMD160: u8 = 0x03;
/// Wire tag for SHA-256.
pub const TAG_SHA256: u8 = 0x08;
/// Wire tag for Keccak-256.
pub const TAG_KECCAK256: u8 = 0x67;
/// Wire tag for append.
pub const TAG_APPEND: u8 = 0xf0;
/// Wire tag for prepend.
pub const TAG_PREPEND: u8 = 0xf1;
/// Wire tag for byte reversal.
pub const TAG_REVERSE: u8 = 0x0a;
/// Wire tag for binary-to-hex expansion.
pub const TAG_HEXLIFY: u8 = 0x0b;
/// Wire tag for hex-to-binary contraction.
pub const TAG_UNHEXLIFY: u8 = 0x0c;
/// Wire tag for substring extraction.
pub const TAG_SUBSTR: u8 = 0x0d;
/// Wire tag for left truncation.
pub const TAG_LEFT: u8 = 0x0e;
/// Wire tag for right truncation.
pub const TAG_RIGHT: u8 = 0x0f;
/// Wire tag for key-cycled XOR.
pub const TAG_XOR: u8 = 0x10;
/// Wire tag for key-cycled AND.
pub const TAG_AND: u8 = 0x11;
/// Wire tag for key-cycled OR.
pub const TAG_OR: u8 = 0x12;

/// Maximum immediate-data length for APPEND/PREPEND/XOR/AND/OR on the wire.
pub const MAX_OP_DATA_LEN: usize = 1024;

/// SUBSTR length sentinel meaning "to the end of the message".
pub const SUBSTR_TO_END: u64 = u32::MAX as u64;

/// Errors raised while applying an operation to a message.
///
/// These are evaluation errors: fatal to the Merkle path that triggered
/// them, never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum OpError {
    /// The message is shorter than the operation requires.
    #[error("message too short for {op}: needed {needed} bytes, message has {actual}")]
    MessageTooShort {
        /// Operation name.
        op: &'static str,
        /// Bytes the operation required.
        needed: u64,
        /// Bytes the message actually held.
        actual: usize,
    },

    /// UNHEXLIFY met an odd-length or non-hex message.
    #[error("invalid hex input: {detail}")]
    BadHex {
        /// What made the input invalid.
        detail: String,
    },
}

/// A commitment operation.
///
/// `apply` never mutates its input and never panics on operations decoded
/// from the wire; failures surface as [`OpError`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Op {
    /// 20-byte SHA-1 digest.
    Sha1,
    /// 20-byte RIPEMD-160 digest.
    Ripemd160,
    /// 32-byte SHA-256 digest.
    Sha256,
    /// 32-byte Keccak-256 digest.
    Keccak256,
    /// `msg ‖ data`.
    Append(Vec<u8>),
    /// `data ‖ msg`.
    Prepend(Vec<u8>),
    /// Byte reversal.
    Reverse,
    /// Binary to lowercase hex bytes.
    Hexlify,
    /// Hex bytes to binary.
    Unhexlify,
    /// `msg[start..start + len]`; `len ==` [`SUBSTR_TO_END`] takes the rest.
    Substr {
        /// Starting offset into the message.
        start: u64,
        /// Length to take, or the to-end sentinel.
        len: u64,
    },
    /// First `len` bytes.
    Left(u64),
    /// Last `len` bytes.
    Right(u64),
    /// Per-byte XOR with a cycled key.
    Xor(Vec<u8>),
    /// Per-byte AND with a cycled mask.
    And(Vec<u8>),
    /// Per-byte OR with a cycled mask.
    Or(Vec<u8>),
}

impl Op {
    /// Wire tag of this operation.
    #[must_use]
    pub const fn tag(&self) -> u8 {
        match self {
            Self::Sha1 => TAG_SHA1,
            Self::Ripemd160 => TAG_RIPEMD160,
            Self::Sha256 => TAG_SHA256,
            Self::Keccak256 => TAG_KECCAK256,
            Self::Append(_) => TAG_APPEND,
            Self::Prepend(_) => TAG_PREPEND,
            Self::Reverse => TAG_REVERSE,
            Self::Hexlify => TAG_HEXLIFY,
            Self::Unhexlify => TAG_UNHEXLIFY,
            Self::Substr { .. } => TAG_SUBSTR,
            Self::Left(_) => TAG_LEFT,
            Self::Right(_) => TAG_RIGHT,
            Self::Xor(_) => TAG_XOR,
            Self::And(_) => TAG_AND,
            Self::Or(_) => TAG_OR,
        }
    }

    /// Human-readable operation name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Ripemd160 => "ripemd160",
            Self::Sha256 => "sha256",
            Self::Keccak256 => "keccak256",
            Self::Append(_) => "append",
            Self::Prepend(_) => "prepend",
            Self::Reverse => "reverse",
            Self::Hexlify => "hexlify",
            Self::Unhexlify => "unhexlify",
            Self::Substr { .. } => "substr",
            Self::Left(_) => "left",
            Self::Right(_) => "right",
            Self::Xor(_) => "xor",
            Self::And(_) => "and",
            Self::Or(_) => "or",
        }
    }

    /// Applies the operation to `msg`, producing a new owned message.
    ///
    /// # Errors
    ///
    /// Returns [`OpError::MessageTooShort`] when SUBSTR/LEFT/RIGHT ask for
    /// more bytes than the message holds, and [`OpError::BadHex`] when
    /// UNHEXLIFY meets odd-length or non-hex input.
    pub fn apply(&self, msg: &[u8]) -> Result<Vec<u8>, OpError> {
        match self {
            Self::Sha1 => Ok(Sha1::digest(msg).to_vec()),
            Self::Ripemd160 => Ok(Ripemd160::digest(msg).to_vec()),
            Self::Sha256 => Ok(Sha256::digest(msg).to_vec()),
            Self::Keccak256 => Ok(Keccak256::digest(msg).to_vec()),
            Self::Append(data) => {
                let mut out = Vec::with_capacity(msg.len() + data.len());
                out.extend_from_slice(msg);
                out.extend_from_slice(data);
                Ok(out)
            }
            Self::Prepend(data) => {
                let mut out = Vec::with_capacity(msg.len() + data.len());
                out.extend_from_slice(data);
                out.extend_from_slice(msg);
                Ok(out)
            }
            Self::Reverse => Ok(msg.iter().rev().copied().collect()),
            Self::Hexlify => Ok(hex::encode(msg).into_bytes()),
            Self::Unhexlify => hex::decode(msg).map_err(|err| OpError::BadHex {
                detail: err.to_string(),
            }),
            Self::Substr { start, len } => Self::apply_substr(msg, *start, *len),
            Self::Left(len) => {
                let n = Self::fitting_len(msg, *len, "left")?;
                Ok(msg[..n].to_vec())
            }
            Self::Right(len) => {
                let n = Self::fitting_len(msg, *len, "right")?;
                Ok(msg[msg.len() - n..].to_vec())
            }
            Self::Xor(key) => Ok(Self::cycled(msg, key, |m, k| m ^ k)),
            Self::And(mask) => Ok(Self::cycled(msg, mask, |m, k| m & k)),
            Self::Or(mask) => Ok(Self::cycled(msg, mask, |m, k| m | k)),
        }
    }

    fn apply_substr(msg: &[u8], start: u64, len: u64) -> Result<Vec<u8>, OpError> {
        let from = usize::try_from(start).map_err(|_| OpError::MessageTooShort {
            op: "substr",
            needed: start,
            actual: msg.len(),
        })?;
        if from > msg.len() {
            return Err(OpError::MessageTooShort {
                op: "substr",
                needed: start,
                actual: msg.len(),
            });
        }
        if len == SUBSTR_TO_END {
            return Ok(msg[from..].to_vec());
        }
        let take = usize::try_from(len).map_err(|_| OpError::MessageTooShort {
            op: "substr",
            needed: start.saturating_add(len),
            actual: msg.len(),
        })?;
        if msg.len() - from < take {
            return Err(OpError::MessageTooShort {
                op: "substr",
                needed: start.saturating_add(len),
                actual: msg.len(),
            });
        }
        Ok(msg[from..from + take].to_vec())
    }

    fn fitting_len(msg: &[u8], len: u64, op: &'static str) -> Result<usize, OpError> {
        match usize::try_from(len) {
            Ok(n) if n <= msg.len() => Ok(n),
            _ => Err(OpError::MessageTooShort {
                op,
                needed: len,
                actual: msg.len(),
            }),
        }
    }

    fn cycled(msg: &[u8], key: &[u8], combine: impl Fn(u8, u8) -> u8) -> Vec<u8> {
        if key.is_empty() {
            return msg.to_vec();
        }
        msg.iter()
            .zip(key.iter().cycle())
            .map(|(m, k)| combine(*m, *k))
            .collect()
    }

    /// Encodes the operation tag (as a varuint) and its immediates.
    ///
    /// The structural introducer byte preceding an operation on the wire is
    /// written by the tree codec, not here.
    pub fn encode(&self, writer: &mut ByteWriter) {
        writer.write_varuint(u64::from(self.tag()));
        match self {
            Self::Append(data)
            | Self::Prepend(data)
            | Self::Xor(data)
            | Self::And(data)
            | Self::Or(data) => {
                writer.write_varuint(data.len() as u64);
                writer.write_bytes(data);
            }
            Self::Substr { start, len } => {
                writer.write_varuint(*start);
                writer.write_varuint(*len);
            }
            Self::Left(len) | Self::Right(len) => writer.write_varuint(*len),
            Self::Sha1
            | Self::Ripemd160
            | Self::Sha256
            | Self::Keccak256
            | Self::Reverse
            | Self::Hexlify
            | Self::Unhexlify => {}
        }
    }

    /// Decodes an operation tag and its immediates.
    ///
    /// The caller has already consumed the structural introducer byte.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnknownOpTag`] for tags outside the closed set,
    /// [`CodecError::BodyTooLong`]/[`CodecError::EmptyBody`] for immediate
    /// data outside `1..=`[`MAX_OP_DATA_LEN`], and
    /// [`CodecError::InvalidImmediate`] for a non-sentinel zero SUBSTR
    /// length.
    pub fn decode(reader: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let tag = reader.read_varuint()?;
        let Ok(tag) = u8::try_from(tag) else {
            return Err(CodecError::UnknownOpTag { tag });
        };
        match tag {
            TAG_SHA1 => Ok(Self::Sha1),
            TAG_RIPEMD160 => Ok(Self::Ripemd160),
            TAG_SHA256 => Ok(Self::Sha256),
            TAG_KECCAK256 => Ok(Self::Keccak256),
            TAG_REVERSE => Ok(Self::Reverse),
            TAG_HEXLIFY => Ok(Self::Hexlify),
            TAG_UNHEXLIFY => Ok(Self::Unhexlify),
            TAG_APPEND => Ok(Self::Append(Self::decode_data(reader, "append")?)),
            TAG_PREPEND => Ok(Self::Prepend(Self::decode_data(reader, "prepend")?)),
            TAG_XOR => Ok(Self::Xor(Self::decode_data(reader, "xor")?)),
            TAG_AND => Ok(Self::And(Self::decode_data(reader, "and")?)),
            TAG_OR => Ok(Self::Or(Self::decode_data(reader, "or")?)),
            TAG_SUBSTR => {
                let start = reader.read_varuint()?;
                let len = reader.read_varuint()?;
                if len == 0 {
                    return Err(CodecError::InvalidImmediate {
                        op: "substr",
                        detail: "zero length is not the to-end sentinel".to_string(),
                    });
                }
                Ok(Self::Substr { start, len })
            }
            TAG_LEFT => Ok(Self::Left(reader.read_varuint()?)),
            TAG_RIGHT => Ok(Self::Right(reader.read_varuint()?)),
            other => Err(CodecError::UnknownOpTag {
                tag: u64::from(other),
            }),
        }
    }

    fn decode_data(reader: &mut ByteReader<'_>, op: &'static str) -> Result<Vec<u8>, CodecError> {
        let len = reader.read_varuint()?;
        if len == 0 {
            return Err(CodecError::EmptyBody { context: op });
        }
        if len > MAX_OP_DATA_LEN as u64 {
            return Err(CodecError::BodyTooLong {
                len,
                max: MAX_OP_DATA_LEN,
            });
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(reader.read_bytes(len as usize)?.to_vec())
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Append(data) | Self::Prepend(data) | Self::Xor(data) | Self::And(data)
            | Self::Or(data) => {
                write!(f, "{} {}", self.name(), hex::encode(data))
            }
            Self::Substr { start, len } if *len == SUBSTR_TO_END => {
                write!(f, "substr {start}..")
            }
            Self::Substr { start, len } => write!(f, "substr {start}..+{len}"),
            Self::Left(len) | Self::Right(len) => write!(f, "{} {len}", self.name()),
            _ => f.write_str(self.name()),
        }
    }
}
