//! Wire codec for timestamp trees and timestamp files.
//!
//! # Tree grammar
//!
//! A serialized node is read with the cursor positioned at that node's
//! message:
//!
//! ```text
//! node := entry* 0xF0
//! entry := 0x00 op-tag-varuint op-immediates node     (operation + child)
//!        | attestation-tag varuint-len body           (attestation)
//!        | 0xF1 varuint-len skipped-bytes             (unknown commitment)
//! ```
//!
//! Attestation tags other than the known set are also skipped by their
//! varuint length, which is what keeps old readers compatible with future
//! commitment kinds. Note the deliberate tag collision: `0x08` is SHA-256
//! after the `0x00` introducer and Bitcoin elsewhere — disambiguation is
//! positional and must stay that way for wire compatibility.
//!
//! Node messages are never serialized; the leaf commitment is re-derived
//! from the document and nonce when a file is loaded.

use thiserror::Error;

use crate::attestation::Attestation;
use crate::op::Op;
use crate::ser::{ByteReader, ByteWriter, SerError};
use crate::timestamp::Tree;

mod envelope;


pub use envelope::{
    attach, split_attached, DetachedTimestampFile, HEADER_MAGIC, NONCE_SIZE, VERSION_LEGACY,
    VERSION_NONCED,
};

/// Structural byte introducing an operation entry.
pub const OP_INTRODUCER: u8 = 0x00;
/// Structural byte terminating a node.
pub const END_OF_NODE: u8 = 0xf0;
/// Structural byte marking a skippable unknown commitment.
pub const SKIP_MARKER: u8 = 0xf1;

/// Hard cap for any varuint length-prefixed body in the codec.
pub const MAX_VARBYTES_LEN: usize = 4096;

/// Maximum nesting depth accepted while deserializing a tree.
pub const MAX_TREE_DEPTH: usize = 256;

/// Errors raised while parsing or emitting the wire format.
///
/// Codec errors are fatal to the enclosing parse and never retried.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CodecError {
    /// The file does not start with the timestamp-file magic.
    #[error("bad magic: not a timestamp file")]
    BadMagic,

    /// The envelope names a version this reader does not speak.
    #[error("unknown timestamp file version {version}")]
    UnknownVersion {
        /// The version byte found.
        version: u8,
    },

    /// Truncation or malformed varuint in the underlying byte stream.
    #[error(transparent)]
    Ser(#[from] SerError),

    /// An operation tag outside the closed operation set.
    #[error("unknown operation tag {tag:#x}")]
    UnknownOpTag {
        /// The tag value read.
        tag: u64,
    },

    /// An attestation tag outside the known set, in a context that cannot
    /// skip it.
    #[error("unknown attestation tag {tag:#x}")]
    UnknownAttestationTag {
        /// The tag byte read.
        tag: u8,
    },

    /// A length prefix exceeds the permitted bound.
    #[error("length-prefixed body of {len} bytes exceeds the {max}-byte cap")]
    BodyTooLong {
        /// Declared length.
        len: u64,
        /// Applicable cap.
        max: usize,
    },

    /// A body that must be non-empty was empty.
    #[error("empty body for {context}")]
    EmptyBody {
        /// What was being parsed.
        context: &'static str,
    },

    /// A length-prefixed body was longer than its contents.
    #[error("trailing bytes inside {context}")]
    TrailingBytes {
        /// What was being parsed.
        context: &'static str,
    },

    /// A pending attestation URI failed validation.
    #[error("invalid calendar uri: {detail}")]
    BadUri {
        /// What made the URI invalid.
        detail: String,
    },

    /// A SUBSTR immediate outside the canonical form.
    #[error("invalid immediate for {op}: {detail}")]
    InvalidImmediate {
        /// Operation whose immediate was invalid.
        op: &'static str,
        /// What made it invalid.
        detail: String,
    },

    /// The tree nests deeper than [`MAX_TREE_DEPTH`].
    #[error("tree nesting exceeds {max} levels")]
    DepthExceeded {
        /// The enforced depth cap.
        max: usize,
    },
}

/// Serializes a tree into `writer`.
///
/// Attestations are written before children; children in insertion order;
/// the node closes with [`END_OF_NODE`]. An empty tree is the single
/// terminator byte.
pub fn serialize_tree(tree: &Tree, writer: &mut ByteWriter) {
    for attestation in &tree.attestations {
        attestation.encode(writer);
    }
    for (op, child) in &tree.ops {
        writer.write_u8(OP_INTRODUCER);
        op.encode(writer);
        serialize_tree(child, writer);
    }
    writer.write_u8(END_OF_NODE);
}

/// Serializes a tree to owned bytes.
#[must_use]
pub fn tree_to_bytes(tree: &Tree) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    serialize_tree(tree, &mut writer);
    writer.into_bytes()
}

/// Deserializes one tree from `reader`, leaving the cursor just past its
/// terminator.
///
/// # Errors
///
/// Any [`CodecError`]; see the variants for the individual conditions.
pub fn deserialize_tree(reader: &mut ByteReader<'_>) -> Result<Tree, CodecError> {
    deserialize_node(reader, 0)
}

/// Deserializes a tree that must span `bytes` exactly.
///
/// # Errors
///
/// As [`deserialize_tree`], plus [`CodecError::TrailingBytes`] when input
/// remains after the root terminator.
pub fn tree_from_bytes(bytes: &[u8]) -> Result<Tree, CodecError> {
    let mut reader = ByteReader::new(bytes);
    let tree = deserialize_tree(&mut reader)?;
    if !reader.eof() {
        return Err(CodecError::TrailingBytes {
            context: "serialized tree",
        });
    }
    Ok(tree)
}

fn deserialize_node(reader: &mut ByteReader<'_>, depth: usize) -> Result<Tree, CodecError> {
    if depth > MAX_TREE_DEPTH {
        return Err(CodecError::DepthExceeded {
            max: MAX_TREE_DEPTH,
        });
    }
    let mut tree = Tree::new();
    loop {
        let tag = reader.read_u8()?;
        match tag {
            END_OF_NODE => return Ok(tree),
            OP_INTRODUCER => {
                let op = Op::decode(reader)?;
                let child = deserialize_node(reader, depth + 1)?;
                // Canonical form: duplicate sibling ops collapse, exactly as
                // in Tree::merge.
                if let Some((_, existing)) = tree.ops.iter_mut().find(|(o, _)| *o == op) {
                    existing.merge(child);
                } else {
                    tree.ops.push((op, child));
                }
            }
            SKIP_MARKER => skip_varbytes(reader)?,
            other if Attestation::known_tag(other) => {
                let attestation = Attestation::decode_tagged(other, reader)?;
                tree.add_attestation(attestation);
            }
            other => {
                // Forward compatibility: unknown commitment kinds carry a
                // length prefix so old readers can pass over them.
                tracing::debug!(tag = other, "skipping unknown commitment tag");
                skip_varbytes(reader)?;
            }
        }
    }
}

fn skip_varbytes(reader: &mut ByteReader<'_>) -> Result<(), CodecError> {
    let len = reader.read_varuint()?;
    if len > MAX_VARBYTES_LEN as u64 {
        return Err(CodecError::BodyTooLong {
            len,
            max: MAX_VARBYTES_LEN,
        });
    }
    #[allow(clippy::cast_possible_truncation)]
    reader.skip(len as usize)?;
    Ok(())
}
