//! Detached and attached timestamp file envelopes.
//!
//! A detached file is the 16-byte magic, a version byte, an optional
//! privacy nonce, and the serialized tree. An attached file is the original
//! document followed by the same envelope, the magic acting as a trailer
//! separator.

use super::{deserialize_tree, serialize_tree, CodecError};
use crate::ser::{ByteReader, ByteWriter};
use crate::timestamp::Tree;

/// The magic bytes a timestamp file starts with.
///
/// The leading and trailing null bytes make the file clearly binary while
/// keeping the protocol name recognizable in hex dumps:
///
/// ```text
/// 00 4f 70 65 6e 54 69 6d 65 73 74 61 6d 70 73 00  |.OpenTimestamps.|
/// ```
pub const HEADER_MAGIC: &[u8; 16] = b"\x00OpenTimestamps\x00";

/// Version byte of nonce-less legacy files.
pub const VERSION_LEGACY: u8 = 0x00;
/// Version byte of nonce-extended files.
pub const VERSION_NONCED: u8 = 0x01;

/// Length of the privacy nonce this implementation generates.
pub const NONCE_SIZE: usize = 16;

/// Largest nonce length accepted on read.
const MAX_NONCE_LEN: usize = 64;

/// A standalone `.ots` timestamp file.
///
/// Binds an optional privacy nonce to a proof tree. The document itself is
/// not referenced; the commitment is reconstructed as `nonce ‖ digest`
/// (or the bare digest for legacy files) when the document is presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedTimestampFile {
    version: u8,
    nonce: Option<Vec<u8>>,
    tree: Tree,
}

impl DetachedTimestampFile {
    /// Creates a nonce-extended (version 1) file.
    #[must_use]
    pub fn new_nonced(nonce: [u8; NONCE_SIZE], tree: Tree) -> Self {
        Self {
            version: VERSION_NONCED,
            nonce: Some(nonce.to_vec()),
            tree,
        }
    }

    /// Creates a legacy (version 0, nonce-less) file.
    #[must_use]
    pub const fn new_legacy(tree: Tree) -> Self {
        Self {
            version: VERSION_LEGACY,
            nonce: None,
            tree,
        }
    }

    /// The envelope version byte.
    #[must_use]
    pub const fn version(&self) -> u8 {
        self.version
    }

    /// The stored privacy nonce, when the file carries one.
    #[must_use]
    pub fn nonce(&self) -> Option<&[u8]> {
        self.nonce.as_deref()
    }

    /// The proof tree.
    #[must_use]
    pub const fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Mutable access to the proof tree (used by upgrade).
    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    /// Consumes the file, returning its tree.
    #[must_use]
    pub fn into_tree(self) -> Tree {
        self.tree
    }

    /// Reconstructs the leaf commitment for a document digest: the stored
    /// nonce followed by the digest, or the bare digest for legacy files.
    #[must_use]
    pub fn commitment_for(&self, digest: &[u8]) -> Vec<u8> {
        match &self.nonce {
            Some(nonce) => {
                let mut commitment = Vec::with_capacity(nonce.len() + digest.len());
                commitment.extend_from_slice(nonce);
                commitment.extend_from_slice(digest);
                commitment
            }
            None => digest.to_vec(),
        }
    }

    /// Serializes the envelope and tree into `writer`.
    pub fn serialize(&self, writer: &mut ByteWriter) {
        writer.write_bytes(HEADER_MAGIC);
        writer.write_u8(self.version);
        if let Some(nonce) = &self.nonce {
            #[allow(clippy::cast_possible_truncation)]
            writer.write_u8(nonce.len() as u8);
            writer.write_bytes(nonce);
        }
        serialize_tree(&self.tree, writer);
    }

    /// Serializes to owned bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.serialize(&mut writer);
        writer.into_bytes()
    }

    /// Deserializes an envelope starting at the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::BadMagic`] when the magic does not match,
    /// [`CodecError::UnknownVersion`] for versions outside `{0, 1}`, and
    /// any tree codec error thereafter.
    pub fn deserialize(reader: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let magic = reader.read_bytes(HEADER_MAGIC.len())?;
        if magic != HEADER_MAGIC {
            return Err(CodecError::BadMagic);
        }
        let version = reader.read_u8()?;
        let nonce = match version {
            VERSION_LEGACY => None,
            VERSION_NONCED => {
                let len = usize::from(reader.read_u8()?);
                if len == 0 {
                    return Err(CodecError::EmptyBody { context: "nonce" });
                }
                if len > MAX_NONCE_LEN {
                    return Err(CodecError::BodyTooLong {
                        len: len as u64,
                        max: MAX_NONCE_LEN,
                    });
                }
                Some(reader.read_bytes(len)?.to_vec())
            }
            other => return Err(CodecError::UnknownVersion { version: other }),
        };
        let tree = deserialize_tree(reader)?;
        Ok(Self {
            version,
            nonce,
            tree,
        })
    }

    /// Deserializes a file that must span `bytes` exactly.
    ///
    /// # Errors
    ///
    /// As [`Self::deserialize`], plus [`CodecError::TrailingBytes`] for
    /// input past the tree terminator.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut reader = ByteReader::new(bytes);
        let file = Self::deserialize(&mut reader)?;
        if !reader.eof() {
            return Err(CodecError::TrailingBytes {
                context: "timestamp file",
            });
        }
        Ok(file)
    }
}

/// Joins document bytes and an envelope into an attached timestamp file.
#[must_use]
pub fn attach(document: &[u8], file: &DetachedTimestampFile) -> Vec<u8> {
    let envelope = file.to_bytes();
    let mut out = Vec::with_capacity(document.len() + envelope.len());
    out.extend_from_slice(document);
    out.extend_from_slice(&envelope);
    out
}

/// Splits an attached timestamp file into document bytes and envelope bytes.
///
/// The split point is the last occurrence of the header magic, so documents
/// that themselves embed the magic still split correctly as long as the
/// envelope is the final element.
///
/// # Errors
///
/// Returns [`CodecError::BadMagic`] when no magic is present.
pub fn split_attached(bytes: &[u8]) -> Result<(&[u8], &[u8]), CodecError> {
    let at = rfind_subslice(bytes, HEADER_MAGIC).ok_or(CodecError::BadMagic)?;
    Ok((&bytes[..at], &bytes[at..]))
}

fn rfind_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .rev()
        .find(|&i| &haystack[i..i + needle.len()] == needle)
}
