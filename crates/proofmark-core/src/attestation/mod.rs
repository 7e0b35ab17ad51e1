//! Attestations: claims binding a committed message to an external anchor.
//!
//! Commitment operations only prove before/after relationships between
//! messages; an attestation ties an evaluated message to something with a
//! clock — a blockchain block header, an on-chain transaction, or a calendar
//! server's promise to anchor the commitment later.
//!
//! On the wire every attestation is a distinguishing tag byte followed by a
//! varuint length-prefixed body, so readers can skip variants they do not
//! understand.

use std::fmt;

use crate::codec::{CodecError, MAX_VARBYTES_LEN};
use crate::ser::{ByteReader, ByteWriter};

mod verdict;


pub use verdict::{AttestationVerdict, FailureReason};

/// Wire tag for a Bitcoin block-header attestation.
pub const TAG_BITCOIN: u8 = 0x08;
/// Wire tag for a pending (calendar) attestation.
pub const TAG_PENDING: u8 = 0x09;
/// Wire tag for an Ethereum transaction attestation.
pub const TAG_ETHEREUM: u8 = 0x20;
/// Wire tag for a Litecoin block-header attestation.
pub const TAG_LITECOIN: u8 = 0x30;

/// Maximum accepted length for a pending attestation's calendar URI.
pub const MAX_URI_LEN: usize = 1000;

/// Blockchains an attestation can anchor to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    /// Bitcoin main chain.
    Bitcoin,
    /// Litecoin main chain.
    Litecoin,
    /// Ethereum main chain.
    Ethereum,
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bitcoin => f.write_str("bitcoin"),
            Self::Litecoin => f.write_str("litecoin"),
            Self::Ethereum => f.write_str("ethereum"),
        }
    }
}

/// A time attestation in a timestamp proof.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Attestation {
    /// The evaluated message appears in the Bitcoin block at `height`.
    Bitcoin {
        /// Block height on the Bitcoin main chain.
        height: u64,
    },

    /// The evaluated message appears in the Litecoin block at `height`.
    Litecoin {
        /// Block height on the Litecoin main chain.
        height: u64,
    },

    /// The evaluated message is embedded in an Ethereum transaction's input.
    Ethereum {
        /// Transaction hash.
        tx_hash: [u8; 32],
        /// Block number the transaction was mined in.
        block_number: u64,
    },

    /// A calendar has accepted the commitment and promises a later anchor.
    ///
    /// Not trust-bearing on its own; the URI is where an upgraded subtree
    /// can be fetched once the calendar has anchored.
    Pending {
        /// Calendar-specific upgrade URI.
        uri: String,
    },
}

impl Attestation {
    /// Wire tag of this attestation.
    #[must_use]
    pub const fn tag(&self) -> u8 {
        match self {
            Self::Bitcoin { .. } => TAG_BITCOIN,
            Self::Litecoin { .. } => TAG_LITECOIN,
            Self::Ethereum { .. } => TAG_ETHEREUM,
            Self::Pending { .. } => TAG_PENDING,
        }
    }

    /// Returns true when `tag` names a variant this reader understands.
    #[must_use]
    pub const fn known_tag(tag: u8) -> bool {
        matches!(tag, TAG_BITCOIN | TAG_LITECOIN | TAG_ETHEREUM | TAG_PENDING)
    }

    /// The chain this attestation anchors to, if any.
    #[must_use]
    pub const fn chain(&self) -> Option<Chain> {
        match self {
            Self::Bitcoin { .. } => Some(Chain::Bitcoin),
            Self::Litecoin { .. } => Some(Chain::Litecoin),
            Self::Ethereum { .. } => Some(Chain::Ethereum),
            Self::Pending { .. } => None,
        }
    }

    /// Returns true for the pending (calendar promise) variant.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// Encodes the attestation: tag byte, varuint body length, body.
    pub fn encode(&self, writer: &mut ByteWriter) {
        writer.write_u8(self.tag());
        let mut body = ByteWriter::new();
        match self {
            Self::Bitcoin { height } | Self::Litecoin { height } => {
                body.write_varuint(*height);
            }
            Self::Ethereum {
                tx_hash,
                block_number,
            } => {
                body.write_bytes(tx_hash);
                body.write_varuint(*block_number);
            }
            Self::Pending { uri } => body.write_bytes(uri.as_bytes()),
        }
        writer.write_varuint(body.len() as u64);
        writer.write_bytes(body.as_bytes());
    }

    /// The attestation's full wire encoding as owned bytes.
    ///
    /// Used as the deduplication and verdict-cache key.
    #[must_use]
    pub fn encoded(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.encode(&mut writer);
        writer.into_bytes()
    }

    /// Decodes an attestation starting at its tag byte.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnknownAttestationTag`] for tags outside the
    /// known set; the tree codec handles the skip path for those before
    /// calling here.
    pub fn decode(reader: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let tag = reader.read_u8()?;
        Self::decode_tagged(tag, reader)
    }

    /// Decodes the length-prefixed body of an attestation whose tag byte has
    /// already been consumed.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnknownAttestationTag`] for unknown tags,
    /// [`CodecError::BodyTooLong`] for oversized bodies, and
    /// [`CodecError::TrailingBytes`] when a known body is longer than its
    /// variant consumes.
    pub fn decode_tagged(tag: u8, reader: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        if !Self::known_tag(tag) {
            return Err(CodecError::UnknownAttestationTag { tag });
        }
        let len = reader.read_varuint()?;
        if len > MAX_VARBYTES_LEN as u64 {
            return Err(CodecError::BodyTooLong {
                len,
                max: MAX_VARBYTES_LEN,
            });
        }
        #[allow(clippy::cast_possible_truncation)]
        let body = reader.read_bytes(len as usize)?;
        let mut body = ByteReader::new(body);

        let attestation = match tag {
            TAG_BITCOIN => Self::Bitcoin {
                height: body.read_varuint()?,
            },
            TAG_LITECOIN => Self::Litecoin {
                height: body.read_varuint()?,
            },
            TAG_ETHEREUM => {
                // The transaction hash is 32 raw bytes, no inner length
                // prefix.
                let mut tx_hash = [0u8; 32];
                tx_hash.copy_from_slice(body.read_bytes(32)?);
                Self::Ethereum {
                    tx_hash,
                    block_number: body.read_varuint()?,
                }
            }
            TAG_PENDING => {
                let raw = body.read_bytes(body.remaining())?;
                Self::Pending {
                    uri: parse_uri(raw)?,
                }
            }
            _ => unreachable!("known_tag checked above"),
        };

        if !body.eof() {
            return Err(CodecError::TrailingBytes {
                context: "attestation body",
            });
        }
        Ok(attestation)
    }
}

impl fmt::Display for Attestation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bitcoin { height } => write!(f, "bitcoin block {height}"),
            Self::Litecoin { height } => write!(f, "litecoin block {height}"),
            Self::Ethereum {
                tx_hash,
                block_number,
            } => write!(
                f,
                "ethereum tx 0x{} in block {block_number}",
                hex::encode(tx_hash)
            ),
            Self::Pending { uri } => write!(f, "pending: {uri}"),
        }
    }
}

/// Validates and decodes a calendar URI from raw body bytes.
fn parse_uri(raw: &[u8]) -> Result<String, CodecError> {
    if raw.len() > MAX_URI_LEN {
        return Err(CodecError::BadUri {
            detail: format!("uri length {} exceeds {MAX_URI_LEN}", raw.len()),
        });
    }
    let uri = std::str::from_utf8(raw).map_err(|_| CodecError::BadUri {
        detail: "uri is not valid utf-8".to_string(),
    })?;
    if uri.is_empty() {
        return Err(CodecError::BadUri {
            detail: "empty uri".to_string(),
        });
    }
    let ok = uri.bytes().all(|b| {
        b.is_ascii_alphanumeric() || matches!(b, b'/' | b':' | b'.' | b'-' | b'_' | b'%' | b'~')
    });
    if !ok {
        return Err(CodecError::BadUri {
            detail: format!("uri contains forbidden characters: {uri}"),
        });
    }
    Ok(uri.to_string())
}
