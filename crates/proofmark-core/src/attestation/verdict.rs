//! Per-attestation verification verdicts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a reachable anchor failed to verify the commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
#[non_exhaustive]
pub enum FailureReason {
    /// The anchor was fetched but the commitment is not embedded in it.
    CommitmentNotFound {
        /// Identifier of the anchor that was searched.
        anchor_id: String,
    },

    /// The anchor exists but in a different block than attested.
    WrongBlock {
        /// Block number the attestation names.
        expected: u64,
        /// Block number the anchor was actually found in.
        actual: u64,
    },

    /// The remote endpoint answered with a non-success status.
    HttpStatus {
        /// HTTP status code.
        status: u16,
    },

    /// The remote endpoint answered with a body this client cannot parse.
    MalformedResponse {
        /// Parse failure detail.
        detail: String,
    },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommitmentNotFound { anchor_id } => {
                write!(f, "commitment not found in {anchor_id}")
            }
            Self::WrongBlock { expected, actual } => {
                write!(f, "anchor in block {actual}, attestation names {expected}")
            }
            Self::HttpStatus { status } => write!(f, "endpoint returned status {status}"),
            Self::MalformedResponse { detail } => write!(f, "malformed response: {detail}"),
        }
    }
}

/// Outcome of verifying one (evaluated message, attestation) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
#[non_exhaustive]
pub enum AttestationVerdict {
    /// The commitment was found in the anchor.
    Verified {
        /// Anchor timestamp (unix seconds) when the chain exposes one.
        anchor_time: Option<u64>,
        /// Identifier of the verified anchor, e.g. `bitcoin:800000`.
        anchor_id: String,
    },

    /// The attestation is a calendar promise; upgrade from `upgrade_hint`.
    Pending {
        /// URI the upgraded subtree can be fetched from.
        upgrade_hint: String,
    },

    /// The anchor was reachable but does not back the commitment.
    Failed {
        /// What went wrong.
        reason: FailureReason,
    },

    /// The anchor could not be reached; the caller may retry.
    Unknown {
        /// Transport-level detail.
        reason: String,
    },
}

impl AttestationVerdict {
    /// Returns true for the `Verified` variant.
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }

    /// Returns true for the `Unknown` (retryable) variant.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }

    /// Anchor time of a verified verdict, if present.
    #[must_use]
    pub const fn anchor_time(&self) -> Option<u64> {
        match self {
            Self::Verified { anchor_time, .. } => *anchor_time,
            _ => None,
        }
    }
}

impl fmt::Display for AttestationVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verified {
                anchor_id,
                anchor_time: Some(time),
            } => write!(f, "verified against {anchor_id} at {time}"),
            Self::Verified { anchor_id, .. } => write!(f, "verified against {anchor_id}"),
            Self::Pending { upgrade_hint } => write!(f, "pending upgrade from {upgrade_hint}"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
            Self::Unknown { reason } => write!(f, "unknown: {reason}"),
        }
    }
}
