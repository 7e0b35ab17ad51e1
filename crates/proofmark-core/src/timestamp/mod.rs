//! The timestamp proof tree and its commitment binding.
//!
//! A [`Tree`] node holds the attestations that apply at its message and an
//! ordered list of `(operation, child)` pairs; a child's message is derived
//! by applying the operation to the parent's message, so messages are never
//! stored below the root. [`Timestamp`] binds a tree to its leaf commitment.
//!
//! # Invariants
//!
//! - Attestation lists are deduplicated by wire encoding.
//! - `ops` preserve insertion order; merging matches children by byte-equal
//!   operation encoding.
//! - Trees are finite and owned: merging moves fresh nodes in, so no cycles
//!   or sharing can arise.

use thiserror::Error;

use crate::attestation::Attestation;
use crate::op::Op;

mod evaluate;


pub use evaluate::{evaluate, EvaluatedAttestation};

/// One node of a timestamp proof tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    /// Attestations applying at this node's message.
    pub attestations: Vec<Attestation>,
    /// Ordered `(operation, child)` pairs.
    pub ops: Vec<(Op, Tree)>,
}

impl Tree {
    /// Creates an empty node.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            attestations: Vec::new(),
            ops: Vec::new(),
        }
    }

    /// Returns true when the node has no attestations and no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attestations.is_empty() && self.ops.is_empty()
    }

    /// Adds an attestation unless an identical one is already present.
    ///
    /// Returns true when the attestation was inserted. Structural equality
    /// coincides with wire-encoding equality because the codec is canonical.
    pub fn add_attestation(&mut self, attestation: Attestation) -> bool {
        if self.attestations.contains(&attestation) {
            return false;
        }
        self.attestations.push(attestation);
        true
    }

    /// Merges `other` into `self`; both trees must be rooted at the same
    /// message (the caller's responsibility — see [`Timestamp::merge`]).
    ///
    /// Attestation sets are unioned with deduplication; children whose
    /// operations encode identically are merged recursively, all other
    /// children are appended in `other`'s order.
    pub fn merge(&mut self, other: Self) {
        for attestation in other.attestations {
            self.add_attestation(attestation);
        }
        for (op, child) in other.ops {
            if let Some((_, existing)) = self.ops.iter_mut().find(|(o, _)| *o == op) {
                existing.merge(child);
            } else {
                self.ops.push((op, child));
            }
        }
    }

    /// Total number of nodes, this one included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.ops.iter().map(|(_, child)| child.node_count()).sum::<usize>()
    }

    /// Total attestations in the subtree.
    #[must_use]
    pub fn attestation_count(&self) -> usize {
        self.attestations.len()
            + self
                .ops
                .iter()
                .map(|(_, child)| child.attestation_count())
                .sum::<usize>()
    }

    /// Number of pending attestations in the subtree.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.attestations.iter().filter(|a| a.is_pending()).count()
            + self
                .ops
                .iter()
                .map(|(_, child)| child.pending_count())
                .sum::<usize>()
    }

    /// Returns true when any pending attestation remains in the subtree.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.attestations.iter().any(Attestation::is_pending)
            || self.ops.iter().any(|(_, child)| child.has_pending())
    }

    /// Returns true when the subtree holds at least one chain-anchored
    /// (non-pending) attestation.
    #[must_use]
    pub fn has_anchored(&self) -> bool {
        self.attestations.iter().any(|a| !a.is_pending())
            || self.ops.iter().any(|(_, child)| child.has_anchored())
    }
}

/// Error from merging two timestamps with different commitments.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot merge: root messages differ ({ours} != {theirs})")]
pub struct MergeError {
    /// Hex of the receiving timestamp's commitment.
    pub ours: String,
    /// Hex of the incoming timestamp's commitment.
    pub theirs: String,
}

/// A proof tree bound to its leaf commitment.
///
/// The commitment is an in-memory binding only; the wire format never
/// carries it. Loading a detached file re-derives the commitment from the
/// document digest and stored nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    commitment: Vec<u8>,
    root: Tree,
}

impl Timestamp {
    /// Creates a fresh timestamp: the given commitment with an empty tree.
    #[must_use]
    pub const fn new(commitment: Vec<u8>) -> Self {
        Self {
            commitment,
            root: Tree::new(),
        }
    }

    /// Binds an existing tree to a commitment.
    #[must_use]
    pub const fn from_parts(commitment: Vec<u8>, root: Tree) -> Self {
        Self { commitment, root }
    }

    /// The leaf commitment this proof is rooted at.
    #[must_use]
    pub fn commitment(&self) -> &[u8] {
        &self.commitment
    }

    /// The root tree node.
    #[must_use]
    pub const fn root(&self) -> &Tree {
        &self.root
    }

    /// Mutable access to the root tree node.
    pub fn root_mut(&mut self) -> &mut Tree {
        &mut self.root
    }

    /// Consumes the timestamp, returning its tree.
    #[must_use]
    pub fn into_root(self) -> Tree {
        self.root
    }

    /// Merges another timestamp rooted at the same commitment.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError`] when the commitments differ.
    pub fn merge(&mut self, other: Self) -> Result<(), MergeError> {
        if self.commitment != other.commitment {
            return Err(MergeError {
                ours: hex::encode(&self.commitment),
                theirs: hex::encode(&other.commitment),
            });
        }
        self.root.merge(other.root);
        Ok(())
    }

    /// Evaluates every Merkle path, yielding `(message, attestation)` pairs.
    ///
    /// # Errors
    ///
    /// Fails with the first operation evaluation error encountered.
    pub fn evaluate(&self) -> Result<Vec<EvaluatedAttestation>, crate::op::OpError> {
        evaluate(&self.root, &self.commitment)
    }
}
