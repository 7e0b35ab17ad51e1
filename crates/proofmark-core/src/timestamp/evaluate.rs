//! Merkle-path evaluation: rewriting the leaf message toward each anchor.

use crate::attestation::Attestation;
use crate::op::OpError;

use super::Tree;

/// One attestation paired with the message it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatedAttestation {
    /// The evaluated message at the attestation's node.
    pub message: Vec<u8>,
    /// The attestation found there.
    pub attestation: Attestation,
}

/// Walks `tree` starting from `msg`, emitting every attestation with its
/// evaluated message.
///
/// The walk is deterministic: attestations at a node are emitted before its
/// children, children in insertion order. The tree is never mutated.
///
/// # Errors
///
/// Fails with the operation's error when a path cannot be evaluated (for
/// example SUBSTR beyond the message length); this is fatal to the whole
/// evaluation, mirroring how a single undecodable path invalidates a proof.
pub fn evaluate(tree: &Tree, msg: &[u8]) -> Result<Vec<EvaluatedAttestation>, OpError> {
    let mut out = Vec::with_capacity(tree.attestation_count());
    walk(tree, msg, &mut out)?;
    Ok(out)
}

fn walk(node: &Tree, msg: &[u8], out: &mut Vec<EvaluatedAttestation>) -> Result<(), OpError> {
    for attestation in &node.attestations {
        out.push(EvaluatedAttestation {
            message: msg.to_vec(),
            attestation: attestation.clone(),
        });
    }
    for (op, child) in &node.ops {
        let next = op.apply(msg)?;
        walk(child, &next, out)?;
    }
    Ok(())
}
