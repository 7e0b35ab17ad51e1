//! Upgrading pending attestations into chain-anchored subtrees.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::adapter::{Clock, HttpClient};
use crate::attestation::Attestation;
use crate::op::OpError;
use crate::timestamp::Tree;

use super::fetch_subtree;

/// A pending attestation located in a tree, with the evaluated message at
/// its node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAttestation {
    /// The calendar upgrade URI.
    pub uri: String,
    /// The evaluated message the calendar committed to.
    pub message: Vec<u8>,
}

/// Enumerates every pending attestation with its evaluated message.
///
/// # Errors
///
/// Fails with the operation error when a path cannot be evaluated.
pub fn find_pending(tree: &Tree, msg: &[u8]) -> Result<Vec<PendingAttestation>, OpError> {
    let mut out = Vec::new();
    collect_pending(tree, msg, &mut out)?;
    Ok(out)
}

fn collect_pending(
    node: &Tree,
    msg: &[u8],
    out: &mut Vec<PendingAttestation>,
) -> Result<(), OpError> {
    for attestation in &node.attestations {
        if let Attestation::Pending { uri } = attestation {
            out.push(PendingAttestation {
                uri: uri.clone(),
                message: msg.to_vec(),
            });
        }
    }
    for (op, child) in &node.ops {
        let next = op.apply(msg)?;
        collect_pending(child, &next, out)?;
    }
    Ok(())
}

/// Per-URI attempt bookkeeping so repeated upgrades respect a cooldown.
pub struct UpgradeTracker {
    cooldown_secs: u64,
    clock: Arc<dyn Clock>,
    last_attempt: HashMap<String, u64>,
}

impl UpgradeTracker {
    /// Creates a tracker with the given cooldown.
    #[must_use]
    pub fn new(cooldown_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            cooldown_secs,
            clock,
            last_attempt: HashMap::new(),
        }
    }

    /// Whether `uri` is currently outside its cooldown window.
    #[must_use]
    pub fn should_attempt(&self, uri: &str) -> bool {
        self.last_attempt.get(uri).map_or(true, |last| {
            self.clock.now().saturating_sub(*last) >= self.cooldown_secs
        })
    }

    /// Records an attempt against `uri` at the current time.
    pub fn record_attempt(&mut self, uri: &str) {
        self.last_attempt.insert(uri.to_string(), self.clock.now());
    }
}

/// Result of one upgrade pass over a tree.
#[derive(Debug, Clone, Default)]
pub struct UpgradeOutcome {
    /// Pending attestations replaced by chain-anchored subtrees.
    pub upgraded: usize,
    /// Pending attestations that remain (cooldown, still unanchored, or
    /// fetch failure).
    pub still_pending: usize,
    /// Per-URI fetch or decode failures, rendered for reporting.
    pub failures: Vec<(String, String)>,
}

impl UpgradeOutcome {
    /// Whether anything was upgraded.
    #[must_use]
    pub const fn any_upgraded(&self) -> bool {
        self.upgraded > 0
    }
}

/// Attempts to upgrade every pending attestation in `tree`.
///
/// For each pending attestation outside its cooldown, the upgrade URI is
/// fetched. A response containing a chain-anchored attestation replaces the
/// pending attestation in place (the response subtree is merged at the same
/// node). A pending-only response leaves the tree untouched and resets the
/// cooldown. Failures are recorded per URI and never abort sibling
/// upgrades.
pub fn upgrade_tree(
    tree: &mut Tree,
    http: &Arc<dyn HttpClient>,
    timeout: Duration,
    tracker: &mut UpgradeTracker,
) -> UpgradeOutcome {
    let mut outcome = UpgradeOutcome::default();
    upgrade_node(tree, http, timeout, tracker, &mut outcome);
    outcome
}

fn upgrade_node(
    node: &mut Tree,
    http: &Arc<dyn HttpClient>,
    timeout: Duration,
    tracker: &mut UpgradeTracker,
    outcome: &mut UpgradeOutcome,
) {
    let mut idx = 0;
    while idx < node.attestations.len() {
        let uri = match &node.attestations[idx] {
            Attestation::Pending { uri } => uri.clone(),
            _ => {
                idx += 1;
                continue;
            }
        };
        if !tracker.should_attempt(&uri) {
            tracing::debug!(uri = %uri, "upgrade cooldown active");
            outcome.still_pending += 1;
            idx += 1;
            continue;
        }
        tracker.record_attempt(&uri);
        match fetch_subtree(http, &uri, timeout) {
            Ok(subtree) if subtree.has_anchored() => {
                tracing::info!(uri = %uri, "pending attestation upgraded");
                node.attestations.remove(idx);
                node.merge(subtree);
                outcome.upgraded += 1;
                // The removal shifted the list; stay at this index.
            }
            Ok(_) => {
                tracing::debug!(uri = %uri, "calendar has not anchored yet");
                outcome.still_pending += 1;
                idx += 1;
            }
            Err(err) => {
                tracing::warn!(uri = %uri, error = %err, "upgrade fetch failed");
                outcome.failures.push((uri, err.to_string()));
                outcome.still_pending += 1;
                idx += 1;
            }
        }
    }
    for (_, child) in &mut node.ops {
        upgrade_node(child, http, timeout, tracker, outcome);
    }
}
