//! Attestation verification: from a proof and a commitment to a structured
//! verdict.
//!
//! Verification is strictly staged:
//!
//! 1. The presented commitment is compared against the proof's bound
//!    commitment (constant time). A mismatch short-circuits before any
//!    network I/O.
//! 2. Every Merkle path is evaluated to its `(message, attestation)` pair.
//! 3. Each pair is verified through the chain-specific strategy, with
//!    verdicts cached by `(attestation encoding, message)` so repeated
//!    nodes are fetched once.
//! 4. The consensus scorer turns the verdict list into the overall result.
//!
//! Anchor failures never raise errors; they are folded into the report so
//! partial success stays representable.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use subtle::ConstantTimeEq;

use crate::attestation::{Attestation, AttestationVerdict};
use crate::consensus::{evaluate_consensus, SecurityLevel, TimeConsistency};
use crate::timestamp::Timestamp;

mod bitcoin;
mod context;
mod ethereum;


pub use context::VerifyContext;

/// A fatal verification problem (as opposed to a per-anchor failure).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
#[non_exhaustive]
pub enum VerifyIssue {
    /// The presented commitment does not match the proof's commitment.
    CommitmentMismatch,

    /// A Merkle path could not be evaluated.
    Evaluation {
        /// The operation error, rendered.
        detail: String,
    },
}

impl fmt::Display for VerifyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommitmentMismatch => f.write_str("commitment mismatch"),
            Self::Evaluation { detail } => write!(f, "evaluation failed: {detail}"),
        }
    }
}

/// One verified pair in the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttestationResult {
    /// Human-readable attestation description.
    pub attestation: String,
    /// Hex of the evaluated message the attestation applies to.
    pub message: String,
    /// The verdict.
    pub verdict: AttestationVerdict,
}

/// Structured result of verifying a proof.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationReport {
    /// The bottom line: evaluation clean, at least one chain anchor
    /// verified, and the consensus score at or above the configured
    /// minimum.
    pub overall_valid: bool,
    /// Consensus score in `0.0..=1.0`.
    pub score: f64,
    /// Security level.
    pub security_level: SecurityLevel,
    /// Distinct chains with a verified anchor.
    pub verified_chains: usize,
    /// Anchor-time agreement, when measurable.
    pub time_consistency: Option<TimeConsistency>,
    /// Per-attestation outcomes in evaluation order.
    pub attestations: Vec<AttestationResult>,
    /// Fatal problems; empty for a clean run.
    pub errors: Vec<VerifyIssue>,
    /// Human-oriented follow-up suggestions.
    pub recommendations: Vec<String>,
}

impl VerificationReport {
    fn invalid(issue: VerifyIssue, recommendation: impl Into<String>) -> Self {
        Self {
            overall_valid: false,
            score: 0.0,
            security_level: SecurityLevel::None,
            verified_chains: 0,
            time_consistency: None,
            attestations: Vec::new(),
            errors: vec![issue],
            recommendations: vec![recommendation.into()],
        }
    }
}

/// Verifies `timestamp` against a presented commitment.
///
/// Never fails: anchor and transport problems are captured inside the
/// report. See the module docs for the staging.
#[must_use]
pub fn verify_timestamp(
    timestamp: &Timestamp,
    commitment: &[u8],
    ctx: &VerifyContext,
) -> VerificationReport {
    // Stage 1: commitment binding, before any I/O.
    if !bool::from(commitment.ct_eq(timestamp.commitment())) {
        tracing::warn!("presented commitment does not match proof");
        return VerificationReport::invalid(
            VerifyIssue::CommitmentMismatch,
            "the presented document is not the one this proof was made for",
        );
    }

    // Stage 2: Merkle evaluation.
    let pairs = match timestamp.evaluate() {
        Ok(pairs) => pairs,
        Err(err) => {
            return VerificationReport::invalid(
                VerifyIssue::Evaluation {
                    detail: err.to_string(),
                },
                "the proof file is damaged; re-download or re-stamp it",
            );
        }
    };

    // Stage 3: per-pair verification with verdict deduplication.
    let mut verdict_cache: HashMap<(Vec<u8>, Vec<u8>), AttestationVerdict> = HashMap::new();
    let mut results = Vec::with_capacity(pairs.len());
    let mut scored = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let key = (pair.attestation.encoded(), pair.message.clone());
        let verdict = verdict_cache
            .entry(key)
            .or_insert_with(|| verify_one(&pair.attestation, &pair.message, ctx))
            .clone();
        results.push(AttestationResult {
            attestation: pair.attestation.to_string(),
            message: hex::encode(&pair.message),
            verdict: verdict.clone(),
        });
        scored.push((pair.attestation, verdict));
    }

    // Stage 4: consensus.
    let outcome = evaluate_consensus(&scored, ctx.config().verify.min_score);
    let recommendations = recommend(&scored, &outcome.time_consistency, outcome.meets_threshold);

    tracing::info!(
        valid = outcome.meets_threshold,
        score = outcome.score,
        chains = outcome.verified_chains,
        "verification complete"
    );

    VerificationReport {
        overall_valid: outcome.meets_threshold,
        score: outcome.score,
        security_level: outcome.security_level,
        verified_chains: outcome.verified_chains,
        time_consistency: outcome.time_consistency,
        attestations: results,
        errors: Vec::new(),
        recommendations,
    }
}

/// Dispatches one pair to its chain strategy, consulting the persistent
/// cache for previously verified anchors.
fn verify_one(
    attestation: &Attestation,
    message: &[u8],
    ctx: &VerifyContext,
) -> AttestationVerdict {
    let cache_key = format!(
        "verdict:{}:{}",
        hex::encode(attestation.encoded()),
        hex::encode(message)
    );
    if let Some(cached) = ctx.cache_get(&cache_key) {
        if let Ok(verdict) = serde_json::from_slice::<AttestationVerdict>(&cached) {
            tracing::debug!(attestation = %attestation, "verdict served from cache");
            return verdict;
        }
    }

    let verdict = match attestation {
        Attestation::Bitcoin { height } => bitcoin::verify_bitcoin(message, *height, ctx),
        Attestation::Litecoin { height } => bitcoin::verify_litecoin(message, *height, ctx),
        Attestation::Ethereum {
            tx_hash,
            block_number,
        } => ethereum::verify_ethereum(message, tx_hash, *block_number, ctx),
        Attestation::Pending { uri } => AttestationVerdict::Pending {
            upgrade_hint: uri.clone(),
        },
    };

    // Only verified verdicts are immutable facts worth persisting.
    if verdict.is_verified() {
        if let Ok(serialized) = serde_json::to_vec(&verdict) {
            ctx.cache_put(&cache_key, serialized);
        }
    }
    verdict
}

fn recommend(
    scored: &[(Attestation, AttestationVerdict)],
    time_consistency: &Option<TimeConsistency>,
    valid: bool,
) -> Vec<String> {
    let mut recommendations = Vec::new();
    if scored
        .iter()
        .any(|(attestation, _)| attestation.is_pending())
    {
        recommendations
            .push("pending attestations remain; run upgrade to replace them with chain anchors".to_string());
    }
    if scored.iter().any(|(_, verdict)| verdict.is_unknown()) {
        recommendations
            .push("some anchors were unreachable; verification may improve on retry".to_string());
    }
    if !valid && !scored.iter().any(|(_, verdict)| verdict.is_verified()) {
        recommendations.push("no chain anchor verified the commitment".to_string());
    }
    if matches!(time_consistency, Some(TimeConsistency::Inconsistent)) {
        recommendations
            .push("verified anchors disagree on time by more than four hours".to_string());
    }
    recommendations
}

/// Naive subslice search; inputs are at most a few kilobytes.
pub(crate) fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack
        .windows(needle.len())
        .any(|window| window == needle)
}
