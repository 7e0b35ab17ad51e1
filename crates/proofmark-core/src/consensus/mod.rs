//! Consensus scoring across attestation verdicts.
//!
//! Every verified anchor contributes a chain-specific weight; the score is
//! the verified share of all decided (non-`Unknown`) weight. The security
//! level additionally looks at how many distinct chains verified, and the
//! time-window check bounds the drift between verified anchor timestamps.

use std::fmt;

use serde::Serialize;

use crate::attestation::{Attestation, AttestationVerdict, Chain};


/// Weight of a verified Bitcoin anchor.
pub const WEIGHT_BITCOIN: f64 = 1.0;
/// Weight of a verified Litecoin anchor.
pub const WEIGHT_LITECOIN: f64 = 0.8;
/// Weight of a verified Ethereum anchor.
pub const WEIGHT_ETHEREUM: f64 = 0.7;
/// Weight of a calendar promise.
pub const WEIGHT_PENDING: f64 = 0.1;

/// Maximum anchor-time drift still considered consistent, seconds.
pub const MAX_DRIFT_CONSISTENT_SECS: u64 = 7_200;
/// Maximum anchor-time drift still considered moderately consistent.
pub const MAX_DRIFT_MODERATE_SECS: u64 = 14_400;

/// Weight an attestation contributes to the consensus denominator.
#[must_use]
pub const fn weight(attestation: &Attestation) -> f64 {
    match attestation.chain() {
        Some(Chain::Bitcoin) => WEIGHT_BITCOIN,
        Some(Chain::Litecoin) => WEIGHT_LITECOIN,
        Some(Chain::Ethereum) => WEIGHT_ETHEREUM,
        None => WEIGHT_PENDING,
    }
}

/// Overall security level of a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityLevel {
    /// At least two distinct chains verified and score ≥ 0.8.
    Strong,
    /// At least one chain verified and score ≥ 0.6.
    Moderate,
    /// Score ≥ 0.3.
    Weak,
    /// Anything less.
    None,
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strong => f.write_str("strong"),
            Self::Moderate => f.write_str("moderate"),
            Self::Weak => f.write_str("weak"),
            Self::None => f.write_str("none"),
        }
    }
}

/// Consistency of the verified anchors' timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeConsistency {
    /// Max pairwise drift within two hours.
    Consistent,
    /// Max pairwise drift within four hours.
    ModeratelyConsistent,
    /// Anything wider.
    Inconsistent,
}

/// Aggregated consensus verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsensusOutcome {
    /// Verified share of decided weight, in `0.0..=1.0`.
    pub score: f64,
    /// Security level derived from score and chain diversity.
    pub security_level: SecurityLevel,
    /// Number of distinct chains with a verified anchor.
    pub verified_chains: usize,
    /// Whether the score and chain requirements for validity are met.
    pub meets_threshold: bool,
    /// Anchor-time consistency, when two or more verified anchors carry
    /// timestamps.
    pub time_consistency: Option<TimeConsistency>,
}

/// Scores a list of per-attestation verdicts.
///
/// `Unknown` verdicts are excluded from the denominator entirely: an
/// unreachable anchor neither helps nor hurts. `meets_threshold` requires
/// at least one verified chain anchor and `score >= min_score`.
#[must_use]
pub fn evaluate_consensus(
    pairs: &[(Attestation, AttestationVerdict)],
    min_score: f64,
) -> ConsensusOutcome {
    let mut verified_weight = 0.0_f64;
    let mut decided_weight = 0.0_f64;
    let mut chains: Vec<Chain> = Vec::new();
    let mut anchor_times: Vec<u64> = Vec::new();

    for (attestation, verdict) in pairs {
        if verdict.is_unknown() {
            continue;
        }
        let w = weight(attestation);
        decided_weight += w;
        if verdict.is_verified() {
            verified_weight += w;
            if let Some(chain) = attestation.chain() {
                if !chains.contains(&chain) {
                    chains.push(chain);
                }
            }
            if let Some(time) = verdict.anchor_time() {
                anchor_times.push(time);
            }
        }
    }

    let score = if decided_weight > 0.0 {
        verified_weight / decided_weight
    } else {
        0.0
    };

    let security_level = if chains.len() >= 2 && score >= 0.8 {
        SecurityLevel::Strong
    } else if !chains.is_empty() && score >= 0.6 {
        SecurityLevel::Moderate
    } else if score >= 0.3 {
        SecurityLevel::Weak
    } else {
        SecurityLevel::None
    };

    ConsensusOutcome {
        score,
        security_level,
        verified_chains: chains.len(),
        meets_threshold: !chains.is_empty() && score >= min_score,
        time_consistency: time_consistency(&anchor_times),
    }
}

/// Classifies the max pairwise drift of verified anchor times.
fn time_consistency(anchor_times: &[u64]) -> Option<TimeConsistency> {
    if anchor_times.len() < 2 {
        return None;
    }
    let min = *anchor_times.iter().min().expect("nonempty");
    let max = *anchor_times.iter().max().expect("nonempty");
    let drift = max - min;
    Some(if drift <= MAX_DRIFT_CONSISTENT_SECS {
        TimeConsistency::Consistent
    } else if drift <= MAX_DRIFT_MODERATE_SECS {
        TimeConsistency::ModeratelyConsistent
    } else {
        TimeConsistency::Inconsistent
    })
}
