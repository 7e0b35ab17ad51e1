//! Block-header chain verification: Bitcoin (RPC-first) and Litecoin.
//!
//! The full-node path is strict: a `Verified` verdict requires the
//! commitment in a known commitment slot — an OP_RETURN output or the
//! coinbase scriptSig — of the block at the attested height. The explorer
//! fallback keeps the legacy permissive check, a containment scan over the
//! raw serialized block header.

use serde_json::Value;

use crate::adapter::BitcoinRpc;
use crate::attestation::{AttestationVerdict, FailureReason};

use super::{contains_subslice, VerifyContext};

/// OP_RETURN opcode, the first byte of a data-carrier output script.
const OP_RETURN: u8 = 0x6a;

pub(super) fn verify_bitcoin(
    commitment: &[u8],
    height: u64,
    ctx: &VerifyContext,
) -> AttestationVerdict {
    if let Some(rpc) = ctx.rpc() {
        match verify_via_rpc(rpc.as_ref(), commitment, height) {
            Ok(verdict) => return verdict,
            Err(reason) => {
                // Node unreachable: fall back to the explorers rather than
                // giving up on the anchor.
                tracing::warn!(height, reason = %reason, "bitcoin rpc unreachable, trying explorers");
            }
        }
    }
    verify_via_explorers("bitcoin", &ctx.config().bitcoin.explorers, commitment, height, ctx)
}

pub(super) fn verify_litecoin(
    commitment: &[u8],
    height: u64,
    ctx: &VerifyContext,
) -> AttestationVerdict {
    verify_via_explorers(
        "litecoin",
        &ctx.config().litecoin.explorers,
        commitment,
        height,
        ctx,
    )
}

/// Full-node verification. `Err` carries a human-readable reason and means
/// the node could not be consulted at all (retryable).
fn verify_via_rpc(
    rpc: &dyn BitcoinRpc,
    commitment: &[u8],
    height: u64,
) -> Result<AttestationVerdict, String> {
    let anchor_id = format!("bitcoin:{height}");

    let hash = match rpc.get_block_hash(height) {
        Ok(hash) => hash,
        Err(err) if err.is_retryable() => return Err(err.to_string()),
        Err(err) => {
            // The node answered: the height does not exist on its chain.
            tracing::debug!(height, error = %err, "getblockhash rejected height");
            return Ok(AttestationVerdict::Failed {
                reason: FailureReason::CommitmentNotFound { anchor_id },
            });
        }
    };

    let block = match rpc.get_block(&hash, 2) {
        Ok(block) => block,
        Err(err) if err.is_retryable() => return Err(err.to_string()),
        Err(err) => {
            return Ok(AttestationVerdict::Failed {
                reason: FailureReason::MalformedResponse {
                    detail: err.to_string(),
                },
            });
        }
    };

    let commitment_hex = hex::encode(commitment);
    if block_commits(&block, &commitment_hex) {
        Ok(AttestationVerdict::Verified {
            anchor_time: block.get("time").and_then(Value::as_u64),
            anchor_id: format!("bitcoin:{height}:{hash}"),
        })
    } else {
        Ok(AttestationVerdict::Failed {
            reason: FailureReason::CommitmentNotFound { anchor_id },
        })
    }
}

/// Looks for the commitment in a verbose (`verbosity=2`) block: OP_RETURN
/// output scripts and the coinbase scriptSig.
fn block_commits(block: &Value, commitment_hex: &str) -> bool {
    let Some(txs) = block.get("tx").and_then(Value::as_array) else {
        return false;
    };
    for (index, tx) in txs.iter().enumerate() {
        if let Some(vouts) = tx.get("vout").and_then(Value::as_array) {
            for vout in vouts {
                let script = vout
                    .get("scriptPubKey")
                    .and_then(|spk| spk.get("hex"))
                    .and_then(Value::as_str)
                    .unwrap_or("");
                if script_is_op_return(script) && script.contains(commitment_hex) {
                    return true;
                }
            }
        }
        if index == 0 {
            // Coinbase input carries the calendar commitment for
            // merkle-root style anchoring.
            let coinbase = tx
                .get("vin")
                .and_then(Value::as_array)
                .and_then(|vins| vins.first())
                .and_then(|vin| vin.get("coinbase"))
                .and_then(Value::as_str)
                .unwrap_or("");
            if coinbase.contains(commitment_hex) {
                return true;
            }
        }
    }
    false
}

fn script_is_op_return(script_hex: &str) -> bool {
    hex::decode(script_hex)
        .ok()
        .and_then(|script| script.first().copied())
        .map_or(false, |first| first == OP_RETURN)
}

/// Esplora-style explorer fallback shared by Bitcoin and Litecoin.
///
/// Explorers are tried in order; connectivity failures move on to the next
/// one, while an authoritative answer (header fetched) decides the verdict
/// immediately.
fn verify_via_explorers(
    chain: &str,
    explorers: &[String],
    commitment: &[u8],
    height: u64,
    ctx: &VerifyContext,
) -> AttestationVerdict {
    if explorers.is_empty() {
        return AttestationVerdict::Unknown {
            reason: format!("no {chain} explorers configured"),
        };
    }

    let mut last_failure = String::new();
    for base in explorers {
        let base = base.trim_end_matches('/');
        let hash = match fetch_block_hash(chain, base, height, ctx) {
            Ok(hash) => hash,
            Err(reason) => {
                last_failure = reason;
                continue;
            }
        };
        let header_hex = match fetch_header(chain, base, &hash, ctx) {
            Ok(header) => header,
            Err(reason) => {
                last_failure = reason;
                continue;
            }
        };
        let Ok(header) = hex::decode(header_hex.trim()) else {
            return AttestationVerdict::Failed {
                reason: FailureReason::MalformedResponse {
                    detail: format!("{base} returned a non-hex block header"),
                },
            };
        };
        // Legacy permissive check: the commitment anywhere in the raw
        // header bytes.
        if contains_subslice(&header, commitment) {
            return AttestationVerdict::Verified {
                anchor_time: fetch_block_time(base, &hash, ctx),
                anchor_id: format!("{chain}:{height}:{hash}"),
            };
        }
        return AttestationVerdict::Failed {
            reason: FailureReason::CommitmentNotFound {
                anchor_id: format!("{chain}:{height}"),
            },
        };
    }

    AttestationVerdict::Unknown {
        reason: format!("all {chain} explorers unreachable: {last_failure}"),
    }
}

fn fetch_block_hash(
    chain: &str,
    base: &str,
    height: u64,
    ctx: &VerifyContext,
) -> Result<String, String> {
    let cache_key = format!("{chain}:blockhash:{height}");
    if let Some(cached) = ctx.cache_get(&cache_key) {
        if let Ok(hash) = String::from_utf8(cached) {
            return Ok(hash);
        }
    }
    let url = format!("{base}/block-height/{height}");
    let body = ctx
        .http()
        .get(&url, ctx.timeout())
        .map_err(|err| err.to_string())?;
    let hash = String::from_utf8(body)
        .map_err(|_| format!("{url} returned a non-utf8 block hash"))?
        .trim()
        .to_string();
    ctx.cache_put(&cache_key, hash.clone().into_bytes());
    Ok(hash)
}

fn fetch_header(
    chain: &str,
    base: &str,
    hash: &str,
    ctx: &VerifyContext,
) -> Result<String, String> {
    let cache_key = format!("{chain}:header:{hash}");
    if let Some(cached) = ctx.cache_get(&cache_key) {
        if let Ok(header) = String::from_utf8(cached) {
            return Ok(header);
        }
    }
    let url = format!("{base}/block/{hash}/header");
    let body = ctx
        .http()
        .get(&url, ctx.timeout())
        .map_err(|err| err.to_string())?;
    let header = String::from_utf8(body).map_err(|_| format!("{url} returned non-utf8 bytes"))?;
    ctx.cache_put(&cache_key, header.clone().into_bytes());
    Ok(header)
}

/// Anchor time is informational; failures here never change the verdict.
fn fetch_block_time(base: &str, hash: &str, ctx: &VerifyContext) -> Option<u64> {
    let url = format!("{base}/block/{hash}");
    let body = ctx.http().get(&url, ctx.timeout()).ok()?;
    let block: Value = serde_json::from_slice(&body).ok()?;
    block.get("timestamp").and_then(Value::as_u64)
}
