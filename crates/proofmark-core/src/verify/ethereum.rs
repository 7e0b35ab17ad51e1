//! Ethereum transaction verification.
//!
//! The commitment must appear in the transaction's `input` bytes and the
//! transaction must sit in the attested block. Fetching goes through the
//! configured JSON-RPC endpoint, or an etherscan-style proxy when no RPC is
//! configured.

use serde_json::{json, Value};

use crate::attestation::{AttestationVerdict, FailureReason};

use super::{contains_subslice, VerifyContext};

pub(super) fn verify_ethereum(
    commitment: &[u8],
    tx_hash: &[u8; 32],
    block_number: u64,
    ctx: &VerifyContext,
) -> AttestationVerdict {
    let tx_hex = format!("0x{}", hex::encode(tx_hash));

    let tx = if let Some(rpc_url) = &ctx.config().ethereum.rpc_url {
        fetch_tx_rpc(rpc_url, &tx_hex, ctx)
    } else if ctx.config().ethereum.explorers.is_empty() {
        return AttestationVerdict::Unknown {
            reason: "no ethereum endpoints configured".to_string(),
        };
    } else {
        fetch_tx_explorers(&ctx.config().ethereum.explorers, &tx_hex, ctx)
    };

    let tx = match tx {
        Ok(tx) => tx,
        Err(reason) => return AttestationVerdict::Unknown { reason },
    };

    check_transaction(&tx, commitment, &tx_hex, block_number)
}

/// Decides the verdict from a fetched transaction object.
fn check_transaction(
    tx: &Value,
    commitment: &[u8],
    tx_hex: &str,
    block_number: u64,
) -> AttestationVerdict {
    if tx.is_null() {
        return AttestationVerdict::Failed {
            reason: FailureReason::CommitmentNotFound {
                anchor_id: format!("ethereum:{tx_hex}"),
            },
        };
    }

    let Some(input_hex) = tx.get("input").and_then(Value::as_str) else {
        return AttestationVerdict::Failed {
            reason: FailureReason::MalformedResponse {
                detail: "transaction has no input field".to_string(),
            },
        };
    };
    let Ok(input) = hex::decode(input_hex.trim_start_matches("0x")) else {
        return AttestationVerdict::Failed {
            reason: FailureReason::MalformedResponse {
                detail: "transaction input is not hex".to_string(),
            },
        };
    };
    if !contains_subslice(&input, commitment) {
        return AttestationVerdict::Failed {
            reason: FailureReason::CommitmentNotFound {
                anchor_id: format!("ethereum:{tx_hex}"),
            },
        };
    }

    match tx
        .get("blockNumber")
        .and_then(Value::as_str)
        .and_then(parse_quantity)
    {
        Some(actual) if actual == block_number => AttestationVerdict::Verified {
            anchor_time: None,
            anchor_id: format!("ethereum:{block_number}:{tx_hex}"),
        },
        Some(actual) => AttestationVerdict::Failed {
            reason: FailureReason::WrongBlock {
                expected: block_number,
                actual,
            },
        },
        // Pending transaction or a proxy that omits the field.
        None => AttestationVerdict::Failed {
            reason: FailureReason::MalformedResponse {
                detail: "transaction has no block number".to_string(),
            },
        },
    }
}

/// Parses an `0x`-prefixed hex quantity.
fn parse_quantity(raw: &str) -> Option<u64> {
    u64::from_str_radix(raw.trim_start_matches("0x"), 16).ok()
}

fn fetch_tx_rpc(rpc_url: &str, tx_hex: &str, ctx: &VerifyContext) -> Result<Value, String> {
    let request = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "eth_getTransactionByHash",
        "params": [tx_hex],
    });
    let body = ctx
        .http()
        .post(
            rpc_url,
            request.to_string().as_bytes(),
            "application/json",
            ctx.timeout(),
        )
        .map_err(|err| err.to_string())?;
    let response: Value =
        serde_json::from_slice(&body).map_err(|err| format!("unparseable rpc response: {err}"))?;
    if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
        return Err(format!("rpc error: {error}"));
    }
    Ok(response.get("result").cloned().unwrap_or(Value::Null))
}

fn fetch_tx_explorers(
    explorers: &[String],
    tx_hex: &str,
    ctx: &VerifyContext,
) -> Result<Value, String> {
    let mut last_failure = String::new();
    for base in explorers {
        let base = base.trim_end_matches('/');
        let url =
            format!("{base}/api?module=proxy&action=eth_getTransactionByHash&txhash={tx_hex}");
        match ctx.http().get(&url, ctx.timeout()) {
            Ok(body) => {
                let response: Value = serde_json::from_slice(&body)
                    .map_err(|err| format!("unparseable explorer response: {err}"))?;
                return Ok(response.get("result").cloned().unwrap_or(Value::Null));
            }
            Err(err) => last_failure = err.to_string(),
        }
    }
    Err(format!("all ethereum explorers unreachable: {last_failure}"))
}
