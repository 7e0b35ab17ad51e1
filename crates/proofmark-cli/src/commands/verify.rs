//! `proofmark verify`

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use proofmark_core::adapter::{Clock, SystemClock};
use proofmark_core::commands::verify_files;
use proofmark_core::config::Config;
use proofmark_core::verify::VerifyContext;

use super::http_client;

pub fn run(
    proof: &Path,
    file: Option<&Path>,
    attempt_upgrade: bool,
    config: Config,
    json: bool,
) -> Result<u8> {
    let ctx = VerifyContext::new(
        http_client()?,
        Arc::new(SystemClock) as Arc<dyn Clock>,
        config,
    );
    let report = verify_files(proof, file, &ctx, attempt_upgrade)
        .with_context(|| format!("verifying {}", proof.display()))?;

    if json {
        super::print_json(&report)?;
    } else {
        if report.overall_valid {
            println!(
                "valid ({}, score {:.2}, {} chain(s))",
                report.security_level, report.score, report.verified_chains
            );
        } else {
            println!("NOT VALID (score {:.2})", report.score);
        }
        for result in &report.attestations {
            println!("  {}: {}", result.attestation, result.verdict);
        }
        for issue in &report.errors {
            println!("  error: {issue}");
        }
        for recommendation in &report.recommendations {
            println!("  hint: {recommendation}");
        }
    }
    Ok(u8::from(!report.overall_valid))
}
