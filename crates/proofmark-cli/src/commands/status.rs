//! `proofmark status`

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use proofmark_core::commands::status_file;
use proofmark_core::config::Config;

use super::http_client;

pub fn run(proof: &Path, probe: bool, config: Config, json: bool) -> Result<u8> {
    let timeout = Duration::from_secs(config.verify.request_timeout_secs);
    let report = if probe {
        let http = http_client()?;
        status_file(proof, Some((&http, timeout)))
    } else {
        status_file(proof, None)
    }
    .with_context(|| format!("reading {}", proof.display()))?;

    if json {
        super::print_json(&report)?;
    } else {
        println!(
            "{}: {} anchored ({} bitcoin, {} litecoin, {} ethereum), {} pending",
            proof.display(),
            report.anchored,
            report.bitcoin,
            report.litecoin,
            report.ethereum,
            report.pending
        );
        for calendar in &report.calendars {
            println!("  {}: {}", calendar.uri, calendar.state);
        }
        if report.fully_anchored() {
            println!("  proof is fully anchored");
        }
    }
    Ok(0)
}
