//! `proofmark upgrade`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use proofmark_core::adapter::{Clock, SystemClock};
use proofmark_core::commands::{upgrade_file, UpgradeDeps};
use proofmark_core::config::Config;

use super::http_client;
use crate::EXIT_NO_UPGRADE;

pub fn run(files: &[PathBuf], config: Config, json: bool) -> Result<u8> {
    if files.is_empty() {
        bail!("nothing to upgrade: pass at least one proof file");
    }
    let deps = UpgradeDeps {
        http: http_client()?,
        clock: Arc::new(SystemClock) as Arc<dyn Clock>,
        config,
    };

    let mut upgraded_any = false;
    for file in files {
        let outcome = upgrade_file(file, &deps)
            .with_context(|| format!("upgrading {}", file.display()))?;
        upgraded_any |= outcome.any_upgraded();
        if json {
            super::print_json(&serde_json::json!({
                "file": file,
                "upgraded": outcome.upgraded,
                "still_pending": outcome.still_pending,
                "failures": outcome.failures,
            }))?;
        } else {
            println!(
                "{}: {} upgraded, {} still pending",
                file.display(),
                outcome.upgraded,
                outcome.still_pending
            );
            for (uri, failure) in &outcome.failures {
                println!("  {uri}: {failure}");
            }
        }
    }
    Ok(if upgraded_any { 0 } else { EXIT_NO_UPGRADE })
}
