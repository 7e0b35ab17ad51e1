//! `proofmark stamp`

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use proofmark_core::adapter::{Clock, OsEntropy, SystemClock};
use proofmark_core::commands::{stamp_file, upgrade_file, StampDeps, StampOptions, UpgradeDeps};
use proofmark_core::config::Config;

use super::http_client;

/// Seconds between anchoring polls in `--wait` mode.
const WAIT_POLL_SECS: u64 = 30;

#[allow(clippy::fn_params_excessive_bools)]
pub fn run(
    files: &[PathBuf],
    output: Option<&Path>,
    attached: bool,
    wait: bool,
    overwrite: bool,
    config: Config,
    json: bool,
) -> Result<u8> {
    if files.is_empty() {
        bail!("nothing to stamp: pass at least one file");
    }
    if output.is_some() && files.len() > 1 {
        bail!("-o only makes sense with a single file");
    }

    let http = http_client()?;
    let deps = StampDeps {
        http: Arc::clone(&http),
        entropy: Arc::new(OsEntropy),
        config: config.clone(),
    };

    let mut outputs = Vec::new();
    for file in files {
        let options = StampOptions {
            output: output.map(Path::to_path_buf),
            overwrite,
            attached,
        };
        let result = stamp_file(file, &options, &deps)
            .with_context(|| format!("stamping {}", file.display()))?;
        if json {
            super::print_json(&serde_json::json!({
                "file": file,
                "proof": result.output_path,
                "calendars": result.outcome.successful,
                "pending": result.pending,
            }))?;
        } else {
            println!(
                "{} -> {} ({} calendar(s), {} pending)",
                file.display(),
                result.output_path.display(),
                result.outcome.successful.len(),
                result.pending
            );
        }
        outputs.push(result.output_path);
    }

    if wait {
        wait_for_anchors(&outputs, &config)?;
    }
    Ok(0)
}

/// Polls upgrade until every proof is fully anchored.
fn wait_for_anchors(outputs: &[PathBuf], config: &Config) -> Result<()> {
    let http = http_client()?;
    let deps = UpgradeDeps {
        http,
        clock: Arc::new(SystemClock) as Arc<dyn Clock>,
        config: config.clone(),
    };
    let mut remaining: Vec<PathBuf> = outputs.to_vec();
    while !remaining.is_empty() {
        std::thread::sleep(Duration::from_secs(WAIT_POLL_SECS));
        let mut still_waiting = Vec::new();
        for path in remaining {
            let outcome = upgrade_file(&path, &deps)
                .with_context(|| format!("upgrading {}", path.display()))?;
            if outcome.still_pending > 0 {
                still_waiting.push(path);
            } else {
                println!("{} fully anchored", path.display());
            }
        }
        remaining = still_waiting;
    }
    Ok(())
}
