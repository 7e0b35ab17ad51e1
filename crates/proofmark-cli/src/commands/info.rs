//! `proofmark info`

use std::path::Path;

use anyhow::{Context, Result};
use proofmark_core::commands::info_file;

pub fn run(proof: &Path, json: bool) -> Result<u8> {
    let report =
        info_file(proof).with_context(|| format!("inspecting {}", proof.display()))?;
    if json {
        super::print_json(&report)?;
    } else {
        print!("{}", report.render());
    }
    Ok(0)
}
