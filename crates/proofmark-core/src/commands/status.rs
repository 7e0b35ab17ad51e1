//! The status command: pending/anchored summary, optionally probing the
//! calendars for upgrade readiness.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::adapter::HttpClient;
use crate::attestation::{Attestation, Chain};
use crate::calendar::fetch_subtree;
use crate::codec::{split_attached, CodecError, DetachedTimestampFile, HEADER_MAGIC};
use crate::timestamp::Tree;

/// Errors raised while reading a proof for status.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StatusError {
    /// Reading the file failed.
    #[error("io error on {path}: {source}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The proof file does not parse.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Probe result for one pending attestation's calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarStatus {
    /// The upgrade URI.
    pub uri: String,
    /// `ready`, `pending`, or `unreachable: <detail>`.
    pub state: String,
}

/// Summary of a proof's anchoring progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    /// Pending attestations.
    pub pending: usize,
    /// Chain-anchored attestations.
    pub anchored: usize,
    /// Bitcoin anchors.
    pub bitcoin: usize,
    /// Litecoin anchors.
    pub litecoin: usize,
    /// Ethereum anchors.
    pub ethereum: usize,
    /// Per-calendar probe results, when probing was requested.
    pub calendars: Vec<CalendarStatus>,
}

impl StatusReport {
    /// Whether every attestation is chain-anchored.
    #[must_use]
    pub const fn fully_anchored(&self) -> bool {
        self.pending == 0 && self.anchored > 0
    }
}

fn count_attestations(tree: &Tree, report: &mut StatusReport) {
    for attestation in &tree.attestations {
        match attestation.chain() {
            Some(Chain::Bitcoin) => {
                report.bitcoin += 1;
                report.anchored += 1;
            }
            Some(Chain::Litecoin) => {
                report.litecoin += 1;
                report.anchored += 1;
            }
            Some(Chain::Ethereum) => {
                report.ethereum += 1;
                report.anchored += 1;
            }
            None => report.pending += 1,
        }
    }
    for (_, child) in &tree.ops {
        count_attestations(child, report);
    }
}

fn collect_pending_uris(tree: &Tree, uris: &mut Vec<String>) {
    for attestation in &tree.attestations {
        if let Attestation::Pending { uri } = attestation {
            if !uris.contains(uri) {
                uris.push(uri.clone());
            }
        }
    }
    for (_, child) in &tree.ops {
        collect_pending_uris(child, uris);
    }
}

/// Summarizes a proof from raw bytes.
///
/// With `probe` set, each distinct pending URI is fetched once and reported
/// as ready (the calendar already serves an anchored subtree), still
/// pending, or unreachable.
///
/// # Errors
///
/// Parse failures only.
pub fn status_bytes(
    bytes: &[u8],
    probe: Option<(&Arc<dyn HttpClient>, Duration)>,
) -> Result<StatusReport, StatusError> {
    let envelope = if bytes.starts_with(HEADER_MAGIC) {
        bytes
    } else {
        split_attached(bytes)?.1
    };
    let file = DetachedTimestampFile::from_bytes(envelope)?;

    let mut report = StatusReport {
        pending: 0,
        anchored: 0,
        bitcoin: 0,
        litecoin: 0,
        ethereum: 0,
        calendars: Vec::new(),
    };
    count_attestations(file.tree(), &mut report);

    if let Some((http, timeout)) = probe {
        let mut uris = Vec::new();
        collect_pending_uris(file.tree(), &mut uris);
        for uri in uris {
            let state = match fetch_subtree(http, &uri, timeout) {
                Ok(subtree) if subtree.has_anchored() => "ready".to_string(),
                Ok(_) => "pending".to_string(),
                Err(err) => format!("unreachable: {err}"),
            };
            report.calendars.push(CalendarStatus { uri, state });
        }
    }
    Ok(report)
}

/// Summarizes a proof file.
///
/// # Errors
///
/// I/O and parse failures.
pub fn status_file(
    path: &Path,
    probe: Option<(&Arc<dyn HttpClient>, Duration)>,
) -> Result<StatusReport, StatusError> {
    let bytes = std::fs::read(path).map_err(|source| StatusError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    status_bytes(&bytes, probe)
}
