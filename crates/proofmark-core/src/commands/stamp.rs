//! The stamp command: commit a document to the calendars.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::adapter::{EntropySource, HttpClient};
use crate::calendar::{submit_to_all, CalendarClient, SubmitOutcome};
use crate::codec::{attach, DetachedTimestampFile};
use crate::config::Config;
use crate::timestamp::Timestamp;

use super::sha256_digest;

/// Collaborators the stamp command needs.
pub struct StampDeps {
    /// HTTP client for calendar submission.
    pub http: Arc<dyn HttpClient>,
    /// Nonce source.
    pub entropy: Arc<dyn EntropySource>,
    /// Engine configuration.
    pub config: Config,
}

/// Options for stamping a file.
#[derive(Debug, Clone, Default)]
pub struct StampOptions {
    /// Where to write the proof; defaults to `<document>.ots`.
    pub output: Option<PathBuf>,
    /// Replace an existing output file.
    pub overwrite: bool,
    /// Write an attached file (document bytes followed by the envelope)
    /// instead of a detached proof.
    pub attached: bool,
}

/// Errors raised while stamping.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StampError {
    /// Reading the document or writing the proof failed.
    #[error("io error on {path}: {source}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The output file exists and overwrite was not requested.
    #[error("output {path} already exists")]
    OutputExists {
        /// The output path.
        path: PathBuf,
    },

    /// No calendars are configured.
    #[error("no calendars configured")]
    NoCalendars,

    /// Not a single calendar accepted the commitment.
    #[error("every calendar submission failed")]
    AllCalendarsFailed {
        /// Per-calendar failures, rendered.
        failures: Vec<(String, String)>,
    },
}

/// Result of stamping a file.
#[derive(Debug)]
pub struct StampResult {
    /// Where the proof was written.
    pub output_path: PathBuf,
    /// The submission outcome.
    pub outcome: SubmitOutcome,
    /// Pending attestations now in the proof.
    pub pending: usize,
}

/// Stamps raw document bytes: nonce, commitment, calendar submission.
///
/// The commitment is `nonce ‖ sha256(document)`, so calendars learn nothing
/// about the document itself.
///
/// # Errors
///
/// [`StampError::NoCalendars`] with an empty calendar list,
/// [`StampError::AllCalendarsFailed`] when no calendar accepted. A partial
/// quorum failure is not an error here — the proof still carries the
/// accepting calendars' pendings; callers that need the strategy verdict
/// check [`SubmitOutcome::is_satisfied`].
pub fn stamp_bytes(
    document: &[u8],
    deps: &StampDeps,
) -> Result<(DetachedTimestampFile, SubmitOutcome), StampError> {
    if deps.config.calendars.is_empty() {
        return Err(StampError::NoCalendars);
    }

    let nonce = deps.entropy.nonce_bytes();
    let digest = sha256_digest(document);
    let mut commitment = Vec::with_capacity(nonce.len() + digest.len());
    commitment.extend_from_slice(&nonce);
    commitment.extend_from_slice(&digest);

    let mut timestamp = Timestamp::new(commitment);
    let timeout = Duration::from_secs(deps.config.submit.request_timeout_secs);
    let calendars: Vec<CalendarClient> = deps
        .config
        .calendars
        .iter()
        .map(|base| CalendarClient::new(base.clone(), Arc::clone(&deps.http), timeout))
        .collect();

    let outcome = submit_to_all(&mut timestamp, calendars, &deps.config.submit);
    if outcome.successful.is_empty() {
        return Err(StampError::AllCalendarsFailed {
            failures: outcome.failed,
        });
    }
    if !outcome.is_satisfied() {
        tracing::warn!(
            successful = outcome.successful.len(),
            required = outcome.required,
            "submission quorum not reached, proof carries partial pendings"
        );
    }

    let file = DetachedTimestampFile::new_nonced(nonce, timestamp.into_root());
    Ok((file, outcome))
}

/// Stamps a document file and writes the proof next to it.
///
/// # Errors
///
/// As [`stamp_bytes`], plus I/O failures and
/// [`StampError::OutputExists`].
pub fn stamp_file(
    path: &Path,
    options: &StampOptions,
    deps: &StampDeps,
) -> Result<StampResult, StampError> {
    let document = std::fs::read(path).map_err(|source| StampError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let output_path = options.output.clone().unwrap_or_else(|| {
        let mut name = path.as_os_str().to_os_string();
        name.push(".ots");
        PathBuf::from(name)
    });
    if output_path.exists() && !options.overwrite {
        return Err(StampError::OutputExists { path: output_path });
    }

    let (file, outcome) = stamp_bytes(&document, deps)?;
    let pending = file.tree().pending_count();

    let bytes = if options.attached {
        attach(&document, &file)
    } else {
        file.to_bytes()
    };
    std::fs::write(&output_path, bytes).map_err(|source| StampError::Io {
        path: output_path.clone(),
        source,
    })?;

    tracing::info!(
        output = %output_path.display(),
        calendars = outcome.successful.len(),
        pending,
        "document stamped"
    );
    Ok(StampResult {
        output_path,
        outcome,
        pending,
    })
}
