//! The verify command: document plus proof to a structured verdict.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::calendar::{upgrade_tree, UpgradeTracker};
use crate::codec::{split_attached, CodecError, DetachedTimestampFile, HEADER_MAGIC};
use crate::timestamp::Timestamp;
use crate::verify::{verify_timestamp, VerificationReport, VerifyContext};

use super::sha256_digest;

/// Errors raised before verification can even start.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VerifyCommandError {
    /// Reading a file failed.
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

    /// A detached proof was given without the document it proves.
    #[error("detached proof requires the document (pass the target file)")]
    MissingDocument,
}

/// Verifies a detached proof against document bytes.
///
/// When `attempt_upgrade` is set and the proof still carries pending
/// attestations, an in-memory upgrade pass runs first so freshly anchored
/// proofs verify without a separate upgrade step; the file on disk is not
/// touched.
///
/// # Errors
///
/// Only parse failures error; anchor problems land in the report.
pub fn verify_detached_bytes(
    ots: &[u8],
    document: &[u8],
    ctx: &VerifyContext,
    attempt_upgrade: bool,
) -> Result<VerificationReport, VerifyCommandError> {
    let file = DetachedTimestampFile::from_bytes(ots)?;
    let digest = sha256_digest(document);
    let commitment = file.commitment_for(&digest);
    let mut tree = file.into_tree();

    if attempt_upgrade && tree.has_pending() {
        let mut tracker = UpgradeTracker::new(0, Arc::clone(ctx.clock()));
        let outcome = upgrade_tree(&mut tree, ctx.http(), ctx.timeout(), &mut tracker);
        if outcome.any_upgraded() {
            tracing::info!(upgraded = outcome.upgraded, "proof upgraded in memory");
        }
    }

    let timestamp = Timestamp::from_parts(commitment.clone(), tree);
    Ok(verify_timestamp(&timestamp, &commitment, ctx))
}

/// Verifies a proof file, detached or attached.
///
/// A file starting with the header magic is a detached proof and needs
/// `document_path`; anything else must be an attached file carrying its own
/// document.
///
/// # Errors
///
/// I/O and parse failures, and [`VerifyCommandError::MissingDocument`] for
/// a detached proof without a document.
pub fn verify_files(
    ots_path: &Path,
    document_path: Option<&Path>,
    ctx: &VerifyContext,
    attempt_upgrade: bool,
) -> Result<VerificationReport, VerifyCommandError> {
    let bytes = read(ots_path)?;
    if bytes.starts_with(HEADER_MAGIC) {
        let document_path = document_path.ok_or(VerifyCommandError::MissingDocument)?;
        let document = read(document_path)?;
        verify_detached_bytes(&bytes, &document, ctx, attempt_upgrade)
    } else {
        let (document, envelope) = split_attached(&bytes)?;
        verify_detached_bytes(envelope, document, ctx, attempt_upgrade)
    }
}

fn read(path: &Path) -> Result<Vec<u8>, VerifyCommandError> {
    std::fs::read(path).map_err(|source| VerifyCommandError::Io {
        path: path.to_path_buf(),
        source,
    })
}
