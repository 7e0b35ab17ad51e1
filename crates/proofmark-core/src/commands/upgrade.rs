//! The upgrade command: replace calendar promises with chain anchors.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::adapter::{Clock, HttpClient};
use crate::calendar::{upgrade_tree, UpgradeOutcome, UpgradeTracker};
use crate::codec::{CodecError, DetachedTimestampFile};
use crate::config::Config;

/// Collaborators the upgrade command needs.
pub struct UpgradeDeps {
    /// HTTP client for upgrade-URI fetches.
    pub http: Arc<dyn HttpClient>,
    /// Clock for cooldown bookkeeping.
    pub clock: Arc<dyn Clock>,
    /// Engine configuration.
    pub config: Config,
}

/// Errors raised while upgrading a proof file.
///
/// Per-URI fetch failures are not errors; they are collected in the
/// returned [`UpgradeOutcome`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UpgradeError {
    /// Reading or rewriting the proof file failed.
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

/// Attempts to upgrade every pending attestation in a proof file,
/// rewriting the file when anything changed.
///
/// Returns the outcome either way; `outcome.any_upgraded() == false` maps
/// to exit code 2 at the CLI.
///
/// # Errors
///
/// I/O and parse failures only.
pub fn upgrade_file(path: &Path, deps: &UpgradeDeps) -> Result<UpgradeOutcome, UpgradeError> {
    let bytes = std::fs::read(path).map_err(|source| UpgradeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut file = DetachedTimestampFile::from_bytes(&bytes)?;

    let mut tracker = UpgradeTracker::new(
        deps.config.verify.upgrade_cooldown_secs,
        Arc::clone(&deps.clock),
    );
    let timeout = Duration::from_secs(deps.config.verify.request_timeout_secs);
    let outcome = upgrade_tree(file.tree_mut(), &deps.http, timeout, &mut tracker);

    if outcome.any_upgraded() {
        std::fs::write(path, file.to_bytes()).map_err(|source| UpgradeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(
            path = %path.display(),
            upgraded = outcome.upgraded,
            still_pending = outcome.still_pending,
            "proof file upgraded"
        );
    } else {
        tracing::info!(path = %path.display(), "nothing to upgrade");
    }
    Ok(outcome)
}
