//! Library entry points behind the CLI commands.
//!
//! One function per command — `stamp`, `verify`, `upgrade`, `info`,
//! `status` — each returning a structured result the caller formats. All
//! collaborators arrive through the deps structs; nothing here reaches for
//! ambient state.

use sha2::{Digest, Sha256};

mod info;
mod stamp;
mod status;
mod upgrade;
mod verify;

#[cfg(test)]
mod tests;

pub use info::{info_bytes, info_file, InfoError, InfoReport, NodeInfo, OpInfo};
pub use stamp::{
    stamp_bytes, stamp_file, StampDeps, StampError, StampOptions, StampResult,
};
pub use status::{status_bytes, status_file, CalendarStatus, StatusError, StatusReport};
pub use upgrade::{upgrade_file, UpgradeDeps, UpgradeError};
pub use verify::{verify_detached_bytes, verify_files, VerifyCommandError};

/// SHA-256 of a document, the digest half of every commitment.
#[must_use]
pub fn sha256_digest(document: &[u8]) -> Vec<u8> {
    Sha256::digest(document).to_vec()
}
