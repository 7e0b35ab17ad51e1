//! Calendar protocol: commitment submission and pending-attestation
//! upgrade against remote calendar servers.
//!
//! A calendar is an HTTPS endpoint that aggregates commitments and anchors
//! them on-chain. Two endpoints matter to the engine:
//!
//! - `POST {base}/digest` with the raw leaf commitment as body returns a
//!   serialized subtree rooted at that commitment, containing at least one
//!   pending attestation naming the calendar's upgrade URI.
//! - `GET` on an upgrade URI (or `{base}/timestamp/{hex}`) returns the
//!   current subtree for the commitment, ideally chain-anchored.
//!
//! Failures are always per-calendar: one slow or broken server never
//! poisons the responses of its siblings.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::adapter::{HttpClient, HttpError};
use crate::codec::{tree_from_bytes, CodecError};
use crate::timestamp::Tree;

mod submit;
mod upgrade;

#[cfg(test)]
mod tests;

pub use submit::{submit_to_all, SubmitOutcome};
pub use upgrade::{
    find_pending, upgrade_tree, PendingAttestation, UpgradeOutcome, UpgradeTracker,
};

/// Content type of serialized timestamp material.
pub const CONTENT_TYPE: &str = "application/x-opentimestamps";

/// Errors raised by calendar interactions.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum CalendarError {
    /// The calendar could not be reached or answered non-2xx.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The calendar answered with bytes that do not decode as a subtree.
    #[error("calendar {calendar} returned an undecodable subtree")]
    Parse {
        /// Calendar or upgrade URI the response came from.
        calendar: String,
        /// The codec failure.
        #[source]
        source: Arc<CodecError>,
    },

    /// No calendars are configured.
    #[error("no calendars configured")]
    NoCalendars,

    /// Fewer calendars accepted than the strategy requires.
    #[error("only {successful} of the required {required} calendars accepted")]
    QuorumNotReached {
        /// Calendars the strategy required.
        required: usize,
        /// Calendars that actually accepted.
        successful: usize,
    },
}

/// Fetches and decodes a serialized subtree from an absolute URI.
///
/// # Errors
///
/// [`CalendarError::Http`] on transport/status failures,
/// [`CalendarError::Parse`] when the body does not decode.
pub fn fetch_subtree(
    http: &Arc<dyn HttpClient>,
    uri: &str,
    timeout: Duration,
) -> Result<Tree, CalendarError> {
    let body = http.get(uri, timeout)?;
    tree_from_bytes(&body).map_err(|source| CalendarError::Parse {
        calendar: uri.to_string(),
        source: Arc::new(source),
    })
}

/// Client for one calendar server.
#[derive(Clone)]
pub struct CalendarClient {
    base_url: String,
    http: Arc<dyn HttpClient>,
    timeout: Duration,
}

impl CalendarClient {
    /// Creates a client for `base_url` (trailing slashes are trimmed).
    #[must_use]
    pub fn new(base_url: impl Into<String>, http: Arc<dyn HttpClient>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http,
            timeout,
        }
    }

    /// The calendar's base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submits a leaf commitment, returning the calendar's subtree.
    ///
    /// # Errors
    ///
    /// [`CalendarError::Http`] or [`CalendarError::Parse`].
    pub fn submit(&self, commitment: &[u8]) -> Result<Tree, CalendarError> {
        let url = format!("{}/digest", self.base_url);
        tracing::info!(calendar = %self.base_url, "submitting commitment");
        let body = self
            .http
            .post(&url, commitment, CONTENT_TYPE, self.timeout)?;
        tree_from_bytes(&body).map_err(|source| CalendarError::Parse {
            calendar: self.base_url.clone(),
            source: Arc::new(source),
        })
    }

    /// Looks up the calendar's current subtree for a commitment.
    ///
    /// # Errors
    ///
    /// [`CalendarError::Http`] (404 when the calendar does not know the
    /// commitment) or [`CalendarError::Parse`].
    pub fn lookup(&self, commitment: &[u8]) -> Result<Tree, CalendarError> {
        let url = format!("{}/timestamp/{}", self.base_url, hex::encode(commitment));
        fetch_subtree(&self.http, &url, self.timeout)
    }
}
