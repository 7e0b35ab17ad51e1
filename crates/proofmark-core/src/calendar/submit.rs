//! Parallel calendar submission.
//!
//! Each calendar is contacted from its own worker thread; workers send
//! self-contained subtrees back over a channel and the owning thread merges
//! them sequentially in arrival order. Workers that outlive the deadline or
//! the strategy's early exit are abandoned — their sends land in a closed
//! channel.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::{SubmitConfig, SubmitStrategy};
use crate::timestamp::Timestamp;

use super::{CalendarClient, CalendarError};

/// Result of one submission batch.
#[derive(Debug, Clone, Default)]
pub struct SubmitOutcome {
    /// Calendars that accepted, in arrival order.
    pub successful: Vec<String>,
    /// Calendars that failed, with the failure rendered for reporting.
    pub failed: Vec<(String, String)>,
    /// Calendars that had not answered when the batch finished.
    pub unanswered: Vec<String>,
    /// Number of accepting calendars the strategy required.
    pub required: usize,
}

impl SubmitOutcome {
    /// Whether enough calendars accepted.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.successful.len() >= self.required
    }

    /// Converts the outcome into a strategy-level result.
    ///
    /// # Errors
    ///
    /// [`CalendarError::QuorumNotReached`] when too few calendars accepted.
    pub fn into_result(self) -> Result<Self, CalendarError> {
        if self.is_satisfied() {
            Ok(self)
        } else {
            Err(CalendarError::QuorumNotReached {
                required: self.required,
                successful: self.successful.len(),
            })
        }
    }
}

/// Number of successes that allows the batch to stop waiting.
const fn early_exit_target(strategy: SubmitStrategy) -> Option<usize> {
    match strategy {
        SubmitStrategy::All => None,
        SubmitStrategy::Quorum { required } => Some(required),
        SubmitStrategy::FirstSuccess => Some(1),
    }
}

/// Number of successes the batch needs to count as successful.
fn required_successes(config: &SubmitConfig, total: usize) -> usize {
    let floor = config.min_successful.max(1);
    match config.strategy {
        SubmitStrategy::All | SubmitStrategy::FirstSuccess => floor,
        SubmitStrategy::Quorum { required } => required.max(floor),
    }
    .min(total.max(1))
}

/// Submits `timestamp`'s commitment to every calendar, merging responses as
/// they arrive.
///
/// Returns once the strategy is satisfied, every calendar has answered, or
/// the batch deadline elapses — whichever comes first. Per-calendar
/// failures are collected, never propagated; use
/// [`SubmitOutcome::into_result`] for the strategy-level verdict.
pub fn submit_to_all(
    timestamp: &mut Timestamp,
    calendars: Vec<CalendarClient>,
    config: &SubmitConfig,
) -> SubmitOutcome {
    let total = calendars.len();
    let mut outcome = SubmitOutcome {
        required: required_successes(config, total),
        ..SubmitOutcome::default()
    };
    if total == 0 {
        return outcome;
    }

    let mut awaiting: Vec<String> = calendars
        .iter()
        .map(|calendar| calendar.base_url().to_string())
        .collect();

    let (tx, rx) = mpsc::channel();
    for calendar in calendars {
        let tx = tx.clone();
        let commitment = timestamp.commitment().to_vec();
        thread::spawn(move || {
            let url = calendar.base_url().to_string();
            let result = calendar.submit(&commitment);
            // The receiver may be gone after an early exit; that is fine.
            let _ = tx.send((url, result));
        });
    }
    drop(tx);

    let deadline = Instant::now() + Duration::from_secs(config.deadline_secs);
    let target = early_exit_target(config.strategy);
    let mut received = 0usize;

    while received < total {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            tracing::warn!(
                answered = received,
                total,
                "submission deadline elapsed"
            );
            break;
        }
        let (url, result) = match rx.recv_timeout(remaining) {
            Ok(message) => message,
            // Timeout is re-checked at the top of the loop; disconnection
            // means no worker can answer anymore.
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };
        received += 1;
        awaiting.retain(|pending| pending != &url);
        match result {
            Ok(subtree) => {
                timestamp.root_mut().merge(subtree);
                tracing::info!(calendar = %url, "calendar accepted commitment");
                outcome.successful.push(url);
                if let Some(target) = target {
                    if outcome.successful.len() >= target {
                        break;
                    }
                }
            }
            Err(err) => {
                tracing::warn!(calendar = %url, error = %err, "calendar submission failed");
                outcome.failed.push((url, err.to_string()));
            }
        }
    }

    outcome.unanswered = awaiting;
    outcome
}
