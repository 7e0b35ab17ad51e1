//! Engine configuration, passed in as a value.
//!
//! The engine never reads the environment or the filesystem for
//! configuration; callers construct (or deserialize) a [`Config`] and hand
//! it to the entry points. Every section defaults sensibly so a TOML
//! overlay only needs the fields it changes.

use serde::{Deserialize, Serialize};

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Default whole-submission deadline in seconds.
pub const DEFAULT_SUBMIT_DEADLINE_SECS: u64 = 120;
/// Default minimum calendars that must accept a submission.
pub const DEFAULT_MIN_SUCCESSFUL: usize = 1;
/// Default minimum consensus score for a valid verdict.
pub const DEFAULT_MIN_SCORE: f64 = 0.6;
/// Default per-URI cooldown between upgrade attempts, in seconds.
pub const DEFAULT_UPGRADE_COOLDOWN_SECS: u64 = 300;

/// How calendar submission decides it is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SubmitStrategy {
    /// Wait for every calendar (or the deadline).
    All,
    /// Return as soon as `required` calendars accepted.
    Quorum {
        /// Number of accepting calendars required.
        required: usize,
    },
    /// Return on the first accepting calendar.
    FirstSuccess,
}

impl Default for SubmitStrategy {
    fn default() -> Self {
        Self::All
    }
}

/// Calendar submission settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitConfig {
    /// Completion strategy.
    pub strategy: SubmitStrategy,
    /// Minimum calendars that must accept before submission counts as
    /// successful.
    pub min_successful: usize,
    /// Per-calendar request timeout, seconds.
    pub request_timeout_secs: u64,
    /// Deadline for the whole submission batch, seconds.
    pub deadline_secs: u64,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            strategy: SubmitStrategy::default(),
            min_successful: DEFAULT_MIN_SUCCESSFUL,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            deadline_secs: DEFAULT_SUBMIT_DEADLINE_SECS,
        }
    }
}

/// Verification settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Minimum consensus score for `overall_valid`.
    pub min_score: f64,
    /// Per-request timeout for explorers, calendars, and RPC, seconds.
    pub request_timeout_secs: u64,
    /// Cooldown between upgrade attempts against the same URI, seconds.
    pub upgrade_cooldown_secs: u64,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            upgrade_cooldown_secs: DEFAULT_UPGRADE_COOLDOWN_SECS,
        }
    }
}

/// Anchor endpoints for a UTXO chain (Bitcoin, Litecoin).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Esplora-style explorer base URLs, tried in order.
    pub explorers: Vec<String>,
    /// Optional full-node JSON-RPC URL; when set it is the primary path.
    pub rpc_url: Option<String>,
}

/// Anchor endpoints for Ethereum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EthereumConfig {
    /// JSON-RPC endpoint (`eth_*` methods).
    pub rpc_url: Option<String>,
    /// Etherscan-style proxy endpoints, tried when no RPC is configured.
    pub explorers: Vec<String>,
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Calendar base URLs commitments are submitted to.
    pub calendars: Vec<String>,
    /// Submission settings.
    pub submit: SubmitConfig,
    /// Verification settings.
    pub verify: VerifyConfig,
    /// Bitcoin anchor endpoints.
    pub bitcoin: ChainConfig,
    /// Litecoin anchor endpoints.
    pub litecoin: ChainConfig,
    /// Ethereum anchor endpoints.
    pub ethereum: EthereumConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            calendars: vec![
                "https://a.pool.opentimestamps.org".to_string(),
                "https://b.pool.opentimestamps.org".to_string(),
                "https://alice.btc.calendar.opentimestamps.org".to_string(),
                "https://bob.btc.calendar.opentimestamps.org".to_string(),
            ],
            submit: SubmitConfig::default(),
            verify: VerifyConfig::default(),
            bitcoin: ChainConfig {
                explorers: vec![
                    "https://blockstream.info/api".to_string(),
                    "https://mempool.space/api".to_string(),
                ],
                rpc_url: None,
            },
            litecoin: ChainConfig {
                explorers: vec!["https://litecoinspace.org/api".to_string()],
                rpc_url: None,
            },
            ethereum: EthereumConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.calendars.len(), 4);
        assert_eq!(config.submit.min_successful, 1);
        assert_eq!(config.submit.strategy, SubmitStrategy::All);
        assert!((config.verify.min_score - 0.6).abs() < f64::EPSILON);
        assert!(config.bitcoin.rpc_url.is_none());
    }

    #[test]
    fn test_partial_overlay_keeps_defaults() {
        let config: Config = serde_json::from_str(
            r#"{
                "calendars": ["https://cal.example"],
                "submit": { "strategy": { "kind": "quorum", "required": 2 } }
            }"#,
        )
        .unwrap();
        assert_eq!(config.calendars, vec!["https://cal.example".to_string()]);
        assert_eq!(
            config.submit.strategy,
            SubmitStrategy::Quorum { required: 2 }
        );
        // Untouched sections keep their defaults.
        assert_eq!(config.submit.request_timeout_secs, 30);
        assert_eq!(config.bitcoin.explorers.len(), 2);
    }
}
