//! Everything attestation verification needs from the outside world.

use std::sync::Arc;
use std::time::Duration;

use crate::adapter::{BitcoinRpc, Cache, Clock, HttpClient};
use crate::config::Config;

/// Default TTL for cached block lookups.
const BLOCK_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Collaborators and configuration for a verification run.
pub struct VerifyContext {
    http: Arc<dyn HttpClient>,
    rpc: Option<Arc<dyn BitcoinRpc>>,
    clock: Arc<dyn Clock>,
    cache: Option<Arc<dyn Cache>>,
    config: Config,
}

impl VerifyContext {
    /// Creates a context with the mandatory collaborators.
    #[must_use]
    pub fn new(http: Arc<dyn HttpClient>, clock: Arc<dyn Clock>, config: Config) -> Self {
        Self {
            http,
            rpc: None,
            clock,
            cache: None,
            config,
        }
    }

    /// Adds a Bitcoin full-node RPC collaborator; with one configured, the
    /// node becomes the primary Bitcoin verification path.
    #[must_use]
    pub fn with_rpc(mut self, rpc: Arc<dyn BitcoinRpc>) -> Self {
        self.rpc = Some(rpc);
        self
    }

    /// Adds an optional cache for block lookups and verified verdicts.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// The HTTP collaborator.
    #[must_use]
    pub fn http(&self) -> &Arc<dyn HttpClient> {
        &self.http
    }

    /// The RPC collaborator, when configured.
    #[must_use]
    pub fn rpc(&self) -> Option<&Arc<dyn BitcoinRpc>> {
        self.rpc.as_ref()
    }

    /// The clock collaborator.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// The engine configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Per-request timeout for anchor fetches.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.verify.request_timeout_secs)
    }

    /// Best-effort cache read.
    pub(crate) fn cache_get(&self, key: &str) -> Option<Vec<u8>> {
        self.cache.as_ref()?.get(key)
    }

    /// Best-effort cache write with the block-lookup TTL.
    pub(crate) fn cache_put(&self, key: &str, value: Vec<u8>) {
        if let Some(cache) = &self.cache {
            cache.put(key, value, Some(BLOCK_CACHE_TTL));
        }
    }
}
