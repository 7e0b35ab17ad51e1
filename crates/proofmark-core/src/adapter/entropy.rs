//! Randomness collaborator, used once per stamp for the privacy nonce.

use rand::rngs::OsRng;
use rand::RngCore;

/// Length of the nonce the engine requests.
pub const NONCE_BYTES: usize = 16;

/// Cryptographic source for stamp nonces.
pub trait EntropySource: Send + Sync {
    /// Returns 16 fresh random bytes.
    fn nonce_bytes(&self) -> [u8; NONCE_BYTES];
}

/// Operating-system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn nonce_bytes(&self) -> [u8; NONCE_BYTES] {
        let mut nonce = [0u8; NONCE_BYTES];
        OsRng.fill_bytes(&mut nonce);
        nonce
    }
}

/// Deterministic entropy for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedEntropy(pub [u8; NONCE_BYTES]);

impl EntropySource for FixedEntropy {
    fn nonce_bytes(&self) -> [u8; NONCE_BYTES] {
        self.0
    }
}
