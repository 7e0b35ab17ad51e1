//! Injected collaborators for everything that touches the outside world.
//!
//! The proof engine performs no ambient I/O: HTTP, full-node RPC, wall
//! clock, randomness, and caching all arrive through the traits in this
//! module. Production code wires the reference implementations
//! ([`ReqwestHttpClient`], [`SystemClock`], [`OsEntropy`], [`MemoryCache`]);
//! tests wire the deterministic doubles ([`MockHttpClient`], [`FixedClock`],
//! [`FixedEntropy`]).

mod cache;
mod clock;
mod entropy;
mod http;
mod rpc;

pub use cache::{Cache, MemoryCache};
pub use clock::{Clock, FixedClock, SystemClock};
pub use entropy::{EntropySource, FixedEntropy, OsEntropy, NONCE_BYTES};
pub use http::{HttpClient, HttpError, MockHttpClient, ReqwestHttpClient};
pub use rpc::{BitcoinRpc, JsonRpcClient, RpcError};
