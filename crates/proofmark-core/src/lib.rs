//! # proofmark-core
//!
//! Core library for proofmark - a timestamp proof engine speaking the
//! OpenTimestamps wire format.
//!
//! A timestamp proof binds a document digest to one or more blockchain block
//! headers through a tree of commitment operations ending in attestations.
//! This crate provides the full proof pipeline:
//!
//! - **Proof trees**: recursive operation/attestation trees bound to a leaf
//!   commitment
//! - **Wire codec**: byte-exact serialization of trees and detached/attached
//!   timestamp files
//! - **Calendar protocol**: commitment submission and pending-attestation
//!   upgrade against remote calendar servers
//! - **Verification**: Merkle-path evaluation, per-anchor verification via
//!   full-node RPC or block explorers, and weighted consensus scoring
//!
//! All I/O goes through injected collaborator traits ([`adapter`]), so every
//! code path is deterministic under test.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use proofmark_core::adapter::{OsEntropy, ReqwestHttpClient, SystemClock};
//! use proofmark_core::commands::{stamp_bytes, StampDeps};
//! use proofmark_core::config::Config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let deps = StampDeps {
//!     http: Arc::new(ReqwestHttpClient::new()?),
//!     entropy: Arc::new(OsEntropy),
//!     config: Config::default(),
//! };
//! let (file, outcome) = stamp_bytes(b"important document", &deps)?;
//! println!("submitted to {} calendars", outcome.successful.len());
//! let ots_bytes = file.to_bytes();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod adapter;
pub mod attestation;
pub mod calendar;
pub mod codec;
pub mod commands;
pub mod config;
pub mod consensus;
pub mod op;
pub mod ser;
pub mod timestamp;
pub mod verify;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::attestation::{Attestation, AttestationVerdict, Chain};
    pub use crate::codec::DetachedTimestampFile;
    pub use crate::config::Config;
    pub use crate::consensus::SecurityLevel;
    pub use crate::op::Op;
    pub use crate::timestamp::{Timestamp, Tree};
    pub use crate::verify::{VerificationReport, VerifyContext};
}

pub use attestation::Attestation;
pub use codec::DetachedTimestampFile;
pub use config::Config;
pub use op::Op;
pub use timestamp::{Timestamp, Tree};
