//! The info command: describe a proof file without any network I/O.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::codec::{split_attached, CodecError, DetachedTimestampFile, HEADER_MAGIC};
use crate::timestamp::Tree;

/// Errors raised while reading a proof for inspection.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InfoError {
    /// Reading the file failed.
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

/// One operation edge in the rendered tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpInfo {
    /// Rendered operation, e.g. `sha256` or `append 0102`.
    pub op: String,
    /// The node the operation leads to.
    pub child: NodeInfo,
}

/// One node of the rendered tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeInfo {
    /// Rendered attestations at this node.
    pub attestations: Vec<String>,
    /// Outgoing operations.
    pub ops: Vec<OpInfo>,
}

impl NodeInfo {
    fn from_tree(tree: &Tree) -> Self {
        Self {
            attestations: tree.attestations.iter().map(ToString::to_string).collect(),
            ops: tree
                .ops
                .iter()
                .map(|(op, child)| OpInfo {
                    op: op.to_string(),
                    child: Self::from_tree(child),
                })
                .collect(),
        }
    }
}

/// Structural description of a proof file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfoReport {
    /// Envelope version byte.
    pub version: u8,
    /// Hex of the privacy nonce, for nonce-extended files.
    pub nonce: Option<String>,
    /// Whether the input was an attached file.
    pub attached: bool,
    /// Total tree nodes.
    pub node_count: usize,
    /// Total attestations.
    pub attestation_count: usize,
    /// Pending attestations.
    pub pending_count: usize,
    /// The proof tree.
    pub tree: NodeInfo,
}

impl InfoReport {
    /// Renders the report as an indented text tree.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "version: {}", self.version);
        if let Some(nonce) = &self.nonce {
            let _ = writeln!(out, "nonce: {nonce}");
        }
        let _ = writeln!(
            out,
            "attestations: {} ({} pending)",
            self.attestation_count, self.pending_count
        );
        render_node(&self.tree, 0, &mut out);
        out
    }
}

fn render_node(node: &NodeInfo, depth: usize, out: &mut String) {
    let indent = "    ".repeat(depth);
    for attestation in &node.attestations {
        let _ = writeln!(out, "{indent}verify {attestation}");
    }
    for op in &node.ops {
        let _ = writeln!(out, "{indent}{}", op.op);
        render_node(&op.child, depth + 1, out);
    }
}

/// Describes a proof from raw bytes (detached or attached).
///
/// # Errors
///
/// Parse failures only; this command performs no network I/O.
pub fn info_bytes(bytes: &[u8]) -> Result<InfoReport, InfoError> {
    let (attached, envelope) = if bytes.starts_with(HEADER_MAGIC) {
        (false, bytes)
    } else {
        let (_, envelope) = split_attached(bytes)?;
        (true, envelope)
    };
    let file = DetachedTimestampFile::from_bytes(envelope)?;
    Ok(InfoReport {
        version: file.version(),
        nonce: file.nonce().map(hex::encode),
        attached,
        node_count: file.tree().node_count(),
        attestation_count: file.tree().attestation_count(),
        pending_count: file.tree().pending_count(),
        tree: NodeInfo::from_tree(file.tree()),
    })
}

/// Describes a proof file.
///
/// # Errors
///
/// I/O and parse failures.
pub fn info_file(path: &Path) -> Result<InfoReport, InfoError> {
    let bytes = std::fs::read(path).map_err(|source| InfoError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info_bytes(&bytes)
}
