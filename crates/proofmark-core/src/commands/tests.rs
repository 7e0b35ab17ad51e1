use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use super::*;
use crate::adapter::{
    Clock, FixedClock, FixedEntropy, HttpClient, MockHttpClient, NONCE_BYTES,
};
use crate::attestation::Attestation;
use crate::codec::{tree_to_bytes, DetachedTimestampFile, HEADER_MAGIC};
use crate::config::{ChainConfig, Config};
use crate::timestamp::Tree;
use crate::verify::VerifyContext;

const CALENDAR: &str = "https://cal-a.example";
const UPGRADE_URI: &str = "https://cal-a.example/timestamp/00aa";
const EXPLORER: &str = "https://esplora.test";
const BLOCK_HASH: &str = "000000000000000000017e33";

const NONCE: [u8; NONCE_BYTES] = [
    0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,
    0x10,
];

fn test_config() -> Config {
    Config {
        calendars: vec![CALENDAR.to_string()],
        bitcoin: ChainConfig {
            explorers: vec![EXPLORER.to_string()],
            rpc_url: None,
        },
        ..Config::default()
    }
}

fn stamp_deps(mock: &Arc<MockHttpClient>) -> StampDeps {
    StampDeps {
        http: Arc::clone(mock) as Arc<dyn HttpClient>,
        entropy: Arc::new(FixedEntropy(NONCE)),
        config: test_config(),
    }
}

fn verify_ctx(mock: &Arc<MockHttpClient>) -> VerifyContext {
    VerifyContext::new(
        Arc::clone(mock) as Arc<dyn HttpClient>,
        Arc::new(FixedClock::at(1_700_000_000)) as Arc<dyn Clock>,
        test_config(),
    )
}

fn pending_tree() -> Tree {
    let mut tree = Tree::new();
    tree.add_attestation(Attestation::Pending {
        uri: UPGRADE_URI.to_string(),
    });
    tree
}

fn bitcoin_tree(height: u64) -> Tree {
    let mut tree = Tree::new();
    tree.add_attestation(Attestation::Bitcoin { height });
    tree
}

fn queue_calendar_accept(mock: &MockHttpClient) {
    mock.expect_post(
        &format!("{CALENDAR}/digest"),
        Ok(tree_to_bytes(&pending_tree())),
    );
}

/// Queues an explorer hit whose block header embeds `commitment`.
fn queue_explorer(mock: &MockHttpClient, commitment: &[u8], height: u64) {
    mock.expect_get(
        &format!("{EXPLORER}/block-height/{height}"),
        Ok(BLOCK_HASH.as_bytes().to_vec()),
    );
    mock.expect_get(
        &format!("{EXPLORER}/block/{BLOCK_HASH}/header"),
        Ok(format!("ffff{}eeee", hex::encode(commitment)).into_bytes()),
    );
    mock.expect_get(
        &format!("{EXPLORER}/block/{BLOCK_HASH}"),
        Ok(json!({ "timestamp": 1_690_000_000_u64 }).to_string().into_bytes()),
    );
}

fn expected_commitment(document: &[u8]) -> Vec<u8> {
    let mut commitment = NONCE.to_vec();
    commitment.extend_from_slice(&sha256_digest(document));
    commitment
}

#[test]
fn test_stamp_bytes_builds_nonced_commitment() {
    let mock = Arc::new(MockHttpClient::new());
    queue_calendar_accept(&mock);
    let (file, outcome) = stamp_bytes(b"abc", &stamp_deps(&mock)).unwrap();

    assert_eq!(outcome.successful, vec![CALENDAR.to_string()]);
    assert_eq!(file.nonce(), Some(&NONCE[..]));
    assert_eq!(file.tree().pending_count(), 1);

    // The calendar saw nonce ‖ sha256(document), never the document.
    let requests = mock.requests();
    assert_eq!(requests[0].body, expected_commitment(b"abc"));
}

#[test]
fn test_stamp_file_byte_layout() {
    let mock = Arc::new(MockHttpClient::new());
    queue_calendar_accept(&mock);

    let dir = tempfile::tempdir().unwrap();
    let doc_path = dir.path().join("doc.txt");
    std::fs::write(&doc_path, b"abc").unwrap();

    let result = stamp_file(&doc_path, &StampOptions::default(), &stamp_deps(&mock)).unwrap();
    assert_eq!(result.output_path, dir.path().join("doc.txt.ots"));
    assert_eq!(result.pending, 1);

    let bytes = std::fs::read(&result.output_path).unwrap();
    assert_eq!(&bytes[..16], HEADER_MAGIC);
    assert_eq!(bytes[16], 0x01);
    assert_eq!(bytes[17], 0x10);
    assert_eq!(&bytes[18..34], &NONCE);
    // The serialized tree follows.
    let file = DetachedTimestampFile::from_bytes(&bytes).unwrap();
    assert_eq!(file.tree().pending_count(), 1);
}

#[test]
fn test_stamp_refuses_existing_output() {
    let mock = Arc::new(MockHttpClient::new());
    let dir = tempfile::tempdir().unwrap();
    let doc_path = dir.path().join("doc.txt");
    std::fs::write(&doc_path, b"abc").unwrap();
    std::fs::write(dir.path().join("doc.txt.ots"), b"old").unwrap();

    let err = stamp_file(&doc_path, &StampOptions::default(), &stamp_deps(&mock)).unwrap_err();
    assert!(matches!(err, StampError::OutputExists { .. }));
    // Refused before any submission.
    assert_eq!(mock.request_count(), 0);
}

#[test]
fn test_stamp_fails_when_every_calendar_fails() {
    let mock = Arc::new(MockHttpClient::new());
    // Nothing queued: the one calendar fails with a transport error.
    let err = stamp_bytes(b"abc", &stamp_deps(&mock)).unwrap_err();
    assert!(matches!(err, StampError::AllCalendarsFailed { failures } if failures.len() == 1));
}

#[test]
fn test_stamp_verify_roundtrip_accepts_original_rejects_other() {
    let mock = Arc::new(MockHttpClient::new());
    queue_calendar_accept(&mock);
    let (file, _) = stamp_bytes(b"abc", &stamp_deps(&mock)).unwrap();
    let ots = file.to_bytes();

    let commitment_abc = expected_commitment(b"abc");

    // Verifying "abc": the upgrade fetch anchors the proof, the explorer
    // confirms the commitment.
    mock.expect_get(UPGRADE_URI, Ok(tree_to_bytes(&bitcoin_tree(800_000))));
    queue_explorer(&mock, &commitment_abc, 800_000);
    let ctx = verify_ctx(&mock);
    let report = verify_detached_bytes(&ots, b"abc", &ctx, true).unwrap();
    assert!(report.overall_valid, "original document must verify");

    // Verifying "abd": same proof, different commitment. The anchored
    // block does not contain it.
    mock.expect_get(UPGRADE_URI, Ok(tree_to_bytes(&bitcoin_tree(800_000))));
    queue_explorer(&mock, &commitment_abc, 800_000);
    let report = verify_detached_bytes(&ots, b"abd", &ctx, true).unwrap();
    assert!(!report.overall_valid, "tampered document must not verify");
}

#[test]
fn test_upgrade_file_rewrites_proof() {
    let mock = Arc::new(MockHttpClient::new());
    let dir = tempfile::tempdir().unwrap();
    let ots_path = dir.path().join("doc.txt.ots");
    let file = DetachedTimestampFile::new_nonced(NONCE, pending_tree());
    std::fs::write(&ots_path, file.to_bytes()).unwrap();

    mock.expect_get(UPGRADE_URI, Ok(tree_to_bytes(&bitcoin_tree(100))));
    let deps = UpgradeDeps {
        http: Arc::clone(&mock) as Arc<dyn HttpClient>,
        clock: Arc::new(FixedClock::at(1_700_000_000)) as Arc<dyn Clock>,
        config: test_config(),
    };

    let outcome = upgrade_file(&ots_path, &deps).unwrap();
    assert!(outcome.any_upgraded());

    let upgraded = DetachedTimestampFile::from_bytes(&std::fs::read(&ots_path).unwrap()).unwrap();
    assert_eq!(upgraded.tree().pending_count(), 0);
    assert!(upgraded.tree().has_anchored());
    // The nonce survives the rewrite.
    assert_eq!(upgraded.nonce(), Some(&NONCE[..]));
}

#[test]
fn test_upgrade_with_nothing_pending_reports_none() {
    let mock = Arc::new(MockHttpClient::new());
    let dir = tempfile::tempdir().unwrap();
    let ots_path = dir.path().join("doc.txt.ots");
    let file = DetachedTimestampFile::new_nonced(NONCE, bitcoin_tree(100));
    let original = file.to_bytes();
    std::fs::write(&ots_path, &original).unwrap();

    let deps = UpgradeDeps {
        http: Arc::clone(&mock) as Arc<dyn HttpClient>,
        clock: Arc::new(FixedClock::at(1_700_000_000)) as Arc<dyn Clock>,
        config: test_config(),
    };
    let outcome = upgrade_file(&ots_path, &deps).unwrap();
    assert!(!outcome.any_upgraded());
    // File untouched.
    assert_eq!(std::fs::read(&ots_path).unwrap(), original);
}

#[test]
fn test_info_reports_structure() {
    let mut tree = pending_tree();
    tree.ops.push((crate::op::Op::Sha256, bitcoin_tree(800_000)));
    let file = DetachedTimestampFile::new_nonced(NONCE, tree);

    let report = info_bytes(&file.to_bytes()).unwrap();
    assert_eq!(report.version, 1);
    assert_eq!(report.nonce.as_deref(), Some(hex::encode(NONCE).as_str()));
    assert!(!report.attached);
    assert_eq!(report.attestation_count, 2);
    assert_eq!(report.pending_count, 1);

    let rendered = report.render();
    assert!(rendered.contains("sha256"));
    assert!(rendered.contains("bitcoin block 800000"));
    assert!(rendered.contains("pending"));
}

#[test]
fn test_verify_attached_file() {
    let mock = Arc::new(MockHttpClient::new());
    let document = b"attached document";
    let commitment = expected_commitment(document);
    let file = DetachedTimestampFile::new_nonced(NONCE, bitcoin_tree(800_000));
    let attached = crate::codec::attach(document, &file);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.attached");
    std::fs::write(&path, &attached).unwrap();

    queue_explorer(&mock, &commitment, 800_000);
    let ctx = verify_ctx(&mock);
    let report = verify_files(&path, None, &ctx, false).unwrap();
    assert!(report.overall_valid);
}

#[test]
fn test_verify_detached_requires_document() {
    let mock = Arc::new(MockHttpClient::new());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.txt.ots");
    let file = DetachedTimestampFile::new_nonced(NONCE, bitcoin_tree(1));
    std::fs::write(&path, file.to_bytes()).unwrap();

    let ctx = verify_ctx(&mock);
    assert!(matches!(
        verify_files(&path, None, &ctx, false),
        Err(VerifyCommandError::MissingDocument)
    ));
}

#[test]
fn test_status_counts_and_probe() {
    let mock = Arc::new(MockHttpClient::new());
    let mut tree = pending_tree();
    tree.ops.push((crate::op::Op::Sha256, bitcoin_tree(800_000)));
    let file = DetachedTimestampFile::new_nonced(NONCE, tree);

    mock.expect_get(UPGRADE_URI, Ok(tree_to_bytes(&bitcoin_tree(800_000))));
    let http = Arc::clone(&mock) as Arc<dyn HttpClient>;
    let report = status_bytes(
        &file.to_bytes(),
        Some((&http, Duration::from_secs(5))),
    )
    .unwrap();

    assert_eq!(report.pending, 1);
    assert_eq!(report.anchored, 1);
    assert_eq!(report.bitcoin, 1);
    assert!(!report.fully_anchored());
    assert_eq!(report.calendars.len(), 1);
    assert_eq!(report.calendars[0].state, "ready");
}
