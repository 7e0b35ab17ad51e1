use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::adapter::{FixedClock, HttpError, MockHttpClient};
use crate::attestation::Attestation;
use crate::codec::tree_to_bytes;
use crate::config::{SubmitConfig, SubmitStrategy};
use crate::op::Op;
use crate::timestamp::Timestamp;

const TIMEOUT: Duration = Duration::from_secs(5);

fn pending_tree(uri: &str) -> Tree {
    let mut tree = Tree::new();
    tree.add_attestation(Attestation::Pending {
        uri: uri.to_string(),
    });
    tree
}

fn bitcoin_tree(height: u64) -> Tree {
    let mut tree = Tree::new();
    tree.add_attestation(Attestation::Bitcoin { height });
    tree
}

fn clients(mock: &Arc<MockHttpClient>, urls: &[&str]) -> Vec<CalendarClient> {
    urls.iter()
        .map(|url| {
            CalendarClient::new(
                *url,
                Arc::clone(mock) as Arc<dyn HttpClient>,
                TIMEOUT,
            )
        })
        .collect()
}

fn submit_config(strategy: SubmitStrategy) -> SubmitConfig {
    SubmitConfig {
        strategy,
        deadline_secs: 5,
        ..SubmitConfig::default()
    }
}

#[test]
fn test_client_posts_commitment_to_digest() {
    let mock = Arc::new(MockHttpClient::new());
    mock.expect_post(
        "https://cal-a.example/digest",
        Ok(tree_to_bytes(&pending_tree("https://cal-a.example/timestamp/aa"))),
    );
    let client = CalendarClient::new(
        "https://cal-a.example/",
        Arc::clone(&mock) as Arc<dyn HttpClient>,
        TIMEOUT,
    );

    let tree = client.submit(&[0xab; 32]).unwrap();
    assert_eq!(tree.pending_count(), 1);

    let requests = mock.requests();
    assert_eq!(requests[0].url, "https://cal-a.example/digest");
    assert_eq!(requests[0].body, vec![0xab; 32]);
}

#[test]
fn test_client_lookup_uses_hex_digest() {
    let mock = Arc::new(MockHttpClient::new());
    mock.expect_get(
        "https://cal-a.example/timestamp/0102",
        Ok(tree_to_bytes(&bitcoin_tree(5))),
    );
    let client = CalendarClient::new(
        "https://cal-a.example",
        Arc::clone(&mock) as Arc<dyn HttpClient>,
        TIMEOUT,
    );
    let tree = client.lookup(&[0x01, 0x02]).unwrap();
    assert!(tree.has_anchored());
}

#[test]
fn test_undecodable_response_is_parse_error() {
    let mock = Arc::new(MockHttpClient::new());
    mock.expect_post("https://cal-a.example/digest", Ok(vec![0x00, 0x99]));
    let client = CalendarClient::new(
        "https://cal-a.example",
        mock as Arc<dyn HttpClient>,
        TIMEOUT,
    );
    assert!(matches!(
        client.submit(&[1, 2, 3]),
        Err(CalendarError::Parse { .. })
    ));
}

#[test]
fn test_submit_merges_all_responses() {
    let mock = Arc::new(MockHttpClient::new());
    mock.expect_post(
        "https://cal-a.example/digest",
        Ok(tree_to_bytes(&pending_tree("https://cal-a.example/timestamp/aa"))),
    );
    mock.expect_post(
        "https://cal-b.example/digest",
        Ok(tree_to_bytes(&pending_tree("https://cal-b.example/timestamp/bb"))),
    );

    let mut timestamp = Timestamp::new(vec![7; 32]);
    let outcome = submit_to_all(
        &mut timestamp,
        clients(&mock, &["https://cal-a.example", "https://cal-b.example"]),
        &submit_config(SubmitStrategy::All),
    );

    assert_eq!(outcome.successful.len(), 2);
    assert!(outcome.is_satisfied());
    assert_eq!(timestamp.root().pending_count(), 2);
}

#[test]
fn test_quorum_two_of_three_succeeds() {
    let mock = Arc::new(MockHttpClient::new());
    mock.expect_post(
        "https://cal-a.example/digest",
        Ok(tree_to_bytes(&pending_tree("https://cal-a.example/timestamp/aa"))),
    );
    mock.expect_post(
        "https://cal-b.example/digest",
        Ok(tree_to_bytes(&pending_tree("https://cal-b.example/timestamp/bb"))),
    );
    // cal-c has no queued response: transport failure.

    let mut timestamp = Timestamp::new(vec![7; 32]);
    let outcome = submit_to_all(
        &mut timestamp,
        clients(
            &mock,
            &[
                "https://cal-a.example",
                "https://cal-b.example",
                "https://cal-c.example",
            ],
        ),
        &submit_config(SubmitStrategy::Quorum { required: 2 }),
    )
    .into_result()
    .unwrap();

    assert_eq!(outcome.successful.len(), 2);
    assert_eq!(timestamp.root().pending_count(), 2);
}

#[test]
fn test_quorum_three_of_three_fails_with_one_down() {
    let mock = Arc::new(MockHttpClient::new());
    mock.expect_post(
        "https://cal-a.example/digest",
        Ok(tree_to_bytes(&pending_tree("https://cal-a.example/timestamp/aa"))),
    );
    mock.expect_post(
        "https://cal-b.example/digest",
        Ok(tree_to_bytes(&pending_tree("https://cal-b.example/timestamp/bb"))),
    );

    let mut timestamp = Timestamp::new(vec![7; 32]);
    let result = submit_to_all(
        &mut timestamp,
        clients(
            &mock,
            &[
                "https://cal-a.example",
                "https://cal-b.example",
                "https://cal-c.example",
            ],
        ),
        &submit_config(SubmitStrategy::Quorum { required: 3 }),
    )
    .into_result();

    assert!(matches!(
        result,
        Err(CalendarError::QuorumNotReached {
            required: 3,
            successful: 2
        })
    ));
}

#[test]
fn test_first_success_stops_early() {
    let mock = Arc::new(MockHttpClient::new());
    mock.expect_post(
        "https://cal-a.example/digest",
        Ok(tree_to_bytes(&pending_tree("https://cal-a.example/timestamp/aa"))),
    );
    mock.expect_post(
        "https://cal-b.example/digest",
        Ok(tree_to_bytes(&pending_tree("https://cal-b.example/timestamp/bb"))),
    );

    let mut timestamp = Timestamp::new(vec![7; 32]);
    let outcome = submit_to_all(
        &mut timestamp,
        clients(&mock, &["https://cal-a.example", "https://cal-b.example"]),
        &submit_config(SubmitStrategy::FirstSuccess),
    );

    assert!(outcome.is_satisfied());
    assert_eq!(outcome.successful.len(), 1);
    assert_eq!(timestamp.root().pending_count(), 1);
}

#[test]
fn test_submit_with_no_calendars() {
    let mut timestamp = Timestamp::new(vec![7; 32]);
    let outcome = submit_to_all(
        &mut timestamp,
        Vec::new(),
        &submit_config(SubmitStrategy::All),
    );
    assert!(!outcome.is_satisfied());
    assert!(outcome.into_result().is_err());
}

#[test]
fn test_all_calendars_failing_reports_each() {
    let mock = Arc::new(MockHttpClient::new());
    mock.expect_post(
        "https://cal-a.example/digest",
        Err(HttpError::Status {
            url: "https://cal-a.example/digest".to_string(),
            status: 500,
        }),
    );

    let mut timestamp = Timestamp::new(vec![7; 32]);
    let outcome = submit_to_all(
        &mut timestamp,
        clients(&mock, &["https://cal-a.example", "https://cal-b.example"]),
        &submit_config(SubmitStrategy::All),
    );

    assert!(outcome.successful.is_empty());
    assert_eq!(outcome.failed.len(), 2);
    assert!(timestamp.root().is_empty());
}

// --- upgrade -----------------------------------------------------------

fn tracker(clock: &Arc<FixedClock>, cooldown: u64) -> UpgradeTracker {
    UpgradeTracker::new(cooldown, Arc::clone(clock) as Arc<dyn crate::adapter::Clock>)
}

#[test]
fn test_find_pending_pairs_uri_with_message() {
    let mut child = pending_tree("https://cal-a.example/timestamp/aa");
    child.add_attestation(Attestation::Bitcoin { height: 4 });
    let mut tree = Tree::new();
    tree.ops.push((Op::Sha256, child));

    let msg = b"leaf".to_vec();
    let found = find_pending(&tree, &msg).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].uri, "https://cal-a.example/timestamp/aa");
    assert_eq!(found[0].message, Op::Sha256.apply(&msg).unwrap());
}

#[test]
fn test_upgrade_replaces_pending_with_anchor() {
    let uri = "https://cal-a.example/timestamp/aa";
    let mock = Arc::new(MockHttpClient::new());
    mock.expect_get(uri, Ok(tree_to_bytes(&bitcoin_tree(100))));

    let mut tree = pending_tree(uri);
    let clock = Arc::new(FixedClock::at(10_000));
    let mut tracker = tracker(&clock, 300);

    let http = Arc::clone(&mock) as Arc<dyn HttpClient>;
    let outcome = upgrade_tree(&mut tree, &http, TIMEOUT, &mut tracker);

    assert_eq!(outcome.upgraded, 1);
    assert_eq!(tree.pending_count(), 0);
    assert_eq!(tree.attestations, vec![Attestation::Bitcoin { height: 100 }]);
}

#[test]
fn test_upgrade_keeps_pending_on_pending_only_response() {
    let uri = "https://cal-a.example/timestamp/aa";
    let mock = Arc::new(MockHttpClient::new());
    mock.expect_get(uri, Ok(tree_to_bytes(&pending_tree(uri))));

    let mut tree = pending_tree(uri);
    let clock = Arc::new(FixedClock::at(10_000));
    let mut tracker = tracker(&clock, 300);

    let http = Arc::clone(&mock) as Arc<dyn HttpClient>;
    let outcome = upgrade_tree(&mut tree, &http, TIMEOUT, &mut tracker);

    assert_eq!(outcome.upgraded, 0);
    assert_eq!(outcome.still_pending, 1);
    assert_eq!(tree.pending_count(), 1);
}

#[test]
fn test_upgrade_failure_does_not_poison_siblings() {
    let down = "https://cal-a.example/timestamp/aa";
    let up = "https://cal-b.example/timestamp/bb";
    let mock = Arc::new(MockHttpClient::new());
    mock.expect_get(up, Ok(tree_to_bytes(&bitcoin_tree(200))));
    // `down` has nothing queued: transport error.

    let mut tree = pending_tree(down);
    tree.add_attestation(Attestation::Pending {
        uri: up.to_string(),
    });
    let clock = Arc::new(FixedClock::at(10_000));
    let mut tracker = tracker(&clock, 300);

    let http = Arc::clone(&mock) as Arc<dyn HttpClient>;
    let outcome = upgrade_tree(&mut tree, &http, TIMEOUT, &mut tracker);

    assert_eq!(outcome.upgraded, 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(tree.pending_count(), 1);
    assert!(tree.has_anchored());
}

#[test]
fn test_upgrade_cooldown_blocks_retry_until_elapsed() {
    let uri = "https://cal-a.example/timestamp/aa";
    let mock = Arc::new(MockHttpClient::new());
    // First attempt fails, second (after cooldown) succeeds.
    mock.expect_get(
        uri,
        Err(HttpError::Status {
            url: uri.to_string(),
            status: 404,
        }),
    );
    mock.expect_get(uri, Ok(tree_to_bytes(&bitcoin_tree(300))));

    let mut tree = pending_tree(uri);
    let clock = Arc::new(FixedClock::at(0));
    let mut tracker = tracker(&clock, 300);
    let http = Arc::clone(&mock) as Arc<dyn HttpClient>;

    let first = upgrade_tree(&mut tree, &http, TIMEOUT, &mut tracker);
    assert_eq!(first.upgraded, 0);
    assert_eq!(first.failures.len(), 1);

    // Within cooldown: no request goes out.
    let second = upgrade_tree(&mut tree, &http, TIMEOUT, &mut tracker);
    assert_eq!(second.failures.len(), 0);
    assert_eq!(mock.request_count(), 1);

    clock.advance(300);
    let third = upgrade_tree(&mut tree, &http, TIMEOUT, &mut tracker);
    assert_eq!(third.upgraded, 1);
    assert_eq!(tree.pending_count(), 0);
}
