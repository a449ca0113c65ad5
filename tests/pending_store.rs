//! Persisted pending-operation list behavior against the key/value store:
//! append/remove round trips, content-match removal, pruning on load, and
//! tolerance of a corrupt persisted value.

use chrono::{Duration, Utc};
use demodeck::data::{Issue, IssueState, PendingAction, PendingOperation};
use demodeck::engine::{Engine, PENDING_TTL_SECS};
use demodeck::github::IssueClient;
use demodeck::store::{KvStore, MemoryStore, KEY_PENDING_OPS};
use pretty_assertions::assert_eq;

/// The store tests never touch the network.
struct UnusedClient;

impl IssueClient for UnusedClient {
    async fn list_open_demo_issues(&self, _creator: Option<&str>) -> anyhow::Result<Vec<Issue>> {
        unreachable!("store tests must not hit the client")
    }
    async fn close_issue(&self, _number: u64) -> anyhow::Result<()> {
        unreachable!()
    }
    async fn add_hold_label(&self, _number: u64) -> anyhow::Result<()> {
        unreachable!()
    }
    async fn remove_hold_label(&self, _number: u64) -> anyhow::Result<()> {
        unreachable!()
    }
}

fn make_issue(id: u64) -> Issue {
    Issue {
        id,
        number: id,
        title: format!("Demo {}", id),
        body: None,
        state: IssueState::Open,
        updated_at: Utc::now(),
        user: None,
        labels: vec![],
        html_url: String::new(),
        demo_repo_url: None,
    }
}

fn engine() -> Engine<UnusedClient, MemoryStore> {
    Engine::new(UnusedClient, MemoryStore::new())
}

#[test]
fn append_then_load_round_trips() {
    let engine = engine();
    engine.append_pending(PendingOperation::new(&make_issue(1), PendingAction::Hold));
    engine.append_pending(PendingOperation::new(&make_issue(2), PendingAction::Close));

    let ops = engine.load_pending();
    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0].issue_id, 1);
    assert_eq!(ops[0].action, PendingAction::Hold);
    assert_eq!(ops[1].issue_id, 2);
    assert_eq!(ops[1].snapshot.number, 2);
}

#[test]
fn remove_matches_on_id_and_action() {
    let engine = engine();
    let issue = make_issue(1);
    engine.append_pending(PendingOperation::new(&issue, PendingAction::Hold));
    engine.append_pending(PendingOperation::new(&issue, PendingAction::Unhold));
    engine.append_pending(PendingOperation::new(&make_issue(2), PendingAction::Hold));

    engine.remove_pending(1, PendingAction::Hold);

    let ops = engine.load_pending();
    assert_eq!(ops.len(), 2);
    assert!(ops
        .iter()
        .all(|op| !(op.issue_id == 1 && op.action == PendingAction::Hold)));
}

#[test]
fn duplicate_appends_are_not_deduplicated() {
    let engine = engine();
    let issue = make_issue(1);
    engine.append_pending(PendingOperation::new(&issue, PendingAction::Hold));
    engine.append_pending(PendingOperation::new(&issue, PendingAction::Hold));
    assert_eq!(engine.load_pending().len(), 2);
}

#[test]
fn load_prunes_expired_entries() {
    let engine = engine();
    let mut stale = PendingOperation::new(&make_issue(1), PendingAction::Hold);
    stale.created_at = Utc::now() - Duration::seconds(PENDING_TTL_SECS + 60);
    engine.append_pending(stale);
    engine.append_pending(PendingOperation::new(&make_issue(2), PendingAction::Hold));

    let ops = engine.load_pending();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].issue_id, 2);
}

#[test]
fn corrupt_persisted_list_is_discarded() {
    let store = MemoryStore::new();
    store.set(KEY_PENDING_OPS, "not json at all").unwrap();
    let engine = Engine::new(UnusedClient, store);
    assert!(engine.load_pending().is_empty());

    // The engine recovers: appends land on a fresh list.
    engine.append_pending(PendingOperation::new(&make_issue(1), PendingAction::Close));
    assert_eq!(engine.load_pending().len(), 1);
}

#[test]
fn reconcile_persists_the_filtered_list() {
    let store = MemoryStore::new();
    let engine = Engine::new(UnusedClient, store);
    let gone = make_issue(1);
    let still_open = make_issue(2);
    engine.append_pending(PendingOperation::new(&gone, PendingAction::Close));
    engine.append_pending(PendingOperation::new(&still_open, PendingAction::Hold));

    // Issue 1 no longer in the open set: its close record resolves.
    let issues = engine.reconcile(vec![still_open.clone()]);
    assert_eq!(issues.len(), 1);
    assert!(issues[0].is_on_hold());

    let ops = engine.load_pending();
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].issue_id, 2);
}
