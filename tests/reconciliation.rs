//! Reconciliation-pass properties: overlay correctness for hold/unhold,
//! close resolution, TTL pruning.

use chrono::{Duration, Utc};
use demodeck::data::{
    Issue, IssueAuthor, IssueState, Label, PendingAction, PendingOperation, HOLD_LABEL,
};
use demodeck::engine::{overlay_pending, prune_expired, PENDING_TTL_SECS};
use pretty_assertions::assert_eq;

fn make_issue(id: u64, labels: &[&str]) -> Issue {
    Issue {
        id,
        number: id,
        title: format!("Demo {}", id),
        body: None,
        state: IssueState::Open,
        updated_at: Utc::now(),
        user: Some(IssueAuthor {
            login: "alice".to_string(),
        }),
        labels: labels
            .iter()
            .map(|name| Label {
                name: name.to_string(),
                color: "ededed".to_string(),
            })
            .collect(),
        html_url: format!("https://github.com/octodemo/bootstrap/issues/{}", id),
        demo_repo_url: None,
    }
}

fn pending(issue: &Issue, action: PendingAction) -> PendingOperation {
    PendingOperation::new(issue, action)
}

fn hold_count(issue: &Issue) -> usize {
    issue.labels.iter().filter(|l| l.name == HOLD_LABEL).count()
}

#[test]
fn hold_overlay_adds_exactly_one_label() {
    let issue = make_issue(1, &["demo"]);
    let ops = vec![pending(&issue, PendingAction::Hold)];

    let (issues, kept) = overlay_pending(vec![issue], &ops);
    assert_eq!(hold_count(&issues[0]), 1);
    assert_eq!(kept.len(), 1);

    // Applying the overlay again must not duplicate the label.
    let (issues, _) = overlay_pending(issues, &ops);
    assert_eq!(hold_count(&issues[0]), 1);
}

#[test]
fn hold_overlay_is_noop_when_label_already_indexed() {
    let issue = make_issue(1, &["demo", HOLD_LABEL]);
    let ops = vec![pending(&issue, PendingAction::Hold)];
    let (issues, _) = overlay_pending(vec![issue], &ops);
    assert_eq!(hold_count(&issues[0]), 1);
}

#[test]
fn unhold_overlay_strips_all_hold_labels() {
    let issue = make_issue(2, &["demo", HOLD_LABEL]);
    let ops = vec![pending(&issue, PendingAction::Unhold)];
    let (issues, kept) = overlay_pending(vec![issue], &ops);
    assert_eq!(hold_count(&issues[0]), 0);
    // Unhold records ride until their mutator removes them or TTL expires.
    assert_eq!(kept.len(), 1);
}

#[test]
fn close_record_kept_while_issue_still_listed_open() {
    let issue = make_issue(3, &["demo"]);
    let ops = vec![pending(&issue, PendingAction::Close)];
    let (issues, kept) = overlay_pending(vec![issue], &ops);
    // No overlay for close; absence from the open set is the signal.
    assert_eq!(issues.len(), 1);
    assert_eq!(kept.len(), 1);
}

#[test]
fn close_record_dropped_once_issue_leaves_open_set() {
    let issue = make_issue(3, &["demo"]);
    let ops = vec![pending(&issue, PendingAction::Close)];
    let (issues, kept) = overlay_pending(vec![make_issue(4, &["demo"])], &ops);
    assert_eq!(issues.len(), 1);
    assert!(kept.is_empty());
}

#[test]
fn overlay_preserves_fetch_order() {
    let ordered = vec![make_issue(9, &["demo"]), make_issue(2, &["demo"]), make_issue(5, &["demo"])];
    let ops = vec![pending(&ordered[2], PendingAction::Hold)];
    let (issues, _) = overlay_pending(ordered, &ops);
    let ids: Vec<u64> = issues.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![9, 2, 5]);
}

#[test]
fn duplicate_rapid_operations_both_survive_overlay() {
    let issue = make_issue(6, &["demo"]);
    let ops = vec![
        pending(&issue, PendingAction::Hold),
        pending(&issue, PendingAction::Hold),
    ];
    let (issues, kept) = overlay_pending(vec![issue], &ops);
    // No dedup on append, still a single synthesized label.
    assert_eq!(kept.len(), 2);
    assert_eq!(hold_count(&issues[0]), 1);
}

#[test]
fn expired_operations_are_pruned_regardless_of_kind() {
    let issue = make_issue(7, &["demo"]);
    for action in [PendingAction::Close, PendingAction::Hold, PendingAction::Unhold] {
        let mut stale = pending(&issue, action);
        stale.created_at = Utc::now() - Duration::seconds(PENDING_TTL_SECS + 1);
        let fresh = pending(&issue, action);

        let kept = prune_expired(vec![stale, fresh]);
        assert_eq!(kept.len(), 1, "action {:?}", action);
        assert!((Utc::now() - kept[0].created_at).num_seconds() < PENDING_TTL_SECS);
    }
}
