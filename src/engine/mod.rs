//! Pending-operation reconciliation.
//!
//! Closing an issue or toggling its hold label is not instantly visible in
//! the next list fetch; the label index and search lag behind. A naive
//! mutate-then-refetch briefly shows the issue snapping back to its old
//! state. Every mutation therefore writes a persisted [`PendingOperation`]
//! before the remote call goes out, and every fetched list is merged
//! against the still-pending records before rendering:
//!
//! - `hold` / `unhold` synthetically add or strip the hold label on the
//!   fetched copy until the record is removed or times out.
//! - `close` records are kept only while the issue still appears in the
//!   fetched open set; once it is gone the close has propagated and the
//!   record is dropped as resolved.
//!
//! The mutator removes its own record right after the refresh it triggers,
//! so the overlay smooths exactly that refresh; background polls ride on
//! real server propagation, with the 10-minute TTL covering the gap.

use crate::data::{Issue, Label, PendingAction, PendingOperation, HOLD_LABEL};
use crate::github::IssueClient;
use crate::store::{KvStore, KEY_PENDING_OPS};
use anyhow::Result;
use chrono::Utc;
use std::collections::HashMap;

/// Pending operations older than this are discarded on every read.
pub const PENDING_TTL_SECS: i64 = 10 * 60;

/// State transitions the presentation layer subscribes to.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A mutation was dispatched; disable the issue's controls.
    OperationStarted { issue_id: u64 },
    /// The remote call succeeded (server state may still lag).
    OperationSucceeded { issue_id: u64, action: PendingAction },
    /// The remote call failed; the pending record was rolled back.
    OperationFailed {
        issue_id: u64,
        action: PendingAction,
        error: String,
    },
    /// A reconciled issue list is ready to render.
    ListRefreshed(Vec<Issue>),
    /// The list fetch itself failed; keep the previous list.
    RefreshFailed(String),
}

pub struct Engine<C, S> {
    client: C,
    store: S,
}

impl<C: IssueClient, S: KvStore> Engine<C, S> {
    pub fn new(client: C, store: S) -> Self {
        Self { client, store }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Read the persisted pending list, discarding expired entries.
    /// An unreadable list is dropped rather than wedging every refresh.
    pub fn load_pending(&self) -> Vec<PendingOperation> {
        let Some(raw) = self.store.get(KEY_PENDING_OPS) else {
            return Vec::new();
        };
        let ops: Vec<PendingOperation> = match serde_json::from_str(&raw) {
            Ok(ops) => ops,
            Err(e) => {
                tracing::warn!("Discarding unreadable pending-operation list: {}", e);
                return Vec::new();
            }
        };
        prune_expired(ops)
    }

    fn save_pending(&self, ops: &[PendingOperation]) {
        match serde_json::to_string(ops) {
            Ok(json) => {
                if let Err(e) = self.store.set(KEY_PENDING_OPS, &json) {
                    tracing::warn!("Failed to persist pending operations: {}", e);
                }
            }
            Err(e) => tracing::warn!("Failed to encode pending operations: {}", e),
        }
    }

    /// Append a record. The list is re-read from storage immediately before
    /// writing; concurrent flows in close succession can still race, which
    /// is accepted best-effort behavior.
    pub fn append_pending(&self, op: PendingOperation) {
        let mut ops = self.load_pending();
        ops.push(op);
        self.save_pending(&ops);
    }

    /// Remove records by content match (issue id + action kind). Rapid
    /// duplicate actions append duplicate records; one removal clears them
    /// all, which is harmless since they would overlay identically.
    pub fn remove_pending(&self, issue_id: u64, action: PendingAction) {
        let mut ops = self.load_pending();
        ops.retain(|op| !(op.issue_id == issue_id && op.action == action));
        self.save_pending(&ops);
    }

    /// Fetch the open demo list and run a reconciliation pass over it.
    pub async fn refresh(&self, creator: Option<&str>) -> Result<Vec<Issue>> {
        let fetched = self.client.list_open_demo_issues(creator).await?;
        Ok(self.reconcile(fetched))
    }

    /// Merge still-pending operations into a freshly fetched list and
    /// persist the filtered (still relevant) records back.
    pub fn reconcile(&self, fetched: Vec<Issue>) -> Vec<Issue> {
        let pending = self.load_pending();
        let (issues, kept) = overlay_pending(fetched, &pending);
        self.save_pending(&kept);
        issues
    }

    /// Shared mutation flow for close / hold / unhold. Returns the events
    /// to surface, in emission order. The caller applies
    /// [`EngineEvent::OperationStarted`] itself before dispatching so the
    /// UI reacts before the network round-trip.
    pub async fn run_mutation(
        &self,
        issue: &Issue,
        action: PendingAction,
        creator: Option<&str>,
    ) -> Vec<EngineEvent> {
        self.append_pending(PendingOperation::new(issue, action));

        let result = match action {
            PendingAction::Close => self.client.close_issue(issue.number).await,
            PendingAction::Hold => self.client.add_hold_label(issue.number).await,
            PendingAction::Unhold => self.client.remove_hold_label(issue.number).await,
        };

        let mut events = Vec::new();
        match result {
            Ok(()) => {
                events.push(EngineEvent::OperationSucceeded {
                    issue_id: issue.id,
                    action,
                });
                events.push(self.refresh_event(creator).await);
                self.remove_pending(issue.id, action);
            }
            Err(e) => {
                // Refresh anyway so the list reflects true server state,
                // then roll the record back and surface the failure.
                events.push(self.refresh_event(creator).await);
                self.remove_pending(issue.id, action);
                events.push(EngineEvent::OperationFailed {
                    issue_id: issue.id,
                    action,
                    error: e.to_string(),
                });
            }
        }
        events
    }

    async fn refresh_event(&self, creator: Option<&str>) -> EngineEvent {
        match self.refresh(creator).await {
            Ok(issues) => EngineEvent::ListRefreshed(issues),
            Err(e) => EngineEvent::RefreshFailed(e.to_string()),
        }
    }
}

/// Drop operations past the 10-minute TTL.
pub fn prune_expired(ops: Vec<PendingOperation>) -> Vec<PendingOperation> {
    let now = Utc::now();
    ops.into_iter()
        .filter(|op| (now - op.created_at).num_seconds() < PENDING_TTL_SECS)
        .collect()
}

/// The reconciliation pass proper, pure over its inputs: returns the
/// overlaid issue list (fetch order preserved) and the records still worth
/// keeping.
pub fn overlay_pending(
    fetched: Vec<Issue>,
    pending: &[PendingOperation],
) -> (Vec<Issue>, Vec<PendingOperation>) {
    let mut issues = fetched;
    let index: HashMap<u64, usize> = issues
        .iter()
        .enumerate()
        .map(|(i, issue)| (issue.id, i))
        .collect();

    let mut kept = Vec::with_capacity(pending.len());
    for op in pending {
        match op.action {
            PendingAction::Close => {
                // Still listed open means the close has not propagated yet.
                // Gone from the open set means resolved; drop the record.
                if index.contains_key(&op.issue_id) {
                    kept.push(op.clone());
                }
            }
            PendingAction::Hold => {
                if let Some(&i) = index.get(&op.issue_id) {
                    let issue = &mut issues[i];
                    // Set-like insertion: applying the overlay twice must
                    // not duplicate the label.
                    if !issue.is_on_hold() {
                        issue.labels.push(Label {
                            name: HOLD_LABEL.to_string(),
                            color: String::new(),
                        });
                    }
                }
                kept.push(op.clone());
            }
            PendingAction::Unhold => {
                if let Some(&i) = index.get(&op.issue_id) {
                    issues[i].labels.retain(|l| l.name != HOLD_LABEL);
                }
                kept.push(op.clone());
            }
        }
    }
    (issues, kept)
}
