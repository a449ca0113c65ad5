use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label that marks an issue as a demo request.
pub const DEMO_LABEL: &str = "demo";

/// Lifecycle label that keeps a demo from being auto-cleaned.
pub const HOLD_LABEL: &str = "demo::lifecycle_hold";

/// A demo issue as fetched from GitHub, plus the derived demo repository
/// link extracted from the automation's success comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: IssueState,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub user: Option<IssueAuthor>,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub html_url: String,
    /// Not part of the GitHub payload; attached during comment enrichment.
    #[serde(default)]
    pub demo_repo_url: Option<String>,
}

impl Issue {
    /// Whether the lifecycle hold label is present.
    pub fn is_on_hold(&self) -> bool {
        self.labels.iter().any(|l| l.name == HOLD_LABEL)
    }

    pub fn author_login(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.login.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueAuthor {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

/// An issue template parsed from `.github/ISSUE_TEMPLATE`.
///
/// YAML issue forms carry no body; legacy Markdown templates keep whatever
/// follows the front-matter block.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub name: String,
    pub about: Option<String>,
    pub body: Option<String>,
    /// Original filename, used to deep-link into GitHub's new-issue UI.
    pub filename: String,
}

/// Mutation kinds tracked by the reconciliation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingAction {
    Close,
    Hold,
    Unhold,
}

impl PendingAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Close => "close",
            Self::Hold => "hold",
            Self::Unhold => "unhold",
        }
    }
}

/// A persisted record of an in-flight mutation, written before the remote
/// call is issued so a refresh racing the server's propagation lag can keep
/// showing the intended state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOperation {
    pub issue_id: u64,
    pub issue_number: u64,
    pub action: PendingAction,
    pub snapshot: Issue,
    pub created_at: DateTime<Utc>,
}

impl PendingOperation {
    pub fn new(issue: &Issue, action: PendingAction) -> Self {
        Self {
            issue_id: issue.id,
            issue_number: issue.number,
            action,
            snapshot: issue.clone(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue_with_labels(names: &[&str]) -> Issue {
        Issue {
            id: 1,
            number: 1,
            title: "demo".to_string(),
            body: None,
            state: IssueState::Open,
            updated_at: Utc::now(),
            user: None,
            labels: names
                .iter()
                .map(|n| Label {
                    name: n.to_string(),
                    color: String::new(),
                })
                .collect(),
            html_url: String::new(),
            demo_repo_url: None,
        }
    }

    #[test]
    fn hold_detection() {
        assert!(!issue_with_labels(&[DEMO_LABEL]).is_on_hold());
        assert!(issue_with_labels(&[DEMO_LABEL, HOLD_LABEL]).is_on_hold());
    }

    #[test]
    fn issue_deserializes_from_api_shape() {
        let raw = serde_json::json!({
            "id": 42,
            "number": 7,
            "title": "Demo: bootstrap",
            "state": "open",
            "updated_at": "2025-01-01T00:00:00Z",
            "user": { "login": "alice" },
            "labels": [{ "name": "demo", "color": "ededed" }],
            "html_url": "https://github.com/octodemo/bootstrap/issues/7"
        });
        let issue: Issue = serde_json::from_value(raw).unwrap();
        assert_eq!(issue.author_login(), Some("alice"));
        assert_eq!(issue.demo_repo_url, None);
    }
}
