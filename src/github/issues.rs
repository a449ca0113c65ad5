//! Demo issue listing and mutations.
//!
//! Listing narrows to open issues carrying the demo label, optionally
//! filters to a creator, and enriches each issue with the repository URL
//! left by the provisioning automation in its success comment. A failed
//! enrichment never fails the batch; the issue simply has no link.

use super::{error_for_status, GithubClient, GITHUB_API_URL};
use crate::data::{Issue, DEMO_LABEL, HOLD_LABEL};
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use std::future::Future;

/// Remote issue operations, behind a trait so the reconciliation engine
/// can be exercised against a scripted client in tests.
pub trait IssueClient: Send + Sync {
    fn list_open_demo_issues(
        &self,
        creator: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Issue>>> + Send;
    fn close_issue(&self, number: u64) -> impl Future<Output = Result<()>> + Send;
    fn add_hold_label(&self, number: u64) -> impl Future<Output = Result<()>> + Send;
    fn remove_hold_label(&self, number: u64) -> impl Future<Output = Result<()>> + Send;
}

/// Comment phrase the automation leaves once a demo repository exists.
static SUCCESS_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)demo creation successful").expect("valid regex"));

static REPO_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://(?:www\.)?github\.com/[\w.-]+/[\w.-]+").expect("valid regex")
});

/// Enrichment fan-out width; demo lists are small, keep it modest.
const ENRICH_CONCURRENCY: usize = 5;

impl IssueClient for GithubClient {
    async fn list_open_demo_issues(&self, creator: Option<&str>) -> Result<Vec<Issue>> {
        let url = format!(
            "{}/repos/{}/{}/issues",
            GITHUB_API_URL,
            self.owner(),
            self.repo()
        );
        let response = self
            .get(&url)
            .query(&[("labels", DEMO_LABEL), ("state", "open"), ("per_page", "50")])
            .send()
            .await
            .context("Failed to reach GitHub")?;
        let response = error_for_status(response, "list demo issues")?;
        let issues: Vec<Issue> = response
            .json()
            .await
            .context("Failed to parse issue list")?;

        let filtered = filter_by_creator(issues, creator);

        // buffered() keeps fetch order while overlapping the comment calls.
        let enriched = stream::iter(filtered.into_iter().map(|issue| self.enrich(issue)))
            .buffered(ENRICH_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;
        Ok(enriched)
    }

    async fn close_issue(&self, number: u64) -> Result<()> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}",
            GITHUB_API_URL,
            self.owner(),
            self.repo(),
            number
        );
        let response = self
            .request(Method::PATCH, &url)
            .json(&serde_json::json!({ "state": "closed" }))
            .send()
            .await
            .context("Failed to reach GitHub")?;
        error_for_status(response, "close issue")?;
        Ok(())
    }

    async fn add_hold_label(&self, number: u64) -> Result<()> {
        // addLabels appends, so re-adding an existing label is a no-op.
        let url = format!(
            "{}/repos/{}/{}/issues/{}/labels",
            GITHUB_API_URL,
            self.owner(),
            self.repo(),
            number
        );
        let response = self
            .request(Method::POST, &url)
            .json(&serde_json::json!({ "labels": [HOLD_LABEL] }))
            .send()
            .await
            .context("Failed to reach GitHub")?;
        error_for_status(response, "add hold label")?;
        Ok(())
    }

    async fn remove_hold_label(&self, number: u64) -> Result<()> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}/labels/{}",
            GITHUB_API_URL,
            self.owner(),
            self.repo(),
            number,
            urlencoding::encode(HOLD_LABEL)
        );
        let response = self
            .request(Method::DELETE, &url)
            .send()
            .await
            .context("Failed to reach GitHub")?;
        if removal_resolved(response.status()) {
            Ok(())
        } else {
            anyhow::bail!("GitHub API error (remove hold label): {}", response.status())
        }
    }
}

impl GithubClient {
    async fn enrich(&self, mut issue: Issue) -> Issue {
        match self.find_demo_repo_url(issue.number).await {
            Ok(url) => issue.demo_repo_url = url,
            Err(e) => tracing::debug!("Failed to enrich issue #{}: {}", issue.number, e),
        }
        issue
    }

    /// Scan the issue's comments for the success marker and pull out the
    /// first repository URL. Demo issues are expected to have few comments,
    /// so one page of 100 is enough.
    async fn find_demo_repo_url(&self, number: u64) -> Result<Option<String>> {
        #[derive(Deserialize)]
        struct Comment {
            #[serde(default)]
            body: Option<String>,
        }

        let url = format!(
            "{}/repos/{}/{}/issues/{}/comments",
            GITHUB_API_URL,
            self.owner(),
            self.repo(),
            number
        );
        let response = self
            .get(&url)
            .query(&[("per_page", "100")])
            .send()
            .await
            .context("Failed to reach GitHub")?;
        let response = error_for_status(response, "list issue comments")?;
        let comments: Vec<Comment> = response
            .json()
            .await
            .context("Failed to parse comments")?;

        Ok(comments
            .iter()
            .filter_map(|c| c.body.as_deref())
            .find(|body| SUCCESS_MARKER.is_match(body))
            .and_then(extract_repo_url))
    }
}

/// Narrow a fetched list to issues authored by `creator`, if supplied.
pub fn filter_by_creator(issues: Vec<Issue>, creator: Option<&str>) -> Vec<Issue> {
    match creator {
        Some(login) => issues
            .into_iter()
            .filter(|i| i.author_login() == Some(login))
            .collect(),
        None => issues,
    }
}

/// First `github.com/owner/name` URL embedded in a comment body.
pub fn extract_repo_url(body: &str) -> Option<String> {
    REPO_URL.find(body).map(|m| m.as_str().to_string())
}

/// Removing an absent label answers 404; the desired end state already
/// holds, so that counts as resolved.
pub fn removal_resolved(status: StatusCode) -> bool {
    status.is_success() || status == StatusCode::NOT_FOUND
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_marker_is_case_insensitive() {
        assert!(SUCCESS_MARKER.is_match("🎉 Demo Creation Successful!"));
        assert!(SUCCESS_MARKER.is_match("demo creation successful"));
        assert!(!SUCCESS_MARKER.is_match("demo creation failed"));
    }

    #[test]
    fn extracts_first_repo_url() {
        let body = "Demo Creation Successful\nRepo: https://github.com/octodemo/demo-1 and \
                    https://github.com/octodemo/demo-2";
        assert_eq!(
            extract_repo_url(body),
            Some("https://github.com/octodemo/demo-1".to_string())
        );
        assert_eq!(extract_repo_url("no links here"), None);
    }

    #[test]
    fn removal_treats_not_found_as_resolved() {
        assert!(removal_resolved(StatusCode::OK));
        assert!(removal_resolved(StatusCode::NO_CONTENT));
        assert!(removal_resolved(StatusCode::NOT_FOUND));
        assert!(!removal_resolved(StatusCode::FORBIDDEN));
        assert!(!removal_resolved(StatusCode::UNPROCESSABLE_ENTITY));
    }
}
