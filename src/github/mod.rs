//! GitHub REST client for the fixed demo repository.

pub mod issues;
pub mod templates;

pub use issues::IssueClient;
pub use templates::{load_templates, TemplateCache};

use anyhow::{Context, Result};
use base64::Engine as _;
use once_cell::sync::Lazy;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

const GITHUB_API_URL: &str = "https://api.github.com";

/// Demo catalog repository; fixed in this version.
pub const REPO_OWNER: &str = "octodemo";
pub const REPO_NAME: &str = "bootstrap";

/// Shared HTTP client for all API requests to enable connection pooling
pub static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(5)
        .build()
        .expect("Failed to create HTTP client")
});

#[derive(Clone)]
pub struct GithubClient {
    token: String,
    owner: String,
    repo: String,
}

// Manual so the token can never leak through debug logging.
impl std::fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubClient")
            .field("token", &"<redacted>")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .finish()
    }
}

impl GithubClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::for_repo(token, REPO_OWNER, REPO_NAME)
    }

    pub fn for_repo(
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// `owner/repo`, used as the template cache key.
    pub fn coordinate(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Deep link into GitHub's new-issue UI with a template preselected.
    pub fn new_issue_url(&self, template_filename: &str) -> String {
        format!(
            "https://github.com/{}/{}/issues/new?template={}",
            self.owner,
            self.repo,
            urlencoding::encode(template_filename)
        )
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        HTTP_CLIENT
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "demodeck")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::GET, url)
    }

    /// Resolve the login associated with the supplied token.
    pub async fn get_authenticated_user(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct User {
            login: String,
        }

        let response = self
            .get(&format!("{}/user", GITHUB_API_URL))
            .send()
            .await
            .context("Failed to reach GitHub")?;
        let response = error_for_status(response, "resolve authenticated user")?;
        let user: User = response
            .json()
            .await
            .context("Failed to parse authenticated user")?;
        Ok(user.login)
    }

    /// List a directory of the repository at `main`. A 404 means the
    /// directory does not exist and yields `None` rather than an error.
    pub async fn list_directory(&self, path: &str) -> Result<Option<Vec<ContentEntry>>> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            GITHUB_API_URL, self.owner, self.repo, path
        );
        let response = self
            .get(&url)
            .query(&[("ref", "main")])
            .send()
            .await
            .context("Failed to reach GitHub")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = error_for_status(response, "list directory")?;
        let value: serde_json::Value =
            response.json().await.context("Failed to parse directory listing")?;
        // A non-directory path answers with an object instead of an array.
        Ok(Some(
            serde_json::from_value::<Vec<ContentEntry>>(value).unwrap_or_default(),
        ))
    }

    /// Fetch a file's decoded content at `main`.
    pub async fn file_content(&self, path: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct FileContent {
            content: String,
            #[serde(default)]
            encoding: String,
        }

        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            GITHUB_API_URL, self.owner, self.repo, path
        );
        let response = self
            .get(&url)
            .query(&[("ref", "main")])
            .send()
            .await
            .context("Failed to reach GitHub")?;
        let response = error_for_status(response, "fetch file content")?;
        let file: FileContent = response
            .json()
            .await
            .with_context(|| format!("Unexpected content shape for {}", path))?;

        if file.encoding == "base64" {
            decode_base64_content(&file.content)
                .with_context(|| format!("Failed to decode base64 for {}", path))
        } else {
            Ok(file.content)
        }
    }
}

/// One entry of a contents-API directory listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ContentEntry {
    pub fn is_file(&self) -> bool {
        self.kind == "file"
    }
}

/// The contents API wraps base64 payloads across lines.
fn decode_base64_content(content: &str) -> Result<String> {
    let compact: String = content.split_whitespace().collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .context("invalid base64")?;
    String::from_utf8(bytes).context("file content is not UTF-8")
}

fn error_for_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        anyhow::bail!("GitHub API error ({}): {}", what, response.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wrapped_base64() {
        // "name: Bug Report\n" wrapped the way the contents API wraps it
        let wrapped = "bmFtZTogQnVn\nIFJlcG9ydAo=\n";
        assert_eq!(decode_base64_content(wrapped).unwrap(), "name: Bug Report\n");
    }

    #[test]
    fn debug_output_redacts_the_token() {
        let client = GithubClient::new("ghp_secret_value");
        let printed = format!("{:?}", client);
        assert!(!printed.contains("ghp_secret_value"));
        assert!(printed.contains("<redacted>"));
        assert!(printed.contains("octodemo"));
    }

    #[test]
    fn new_issue_url_encodes_filename() {
        let client = GithubClient::new("t");
        assert_eq!(
            client.new_issue_url("bug report.yml"),
            "https://github.com/octodemo/bootstrap/issues/new?template=bug%20report.yml"
        );
    }
}
