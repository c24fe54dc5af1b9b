//! GitHub REST client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;

use super::types::{IssueDraft, Page, PageCursor, Query, RawIssue, RawMilestone};
use super::{ApiConnector, IssueApi};
use crate::config::GithubConfig;
use crate::error::{Error, Result};
use crate::identity::Credential;

const MILESTONES_PER_PAGE: &str = "100";

pub struct GithubClient {
    http: Client,
    api_base: String,
}

impl GithubClient {
    pub fn new(api_base: &str, credential: &Credential, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("issueboard"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        let auth = HeaderValue::from_str(&format!("Bearer {}", credential.expose().trim()))
            .map_err(|_| Error::Credential("token is not a valid header value".to_string()))?;
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    /// API URL for `segments`, each percent-encoded as a single path segment.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || s.chars().all(|c| c == '.'))
        {
            return Err(Error::Fetch(format!("invalid path segment '{}'", bad)));
        }

        let mut url = Url::parse(&self.api_base)
            .map_err(|e| Error::Config(format!("invalid github api_base: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config("github api_base cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_page<T>(&self, operation: &str, request: RequestBuilder) -> Result<Page<T>>
    where
        T: DeserializeOwned,
    {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Fetch(format!(
                "github api {} failed with status {}: {}",
                operation,
                status.as_u16(),
                truncate(&body, 400)
            )));
        }

        let next = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_next_link)
            .map(PageCursor::new);
        let items: Vec<T> = response
            .json()
            .await
            .map_err(|e| Error::Fetch(format!("failed to decode github {}: {}", operation, e)))?;

        let page = Page { items, next };
        tracing::trace!(
            operation,
            count = page.items.len(),
            more = page.has_more(),
            "github page"
        );
        Ok(page)
    }
}

#[async_trait]
impl IssueApi for GithubClient {
    async fn list_repo_issues(&self, query: &Query) -> Result<Page<RawIssue>> {
        let url = self.endpoint(&["repos", &query.owner, &query.repo, "issues"])?;
        let request = self.http.get(url).query(&query.params());
        self.get_page("list issues", request).await
    }

    async fn next_issues(&self, cursor: &PageCursor) -> Result<Page<RawIssue>> {
        let request = self.http.get(cursor.as_str());
        self.get_page("list issues", request).await
    }

    async fn list_milestones(&self, owner: &str, repo: &str) -> Result<Page<RawMilestone>> {
        let url = self.endpoint(&["repos", owner, repo, "milestones"])?;
        let request = self.http.get(url).query(&[("per_page", MILESTONES_PER_PAGE)]);
        self.get_page("list milestones", request).await
    }

    async fn next_milestones(&self, cursor: &PageCursor) -> Result<Page<RawMilestone>> {
        let request = self.http.get(cursor.as_str());
        self.get_page("list milestones", request).await
    }

    async fn create_issue(&self, owner: &str, repo: &str, draft: &IssueDraft) -> Result<RawIssue> {
        let url = self.endpoint(&["repos", owner, repo, "issues"])?;
        let response = self.http.post(url).json(draft).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Fetch(format!(
                "github api create issue failed with status {}: {}",
                status.as_u16(),
                truncate(&body, 400)
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Fetch(format!("failed to decode created issue: {}", e)))
    }
}

/// Connects a [`GithubClient`] per credential.
pub struct GithubConnector {
    api_base: String,
    timeout: Duration,
}

impl GithubConnector {
    pub fn new(config: &GithubConfig) -> Self {
        Self {
            api_base: config.api_base.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
        }
    }
}

#[async_trait]
impl ApiConnector for GithubConnector {
    async fn connect(&self, credential: &Credential) -> Result<Arc<dyn IssueApi>> {
        let client = GithubClient::new(&self.api_base, credential, self.timeout)?;
        Ok(Arc::new(client))
    }
}

/// Extract the `rel="next"` target of a `Link` header.
pub fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|p| {
            let p = p.trim();
            p == r#"rel="next""# || p == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(|t| t.to_string())
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
