//! GitHub issue API.

use std::sync::Arc;

use async_trait::async_trait;

pub mod client;
pub mod types;

pub use client::{GithubClient, GithubConnector};
pub use types::{
    IssueDraft, Page, PageCursor, Query, RawIssue, RawLabel, RawMilestone, StatusFilter,
};

use crate::error::Result;
use crate::identity::Credential;

/// Issue tracker operations the board needs.
#[async_trait]
pub trait IssueApi: Send + Sync {
    /// First page of the issues matching `query`.
    async fn list_repo_issues(&self, query: &Query) -> Result<Page<RawIssue>>;

    /// Page following `cursor` of an issue listing.
    async fn next_issues(&self, cursor: &PageCursor) -> Result<Page<RawIssue>>;

    /// First page of a repository's milestones.
    async fn list_milestones(&self, owner: &str, repo: &str) -> Result<Page<RawMilestone>>;

    /// Page following `cursor` of a milestone listing.
    async fn next_milestones(&self, cursor: &PageCursor) -> Result<Page<RawMilestone>>;

    async fn create_issue(&self, owner: &str, repo: &str, draft: &IssueDraft) -> Result<RawIssue>;
}

/// Builds an API client acting as the holder of a credential.
#[async_trait]
pub trait ApiConnector: Send + Sync {
    async fn connect(&self, credential: &Credential) -> Result<Arc<dyn IssueApi>>;
}
