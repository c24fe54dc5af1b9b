//! In-memory collaborators for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::board::DisplayBlock;
use crate::command::Transport;
use crate::error::{Error, Result};
use crate::github::{
    ApiConnector, IssueApi, IssueDraft, Page, PageCursor, Query, RawIssue, RawMilestone,
};
use crate::identity::{Credential, IdentityResolver};

pub fn issue(number: u64, title: &str) -> RawIssue {
    RawIssue {
        number: Some(number),
        title: title.to_string(),
        html_url: Some(format!("https://github.test/issues/{}", number)),
        ..Default::default()
    }
}

pub fn milestone(number: u64, title: &str) -> RawMilestone {
    RawMilestone {
        number,
        title: title.to_string(),
        html_url: Some(format!("https://github.test/milestone/{}", number)),
        open_issues: 1,
        closed_issues: 1,
    }
}

/// Issue pages keyed by the `labels` filter ("" for none). Cursors are
/// `issues|<key>|<index>` and `milestones|<index>`.
#[derive(Default)]
pub struct FakeApi {
    issue_pages: HashMap<String, Vec<Vec<RawIssue>>>,
    milestone_pages: Vec<Vec<RawMilestone>>,
    failing_labels: HashSet<String>,
    delays: HashMap<String, Duration>,
    next_calls: AtomicUsize,
    queries: Mutex<Vec<Query>>,
    created: Mutex<Vec<(String, String, IssueDraft)>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issue_pages(mut self, label: Option<&str>, pages: Vec<Vec<RawIssue>>) -> Self {
        self.issue_pages
            .insert(label.unwrap_or_default().to_string(), pages);
        self
    }

    pub fn with_milestone_pages(mut self, pages: Vec<Vec<RawMilestone>>) -> Self {
        self.milestone_pages = pages;
        self
    }

    pub fn failing_label(mut self, label: &str) -> Self {
        self.failing_labels.insert(label.to_string());
        self
    }

    pub fn with_delay(mut self, label: &str, delay: Duration) -> Self {
        self.delays.insert(label.to_string(), delay);
        self
    }

    pub fn next_calls(&self) -> usize {
        self.next_calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<Query> {
        self.queries.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<(String, String, IssueDraft)> {
        self.created.lock().unwrap().clone()
    }

    fn issue_page(&self, key: &str, index: usize) -> Page<RawIssue> {
        let pages = self.issue_pages.get(key).cloned().unwrap_or_default();
        let items = pages.get(index).cloned().unwrap_or_default();
        if index + 1 < pages.len() {
            Page::with_next(items, PageCursor::new(format!("issues|{}|{}", key, index + 1)))
        } else {
            Page::last(items)
        }
    }

    fn milestone_page(&self, index: usize) -> Page<RawMilestone> {
        let items = self
            .milestone_pages
            .get(index)
            .cloned()
            .unwrap_or_default();
        if index + 1 < self.milestone_pages.len() {
            Page::with_next(items, PageCursor::new(format!("milestones|{}", index + 1)))
        } else {
            Page::last(items)
        }
    }
}

#[async_trait]
impl IssueApi for FakeApi {
    async fn list_repo_issues(&self, query: &Query) -> Result<Page<RawIssue>> {
        self.queries.lock().unwrap().push(query.clone());
        let key = query.labels.query_value().unwrap_or_default();
        if let Some(delay) = self.delays.get(&key) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_labels.contains(&key) {
            return Err(Error::Fetch(format!("listing '{}' failed", key)));
        }
        Ok(self.issue_page(&key, 0))
    }

    async fn next_issues(&self, cursor: &PageCursor) -> Result<Page<RawIssue>> {
        self.next_calls.fetch_add(1, Ordering::SeqCst);
        let mut parts = cursor.as_str().split('|');
        let (_, key, index) = (parts.next(), parts.next(), parts.next());
        let key = key.unwrap_or_default();
        let index = index.and_then(|i| i.parse().ok()).unwrap_or(0);
        Ok(self.issue_page(key, index))
    }

    async fn list_milestones(&self, _owner: &str, _repo: &str) -> Result<Page<RawMilestone>> {
        Ok(self.milestone_page(0))
    }

    async fn next_milestones(&self, cursor: &PageCursor) -> Result<Page<RawMilestone>> {
        self.next_calls.fetch_add(1, Ordering::SeqCst);
        let index = cursor
            .as_str()
            .rsplit('|')
            .next()
            .and_then(|i| i.parse().ok())
            .unwrap_or(0);
        Ok(self.milestone_page(index))
    }

    async fn create_issue(&self, owner: &str, repo: &str, draft: &IssueDraft) -> Result<RawIssue> {
        self.created
            .lock()
            .unwrap()
            .push((owner.to_string(), repo.to_string(), draft.clone()));
        let mut created = issue(100, &draft.title);
        created.html_url = Some(format!("https://github.test/{}/{}/issues/100", owner, repo));
        Ok(created)
    }
}

/// Hands out one shared [`FakeApi`] and remembers the credentials used.
pub struct FakeConnector {
    pub api: Arc<FakeApi>,
    pub credentials: Mutex<Vec<String>>,
}

impl FakeConnector {
    pub fn new(api: Arc<FakeApi>) -> Self {
        Self {
            api,
            credentials: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ApiConnector for FakeConnector {
    async fn connect(&self, credential: &Credential) -> Result<Arc<dyn IssueApi>> {
        self.credentials
            .lock()
            .unwrap()
            .push(credential.expose().to_string());
        Ok(self.api.clone())
    }
}

/// Knows a single chat user, `me`, whose GitHub login is `octocat`.
#[derive(Default)]
pub struct FakeIdentity {
    pub calls: Mutex<Vec<String>>,
}

#[async_trait]
impl IdentityResolver for FakeIdentity {
    async fn token_for(&self, chat_user: &str) -> Result<Credential> {
        self.calls.lock().unwrap().push(format!("token:{}", chat_user));
        if chat_user == "me" {
            Ok(Credential::new("me-token"))
        } else {
            Err(Error::Credential(format!("unknown user {}", chat_user)))
        }
    }

    async fn github_user_and_token_for(&self, chat_user: &str) -> Result<(String, Credential)> {
        self.calls.lock().unwrap().push(format!("login:{}", chat_user));
        if chat_user == "me" {
            Ok(("octocat".to_string(), Credential::new("me-token")))
        } else {
            Err(Error::Credential(format!("unknown user {}", chat_user)))
        }
    }
}

#[derive(Default)]
pub struct RecordingTransport {
    pub delivered: Mutex<Vec<(String, Vec<DisplayBlock>)>>,
    pub notices: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn deliver(&self, room: &str, blocks: Vec<DisplayBlock>) {
        self.delivered
            .lock()
            .unwrap()
            .push((room.to_string(), blocks));
    }

    async fn notify(&self, room: &str, text: &str) {
        self.notices
            .lock()
            .unwrap()
            .push((room.to_string(), text.to_string()));
    }
}
