//! GitHub issue API data types.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RawLabel {
    pub name: String,
}

/// An issue as returned by the API.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RawIssue {
    pub number: Option<u64>,
    #[serde(default)]
    pub title: String,
    pub html_url: Option<String>,
    #[serde(default)]
    pub labels: Vec<RawLabel>,
}

impl RawIssue {
    pub fn label_names(&self) -> Vec<&str> {
        self.labels.iter().map(|l| l.name.as_str()).collect()
    }
}

/// A milestone as returned by the API.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RawMilestone {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    pub html_url: Option<String>,
    #[serde(default)]
    pub open_issues: u64,
    #[serde(default)]
    pub closed_issues: u64,
}

/// Opaque "more pages exist" token handed out with a page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageCursor(String);

impl PageCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of a listing.
#[derive(Clone, Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<PageCursor>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }

    pub fn with_next(items: Vec<T>, next: PageCursor) -> Self {
        Self {
            items,
            next: Some(next),
        }
    }

    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

/// Label filter of a query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StatusFilter {
    SingleLabel(String),
    /// Ordered set: insertion order kept, duplicates dropped.
    LabelSet(Vec<String>),
    #[default]
    None,
}

impl StatusFilter {
    pub fn set<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for label in labels {
            let label = label.into();
            if !out.contains(&label) {
                out.push(label);
            }
        }
        StatusFilter::LabelSet(out)
    }

    pub fn labels(&self) -> Vec<&str> {
        match self {
            StatusFilter::SingleLabel(l) => vec![l.as_str()],
            StatusFilter::LabelSet(ls) => ls.iter().map(String::as_str).collect(),
            StatusFilter::None => Vec::new(),
        }
    }

    /// Value of the `labels` query parameter (comma separated, matches all).
    pub fn query_value(&self) -> Option<String> {
        match self {
            StatusFilter::None => None,
            other => Some(other.labels().join(",")),
        }
    }
}

/// A repository-scoped issue query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    pub owner: String,
    pub repo: String,
    pub milestone: Option<u64>,
    pub labels: StatusFilter,
    pub assignee: Option<String>,
    pub per_page: Option<u32>,
    pub page: Option<u32>,
}

impl Query {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            ..Default::default()
        }
    }

    pub fn milestone(mut self, number: Option<u64>) -> Self {
        self.milestone = number;
        self
    }

    pub fn labels(mut self, labels: StatusFilter) -> Self {
        self.labels = labels;
        self
    }

    pub fn assignee(mut self, login: impl Into<String>) -> Self {
        self.assignee = Some(login.into());
        self
    }

    pub fn per_page(mut self, size: u32) -> Self {
        self.per_page = Some(size);
        self
    }

    /// 1-based page number; only meaningful with [`Query::per_page`].
    pub fn page(mut self, number: u32) -> Self {
        self.page = Some(number);
        self
    }

    /// Query parameters for the issues listing endpoint.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(labels) = self.labels.query_value() {
            params.push(("labels", labels));
        }
        if let Some(milestone) = self.milestone {
            params.push(("milestone", milestone.to_string()));
        }
        if let Some(assignee) = &self.assignee {
            params.push(("assignee", assignee.clone()));
        }
        if let Some(per_page) = self.per_page {
            params.push(("per_page", per_page.to_string()));
        }
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        params
    }
}

/// Payload for creating an issue.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct IssueDraft {
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone: Option<u64>,
}
