//! Concurrent per-label board fetch.

use std::sync::Arc;

use tokio::task::JoinSet;

use super::pagination::collect_issues;
use crate::error::{Error, Result};
use crate::github::{IssueApi, Query, RawIssue, StatusFilter};

/// Issues grouped by label, in the order the labels were requested.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoardResult {
    columns: Vec<(String, Vec<RawIssue>)>,
}

impl BoardResult {
    pub fn from_columns(columns: Vec<(String, Vec<RawIssue>)>) -> Self {
        Self { columns }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[RawIssue])> {
        self.columns
            .iter()
            .map(|(label, issues)| (label.as_str(), issues.as_slice()))
    }
}

/// Fetch every label's issues concurrently, one fully paginated listing per label.
///
/// Fails as soon as any label fetch fails. With several failures in flight,
/// which one is reported depends on completion order and is not deterministic.
/// Fetches still running at that point are aborted when the join set drops.
pub async fn fetch_board(
    api: Arc<dyn IssueApi>,
    owner: &str,
    repo: &str,
    milestone: Option<u64>,
    labels: &[String],
) -> Result<BoardResult> {
    let labels = match StatusFilter::set(labels.iter().cloned()) {
        StatusFilter::LabelSet(labels) => labels,
        _ => Vec::new(),
    };

    let mut set = JoinSet::new();
    for (index, label) in labels.iter().enumerate() {
        let api = Arc::clone(&api);
        let query = Query::new(owner, repo)
            .milestone(milestone)
            .labels(StatusFilter::SingleLabel(label.clone()));
        set.spawn(async move {
            let result = collect_issues(api.as_ref(), &query).await;
            (index, result)
        });
    }
    tracing::debug!(owner, repo, ?milestone, labels = labels.len(), "board fan-out launched");

    let mut slots: Vec<Option<Vec<RawIssue>>> = vec![None; labels.len()];
    while let Some(joined) = set.join_next().await {
        let (index, result) =
            joined.map_err(|e| Error::Fetch(format!("label fetch task failed: {}", e)))?;
        match result {
            Ok(issues) => slots[index] = Some(issues),
            Err(e) => {
                let label = labels[index].clone();
                tracing::warn!(%label, error = %e, "label fetch failed");
                return Err(Error::Fanout {
                    label,
                    source: Box::new(e),
                });
            }
        }
    }

    let columns = labels
        .into_iter()
        .zip(slots)
        .map(|(label, issues)| (label, issues.unwrap_or_default()))
        .collect();
    Ok(BoardResult::from_columns(columns))
}
