//! Exhausting paged listings.

use std::future::Future;

use crate::error::Result;
use crate::github::{IssueApi, Page, PageCursor, Query, RawIssue, RawMilestone};

/// Follow `first` to the last page, concatenating items in page order.
///
/// Any failure, including one on a later page, fails the whole collection;
/// items gathered before the failure are dropped.
pub async fn collect<T, F, Fut>(first: Result<Page<T>>, mut fetch_next: F) -> Result<Vec<T>>
where
    F: FnMut(PageCursor) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut page = first?;
    let mut collection = Vec::new();
    loop {
        collection.extend(page.items);
        match page.next {
            Some(cursor) => page = fetch_next(cursor).await?,
            None => return Ok(collection),
        }
    }
}

/// All issues matching `query`. An explicit page size asks for exactly one page.
pub async fn collect_issues(api: &dyn IssueApi, query: &Query) -> Result<Vec<RawIssue>> {
    let first = api.list_repo_issues(query).await;
    if query.per_page.is_some() {
        return first.map(|page| page.items);
    }
    collect(first, |cursor| async move { api.next_issues(&cursor).await }).await
}

pub async fn collect_milestones(
    api: &dyn IssueApi,
    owner: &str,
    repo: &str,
) -> Result<Vec<RawMilestone>> {
    let first = api.list_milestones(owner, repo).await;
    collect(first, |cursor| async move { api.next_milestones(&cursor).await }).await
}
