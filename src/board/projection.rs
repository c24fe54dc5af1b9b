//! Projection of API records into display blocks.

use serde::Serialize;

use super::color;
use super::fanout::BoardResult;
use crate::github::{RawIssue, RawMilestone};

/// One rendered attachment. Built only by this module and never changed afterwards.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct DisplayBlock {
    pretext: Option<String>,
    title: String,
    title_link: Option<String>,
    color: &'static str,
    text: Option<String>,
}

impl DisplayBlock {
    fn new(title: String, title_link: Option<String>, status: Option<&str>) -> Self {
        Self {
            pretext: None,
            title,
            title_link,
            color: color::resolve(status),
            text: None,
        }
    }

    /// A black title or header block.
    pub fn heading(title: impl Into<String>, link: Option<String>) -> Self {
        Self::new(title.into(), link, Some("black"))
    }

    pub fn pretext(&self) -> Option<&str> {
        self.pretext.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn title_link(&self) -> Option<&str> {
        self.title_link.as_deref()
    }

    pub fn color(&self) -> &'static str {
        self.color
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

pub fn project_issue(raw: &RawIssue, status: Option<&str>, text: Option<String>) -> DisplayBlock {
    let title = match raw.number {
        Some(number) => format!("{} {}", number, raw.title),
        None => raw.title.clone(),
    };
    let mut block = DisplayBlock::new(title, raw.html_url.clone(), status);
    block.text = text;
    block
}

pub fn project_milestone(raw: &RawMilestone, status: Option<&str>) -> DisplayBlock {
    let total = raw.open_issues + raw.closed_issues;
    let title = format!("{} [{}/{}]", raw.title, raw.open_issues, total);
    DisplayBlock::new(title, raw.html_url.clone(), status)
}

/// Board view: title block, then per label a header followed by its issues.
pub fn board_blocks(title: DisplayBlock, board: &BoardResult) -> Vec<DisplayBlock> {
    let mut content = vec![title];
    for (label, issues) in board.iter() {
        if issues.is_empty() {
            continue;
        }
        content.push(DisplayBlock::heading(label, None));
        content.extend(issues.iter().map(|issue| project_issue(issue, Some(label), None)));
    }
    content
}

/// Flat issue list colored and annotated by each issue's own labels.
pub fn issue_list_blocks(title: DisplayBlock, issues: &[RawIssue]) -> Vec<DisplayBlock> {
    let mut content = vec![title];
    for issue in issues {
        let labels = issue.label_names().join(", ");
        let text = format!("Labels: {}", labels);
        content.push(project_issue(issue, Some(labels.as_str()), Some(text)));
    }
    content
}

pub fn milestone_list_blocks(milestones: &[RawMilestone]) -> Vec<DisplayBlock> {
    let mut content = vec![DisplayBlock::heading("Milestones", None)];
    content.extend(milestones.iter().map(|m| project_milestone(m, Some("green"))));
    content
}

pub fn created_issue_blocks(owner: &str, repo: &str, issue: &RawIssue) -> Vec<DisplayBlock> {
    vec![
        DisplayBlock::heading(format!("Created issue in {}/{}", owner, repo), None),
        project_issue(issue, Some("green"), None),
    ]
}
