//! Runs one classified chat line against the issue API.
//!
//! A line moves through `Idle -> Classified -> CredentialResolved ->
//! QueryBuilt -> Fetching -> Projected -> Delivered`, or drops to `Failed`
//! from any stage. Every transition is logged inside a per-command span.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::Instrument;

use super::grammar::{Command, Grammar, MilestoneSpec, RepoRef};
use crate::board::projection::{
    board_blocks, created_issue_blocks, issue_list_blocks, milestone_list_blocks,
};
use crate::board::{
    collect_issues, collect_milestones, fetch_board, find_milestone, BoardResult, DisplayBlock,
};
use crate::config::BoardConfig;
use crate::error::{Error, Result};
use crate::github::{ApiConnector, IssueApi, IssueDraft, Query, RawIssue, RawMilestone};
use crate::identity::IdentityResolver;

/// Apologetic openers for chat notices.
const FAIL_INTRO: [&str; 9] = [
    "Argh!",
    "Sorrry.",
    "womp womp.",
    "Eep.",
    "Hmmm...",
    "Hmm.",
    "Slow down there.",
    "Whoa now.",
    "About that...",
];

/// Where rendered blocks and notices go.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Post blocks to a room. Delivery failures stay inside the transport.
    async fn deliver(&self, room: &str, blocks: Vec<DisplayBlock>);

    /// Post a plain-text notice to a room.
    async fn notify(&self, room: &str, text: &str);
}

/// A chat line as received from a transport.
#[derive(Clone, Debug)]
pub struct IncomingLine {
    pub room: String,
    pub chat_user: String,
    pub text: String,
}

impl IncomingLine {
    pub fn new(
        room: impl Into<String>,
        chat_user: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            room: room.into(),
            chat_user: chat_user.into(),
            text: text.into(),
        }
    }
}

/// Outcome of a dispatched line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// The line is not a board command.
    Ignored,
    Delivered { command: &'static str, blocks: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Classified,
    CredentialResolved,
    QueryBuilt,
    Fetching,
    Projected,
    Delivered,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Classified => "classified",
            Stage::CredentialResolved => "credential_resolved",
            Stage::QueryBuilt => "query_built",
            Stage::Fetching => "fetching",
            Stage::Projected => "projected",
            Stage::Delivered => "delivered",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    tracing::debug!(from = %stage, to = %next, "stage transition");
    *stage = next;
}

/// What to fetch once the query is known.
enum Plan {
    Board {
        title: DisplayBlock,
        milestone: Option<u64>,
        labels: Vec<String>,
    },
    Issues {
        title: DisplayBlock,
        query: Query,
    },
    Milestones,
    Create {
        draft: IssueDraft,
    },
}

enum Fetched {
    Board(DisplayBlock, BoardResult),
    Issues(DisplayBlock, Vec<RawIssue>),
    Milestones(Vec<RawMilestone>),
    Created(RawIssue),
}

/// Shared, immutable command runner.
pub struct Dispatcher {
    grammar: Grammar,
    config: BoardConfig,
    identity: Arc<dyn IdentityResolver>,
    connector: Arc<dyn ApiConnector>,
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(
        config: BoardConfig,
        identity: Arc<dyn IdentityResolver>,
        connector: Arc<dyn ApiConnector>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let grammar = Grammar::new(&config.trigger)?;
        Ok(Self {
            grammar,
            config,
            identity,
            connector,
            transport,
        })
    }

    /// Handle one line. User-facing failures are announced in the room before
    /// the error is returned.
    pub async fn dispatch(&self, line: &IncomingLine) -> Result<Dispatch> {
        let Some(command) = self.grammar.classify(&line.text) else {
            return Ok(Dispatch::Ignored);
        };

        let command_id = ulid::Ulid::new();
        let span = tracing::info_span!(
            "command",
            id = %command_id,
            kind = command.name(),
            room = %line.room
        );

        let mut stage = Stage::Idle;
        let result = self
            .execute(&command, line, &mut stage)
            .instrument(span.clone())
            .await;

        match result {
            Ok(blocks) => Ok(Dispatch::Delivered {
                command: command.name(),
                blocks,
            }),
            Err(e) => {
                span.in_scope(|| {
                    tracing::warn!(stage = %stage, error = %e, "command failed");
                    advance(&mut stage, Stage::Failed);
                });
                if let Some(notice) = notice_for(&e) {
                    self.transport.notify(&line.room, &notice).await;
                }
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        command: &Command,
        line: &IncomingLine,
        stage: &mut Stage,
    ) -> Result<usize> {
        advance(stage, Stage::Classified);
        let repo = command
            .repo()
            .resolve(self.config.default_owner.as_deref())?;

        let (login, credential) = if command.needs_login() {
            let (login, credential) = self
                .identity
                .github_user_and_token_for(&line.chat_user)
                .await?;
            (Some(login), credential)
        } else {
            (None, self.identity.token_for(&line.chat_user).await?)
        };
        let api = self.connector.connect(&credential).await?;
        advance(stage, Stage::CredentialResolved);

        let plan = self.plan(api.as_ref(), command, &repo, login.as_deref()).await?;
        advance(stage, Stage::QueryBuilt);

        advance(stage, Stage::Fetching);
        let fetched = fetch(api, &repo, plan).await?;

        let blocks = match fetched {
            Fetched::Board(title, board) => board_blocks(title, &board),
            Fetched::Issues(title, issues) => issue_list_blocks(title, &issues),
            Fetched::Milestones(milestones) => milestone_list_blocks(&milestones),
            Fetched::Created(issue) => created_issue_blocks(&repo.owner, &repo.name, &issue),
        };
        advance(stage, Stage::Projected);

        let count = blocks.len();
        self.transport.deliver(&line.room, blocks).await;
        advance(stage, Stage::Delivered);
        Ok(count)
    }

    async fn plan(
        &self,
        api: &dyn IssueApi,
        command: &Command,
        repo: &RepoRef,
        login: Option<&str>,
    ) -> Result<Plan> {
        let login = login.unwrap_or_default();
        let issues_title = || DisplayBlock::heading(format!("{} - issue(s)", repo.name), None);

        let plan = match command {
            Command::Base { .. } => Plan::Board {
                title: issues_title(),
                milestone: None,
                labels: self.config.default_statuses.clone(),
            },
            Command::Status { status, .. } => Plan::Board {
                title: issues_title(),
                milestone: None,
                labels: vec![self.config.status_labels.label_for(*status).to_string()],
            },
            Command::Milestone { milestone, .. } => {
                let m = resolve_milestone(api, repo, milestone).await?;
                Plan::Board {
                    title: milestone_title(repo, &m, None),
                    milestone: Some(m.number),
                    labels: self.config.default_statuses.clone(),
                }
            }
            Command::MilestoneStatus {
                milestone, status, ..
            } => {
                let m = resolve_milestone(api, repo, milestone).await?;
                Plan::Board {
                    title: milestone_title(repo, &m, None),
                    milestone: Some(m.number),
                    labels: vec![self.config.status_labels.label_for(*status).to_string()],
                }
            }
            Command::Mine { .. } => Plan::Issues {
                title: DisplayBlock::heading(format!("Issues assigned to @{}", login), None),
                query: Query::new(&repo.owner, &repo.name).assignee(login),
            },
            Command::MilestoneMine { milestone, .. } => {
                let m = resolve_milestone(api, repo, milestone).await?;
                Plan::Issues {
                    title: milestone_title(repo, &m, Some(login)),
                    query: Query::new(&repo.owner, &repo.name)
                        .milestone(Some(m.number))
                        .assignee(login),
                }
            }
            Command::Latest { .. } => Plan::Issues {
                title: DisplayBlock::heading(format!("{} - latest issue(s)", repo.name), None),
                query: Query::new(&repo.owner, &repo.name)
                    .per_page(self.config.latest_count)
                    .page(1),
            },
            Command::Milestones { .. } => Plan::Milestones,
            Command::NewIssue {
                milestone,
                title,
                body,
                ..
            } => {
                let milestone = match milestone {
                    Some(spec) => Some(resolve_milestone(api, repo, spec).await?.number),
                    None => None,
                };
                Plan::Create {
                    draft: IssueDraft {
                        title: title.clone(),
                        body: body.clone(),
                        milestone,
                    },
                }
            }
        };
        Ok(plan)
    }
}

async fn resolve_milestone(
    api: &dyn IssueApi,
    repo: &RepoRef,
    spec: &MilestoneSpec,
) -> Result<RawMilestone> {
    let milestones = collect_milestones(api, &repo.owner, &repo.name).await?;
    let found = find_milestone(&milestones, &spec.fragments)?;
    tracing::debug!(number = found.number, title = %found.title, "milestone resolved");
    Ok(found.clone())
}

fn milestone_title(
    repo: &RepoRef,
    milestone: &RawMilestone,
    assignee: Option<&str>,
) -> DisplayBlock {
    let title = match assignee {
        Some(login) => format!(
            "{} - {} milestone, assigned to: {}",
            repo.name, milestone.title, login
        ),
        None => format!("{} - {} milestone", repo.name, milestone.title),
    };
    DisplayBlock::heading(title, milestone.html_url.clone())
}

async fn fetch(api: Arc<dyn IssueApi>, repo: &RepoRef, plan: Plan) -> Result<Fetched> {
    match plan {
        Plan::Board {
            title,
            milestone,
            labels,
        } => {
            let board = fetch_board(api, &repo.owner, &repo.name, milestone, &labels).await?;
            Ok(Fetched::Board(title, board))
        }
        // A sized query returns exactly one page.
        Plan::Issues { title, query } => {
            let issues = collect_issues(api.as_ref(), &query).await?;
            Ok(Fetched::Issues(title, issues))
        }
        Plan::Milestones => {
            let milestones = collect_milestones(api.as_ref(), &repo.owner, &repo.name).await?;
            Ok(Fetched::Milestones(milestones))
        }
        Plan::Create { draft } => {
            let issue = api.create_issue(&repo.owner, &repo.name, &draft).await?;
            tracing::info!(number = ?issue.number, "issue created");
            Ok(Fetched::Created(issue))
        }
    }
}

fn intro() -> &'static str {
    let nanos = chrono::Utc::now().timestamp_subsec_nanos() as usize;
    FAIL_INTRO[nanos % FAIL_INTRO.len()]
}

/// Chat text for the failures a user can fix themselves.
pub fn notice_for(error: &Error) -> Option<String> {
    if !error.is_user_facing() {
        return None;
    }
    match error {
        Error::ConfigMissing => Some(format!(
            "{} Looks like someone didn't set a default owner. \
             Try using owner/repo in the meantime.",
            intro()
        )),
        Error::MilestoneNotFound(fragments) => Some(format!(
            "{} I couldn't find a milestone with the following text: {}.",
            intro(),
            fragments.join(", ")
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::color;
    use crate::github::StatusFilter;
    use crate::test_support::{
        issue, milestone, FakeApi, FakeConnector, FakeIdentity, RecordingTransport,
    };

    struct Harness {
        dispatcher: Dispatcher,
        api: Arc<FakeApi>,
        connector: Arc<FakeConnector>,
        identity: Arc<FakeIdentity>,
        transport: Arc<RecordingTransport>,
    }

    fn harness(api: FakeApi, config: BoardConfig) -> Harness {
        crate::logging::init_test();
        let api = Arc::new(api);
        let connector = Arc::new(FakeConnector::new(api.clone()));
        let identity = Arc::new(FakeIdentity::default());
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = Dispatcher::new(
            config,
            identity.clone(),
            connector.clone(),
            transport.clone(),
        )
        .unwrap();
        Harness {
            dispatcher,
            api,
            connector,
            identity,
            transport,
        }
    }

    fn line(text: &str) -> IncomingLine {
        IncomingLine::new("room-1", "me", text)
    }

    fn delivered(h: &Harness) -> Vec<DisplayBlock> {
        let delivered = h.transport.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].0, "room-1");
        delivered[0].1.clone()
    }

    fn notices(h: &Harness) -> Vec<String> {
        h.transport
            .notices
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    #[tokio::test]
    async fn backlog_board_end_to_end() {
        let api = FakeApi::new().with_issue_pages(
            Some("0 - Backlog"),
            vec![vec![issue(1, "Write docs"), issue(2, "Ship it")]],
        );
        let h = harness(api, BoardConfig::default());

        let outcome = h
            .dispatcher
            .dispatch(&line("board acme/widgets !backlog"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            Dispatch::Delivered {
                command: "status",
                blocks: 4
            }
        );

        let blocks = delivered(&h);
        let titles: Vec<&str> = blocks.iter().map(|b| b.title()).collect();
        assert_eq!(
            titles,
            vec!["widgets - issue(s)", "0 - Backlog", "1 Write docs", "2 Ship it"]
        );
        let colors: Vec<&str> = blocks.iter().map(|b| b.color()).collect();
        assert_eq!(
            colors,
            vec![color::BLACK, color::BLACK, color::BACKLOG, color::BACKLOG]
        );
        assert_eq!(h.connector.credentials.lock().unwrap().clone(), vec!["me-token"]);
        assert_eq!(
            h.identity.calls.lock().unwrap().clone(),
            vec!["token:me".to_string()]
        );
    }

    #[tokio::test]
    async fn base_board_uses_default_statuses_in_order() {
        let api = FakeApi::new()
            .with_issue_pages(Some("1 - Ready"), vec![vec![issue(1, "a")]])
            .with_issue_pages(Some("3 - Done"), vec![vec![issue(2, "b")]]);
        let h = harness(api, BoardConfig::default());

        h.dispatcher
            .dispatch(&line("board acme/widgets"))
            .await
            .unwrap();

        let titles: Vec<String> = delivered(&h).iter().map(|b| b.title().to_string()).collect();
        assert_eq!(
            titles,
            vec!["widgets - issue(s)", "1 - Ready", "1 a", "3 - Done", "2 b"]
        );
        assert_eq!(h.api.queries().len(), 3);
    }

    #[tokio::test]
    async fn milestone_board_filters_by_resolved_number() {
        let api = FakeApi::new()
            .with_milestone_pages(vec![
                vec![milestone(1, "V3 Beta")],
                vec![milestone(7, "V2 Beta Release")],
            ])
            .with_issue_pages(Some("2 - Working"), vec![vec![issue(5, "w")]]);
        let h = harness(api, BoardConfig::default());

        h.dispatcher
            .dispatch(&line("board acme/widgets v2:beta !working"))
            .await
            .unwrap();

        let blocks = delivered(&h);
        assert_eq!(blocks[0].title(), "widgets - V2 Beta Release milestone");
        assert_eq!(blocks[0].title_link(), Some("https://github.test/milestone/7"));
        let queries = h.api.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].milestone, Some(7));
        assert_eq!(
            queries[0].labels,
            StatusFilter::SingleLabel("2 - Working".to_string())
        );
    }

    #[tokio::test]
    async fn missing_milestone_sends_notice_and_fails() {
        let api = FakeApi::new().with_milestone_pages(vec![vec![milestone(1, "Launch")]]);
        let h = harness(api, BoardConfig::default());

        let err = h
            .dispatcher
            .dispatch(&line("board acme/widgets v9:gamma"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MilestoneNotFound(_)));

        let notices = notices(&h);
        assert_eq!(notices.len(), 1);
        assert!(notices[0]
            .ends_with("I couldn't find a milestone with the following text: v9, gamma."));
        assert!(FAIL_INTRO.iter().any(|intro| notices[0].starts_with(intro)));
        assert!(h.transport.delivered.lock().unwrap().is_empty());
        assert!(h.api.queries().is_empty());
    }

    #[tokio::test]
    async fn bare_repo_without_default_owner_sends_notice() {
        let h = harness(FakeApi::new(), BoardConfig::default());

        let err = h
            .dispatcher
            .dispatch(&line("board widgets"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConfigMissing));
        assert!(notices(&h)[0].contains("Looks like someone didn't set a default owner."));
        assert!(h.identity.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bare_repo_uses_default_owner() {
        let config = BoardConfig {
            default_owner: Some("octo".to_string()),
            ..BoardConfig::default()
        };
        let h = harness(FakeApi::new(), config);

        h.dispatcher
            .dispatch(&line("board widgets !done"))
            .await
            .unwrap();

        let queries = h.api.queries();
        assert_eq!(queries[0].owner, "octo");
        assert_eq!(queries[0].repo, "widgets");
        // Only the title block: the single label came back empty.
        assert_eq!(delivered(&h).len(), 1);
    }

    #[tokio::test]
    async fn credential_failure_is_not_announced() {
        let h = harness(FakeApi::new(), BoardConfig::default());
        let stranger = IncomingLine::new("room-1", "stranger", "board acme/widgets");

        let err = h.dispatcher.dispatch(&stranger).await.unwrap_err();
        assert!(matches!(err, Error::Credential(_)));
        assert!(notices(&h).is_empty());
        assert!(h.transport.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn mine_queries_by_login() {
        let api = FakeApi::new().with_issue_pages(None, vec![vec![issue(3, "mine")]]);
        let h = harness(api, BoardConfig::default());

        h.dispatcher
            .dispatch(&line("board acme/widgets !mine"))
            .await
            .unwrap();

        let blocks = delivered(&h);
        assert_eq!(blocks[0].title(), "Issues assigned to @octocat");
        assert_eq!(blocks[1].text(), Some("Labels: "));
        assert_eq!(h.api.queries()[0].assignee.as_deref(), Some("octocat"));
        assert_eq!(
            h.identity.calls.lock().unwrap().clone(),
            vec!["login:me".to_string()]
        );
    }

    #[tokio::test]
    async fn milestone_mine_title_names_assignee() {
        let api = FakeApi::new().with_milestone_pages(vec![vec![milestone(4, "Sprint One")]]);
        let h = harness(api, BoardConfig::default());

        h.dispatcher
            .dispatch(&line("board acme/widgets sprint: !mine"))
            .await
            .unwrap();

        let blocks = delivered(&h);
        assert_eq!(
            blocks[0].title(),
            "widgets - Sprint One milestone, assigned to: octocat"
        );
        let queries = h.api.queries();
        assert_eq!(queries[0].milestone, Some(4));
        assert_eq!(queries[0].assignee.as_deref(), Some("octocat"));
    }

    #[tokio::test]
    async fn latest_takes_one_sized_page() {
        let api = FakeApi::new().with_issue_pages(
            None,
            vec![vec![issue(9, "newest")], vec![issue(8, "older")]],
        );
        let config = BoardConfig {
            latest_count: 1,
            ..BoardConfig::default()
        };
        let h = harness(api, config);

        h.dispatcher
            .dispatch(&line("board acme/widgets !latest"))
            .await
            .unwrap();

        let blocks = delivered(&h);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].title(), "widgets - latest issue(s)");
        let queries = h.api.queries();
        assert_eq!(queries[0].per_page, Some(1));
        assert_eq!(queries[0].page, Some(1));
        assert_eq!(h.api.next_calls(), 0);
    }

    #[tokio::test]
    async fn milestones_lists_every_page() {
        let api = FakeApi::new().with_milestone_pages(vec![
            vec![milestone(1, "One")],
            vec![milestone(2, "Two")],
        ]);
        let h = harness(api, BoardConfig::default());

        h.dispatcher
            .dispatch(&line("board acme/widgets !milestones"))
            .await
            .unwrap();

        let titles: Vec<String> = delivered(&h).iter().map(|b| b.title().to_string()).collect();
        assert_eq!(titles, vec!["Milestones", "One [1/2]", "Two [1/2]"]);
    }

    #[tokio::test]
    async fn new_issue_is_created_in_milestone() {
        let api = FakeApi::new().with_milestone_pages(vec![vec![milestone(3, "V2 Beta")]]);
        let h = harness(api, BoardConfig::default());

        let outcome = h
            .dispatcher
            .dispatch(&line("board acme/widgets v2: !new Crash on save - big files"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            Dispatch::Delivered {
                command: "new-issue",
                blocks: 2
            }
        );

        let created = h.api.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].0, "acme");
        assert_eq!(created[0].1, "widgets");
        assert_eq!(
            created[0].2,
            IssueDraft {
                title: "Crash on save".to_string(),
                body: "big files".to_string(),
                milestone: Some(3),
            }
        );
        assert_eq!(delivered(&h)[0].title(), "Created issue in acme/widgets");
    }

    #[tokio::test]
    async fn failed_label_fetch_delivers_nothing() {
        let api = FakeApi::new().failing_label("2 - Working");
        let h = harness(api, BoardConfig::default());

        let err = h
            .dispatcher
            .dispatch(&line("board acme/widgets"))
            .await
            .unwrap_err();
        match err {
            Error::Fanout { label, .. } => assert_eq!(label, "2 - Working"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(h.transport.delivered.lock().unwrap().is_empty());
        assert!(notices(&h).is_empty());
    }

    #[test]
    fn notices_only_for_mistakes_the_user_can_fix() {
        assert!(notice_for(&Error::ConfigMissing).is_some());
        let notice = notice_for(&Error::MilestoneNotFound(vec!["a".into(), "b".into()]));
        assert!(notice.is_some_and(|n| n.ends_with("with the following text: a, b.")));

        assert!(notice_for(&Error::Credential("none".to_string())).is_none());
        assert!(notice_for(&Error::Fetch("503".to_string())).is_none());
        let fanout = Error::Fanout {
            label: "1 - Ready".to_string(),
            source: Box::new(Error::Fetch("503".to_string())),
        };
        assert!(notice_for(&fanout).is_none());
    }

    #[tokio::test]
    async fn unrelated_line_is_ignored() {
        let h = harness(FakeApi::new(), BoardConfig::default());

        let outcome = h.dispatcher.dispatch(&line("good morning")).await.unwrap();
        assert_eq!(outcome, Dispatch::Ignored);
        assert!(h.identity.calls.lock().unwrap().is_empty());
    }
}
