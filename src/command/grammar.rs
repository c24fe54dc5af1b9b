//! Chat command grammar.
//!
//! Every command reads `<trigger> <owner>[/<repo>] [<fragment:fragment>] [!suffix ...]`.
//! The trigger may carry a `:qualifier`, a leading `/` and a trailing
//! `@botname` mention (Telegram style).
//! Matchers are tried in order, most specific first; the first hit wins.

use regex::{Captures, Regex};

use crate::error::{Error, Result};

const OWNER_REPO: &str = r"(?P<owner>[-_.0-9a-z]+)(?:/(?P<repo>[-_.0-9a-z]+))?";
const MILESTONE: &str = r"\s+(?P<milestone>[-_.0-9a-z:]*:[-_.0-9a-z:]*)";
const STATUS: &str = r"\s+!(?P<status>backlog|ready|working|done)";
const END: &str = r"\s*$";
const NEW_BODY: &str = r"\s*(?:-\s*(?P<body>.*?))?";

/// Status suffix of a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusWord {
    Backlog,
    Ready,
    Working,
    Done,
}

impl StatusWord {
    pub fn parse(word: &str) -> Option<Self> {
        match word.to_lowercase().as_str() {
            "backlog" => Some(StatusWord::Backlog),
            "ready" => Some(StatusWord::Ready),
            "working" => Some(StatusWord::Working),
            "done" => Some(StatusWord::Done),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusWord::Backlog => "backlog",
            StatusWord::Ready => "ready",
            StatusWord::Working => "working",
            StatusWord::Done => "done",
        }
    }
}

/// Owner/repository as typed; the owner may be left to configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoSpec {
    pub first: String,
    pub second: Option<String>,
}

/// A fully resolved repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoSpec {
    pub fn full(owner: &str, repo: &str) -> Self {
        Self {
            first: owner.to_string(),
            second: Some(repo.to_string()),
        }
    }

    pub fn bare(token: &str) -> Self {
        Self {
            first: token.to_string(),
            second: None,
        }
    }

    /// A bare token names a repository of the default owner.
    pub fn resolve(&self, default_owner: Option<&str>) -> Result<RepoRef> {
        match (&self.second, default_owner) {
            (Some(repo), _) => Ok(RepoRef {
                owner: self.first.clone(),
                name: repo.clone(),
            }),
            (None, Some(owner)) if !owner.trim().is_empty() => Ok(RepoRef {
                owner: owner.to_string(),
                name: self.first.clone(),
            }),
            (None, _) => Err(Error::ConfigMissing),
        }
    }
}

/// Colon separated milestone title fragments, all of which must match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MilestoneSpec {
    pub fragments: Vec<String>,
}

impl MilestoneSpec {
    pub fn parse(token: &str) -> Option<Self> {
        if !token.contains(':') {
            return None;
        }
        let fragments: Vec<String> = token
            .split(':')
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();
        if fragments.is_empty() {
            return None;
        }
        Some(Self { fragments })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    NewIssue {
        repo: RepoSpec,
        milestone: Option<MilestoneSpec>,
        title: String,
        body: String,
    },
    MilestoneStatus {
        repo: RepoSpec,
        milestone: MilestoneSpec,
        status: StatusWord,
    },
    MilestoneMine {
        repo: RepoSpec,
        milestone: MilestoneSpec,
    },
    Milestone {
        repo: RepoSpec,
        milestone: MilestoneSpec,
    },
    Status {
        repo: RepoSpec,
        status: StatusWord,
    },
    Mine {
        repo: RepoSpec,
    },
    Latest {
        repo: RepoSpec,
    },
    Milestones {
        repo: RepoSpec,
    },
    Base {
        repo: RepoSpec,
    },
}

impl Command {
    pub fn repo(&self) -> &RepoSpec {
        match self {
            Command::NewIssue { repo, .. }
            | Command::MilestoneStatus { repo, .. }
            | Command::MilestoneMine { repo, .. }
            | Command::Milestone { repo, .. }
            | Command::Status { repo, .. }
            | Command::Mine { repo }
            | Command::Latest { repo }
            | Command::Milestones { repo }
            | Command::Base { repo } => repo,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::NewIssue { .. } => "new-issue",
            Command::MilestoneStatus { .. } => "milestone-status",
            Command::MilestoneMine { .. } => "milestone-mine",
            Command::Milestone { .. } => "milestone",
            Command::Status { .. } => "status",
            Command::Mine { .. } => "mine",
            Command::Latest { .. } => "latest",
            Command::Milestones { .. } => "milestones",
            Command::Base { .. } => "base",
        }
    }

    /// Whether the command needs the caller's GitHub login.
    pub fn needs_login(&self) -> bool {
        matches!(self, Command::Mine { .. } | Command::MilestoneMine { .. })
    }
}

type Build = fn(&Captures<'_>) -> Option<Command>;

struct Matcher {
    name: &'static str,
    pattern: Regex,
    build: Build,
}

/// Ordered set of command matchers for one trigger prefix.
pub struct Grammar {
    matchers: Vec<Matcher>,
}

impl Grammar {
    pub fn new(trigger: &str) -> Result<Self> {
        let prefix = format!(
            r"(?is)^\s*/?(?P<trigger>{}(?::[^\s@]+)?)(?:@\S+)?\s+{}",
            regex::escape(trigger.trim()),
            OWNER_REPO
        );

        let specs: [(&'static str, String, Build); 9] = [
            (
                "new-issue",
                format!(
                    r"{prefix}(?:{MILESTONE})?\s+!new\s+(?P<title>[^-]+?){NEW_BODY}{END}"
                ),
                build_new_issue,
            ),
            (
                "milestone-status",
                format!("{prefix}{MILESTONE}{STATUS}{END}"),
                build_milestone_status,
            ),
            (
                "milestone-mine",
                format!(r"{prefix}{MILESTONE}\s+!mine{END}"),
                build_milestone_mine,
            ),
            (
                "milestone",
                format!("{prefix}{MILESTONE}{END}"),
                build_milestone,
            ),
            ("status", format!("{prefix}{STATUS}{END}"), build_status),
            ("mine", format!(r"{prefix}\s+!mine{END}"), build_mine),
            ("latest", format!(r"{prefix}\s+!latest{END}"), build_latest),
            (
                "milestones",
                format!(r"{prefix}\s+!milestones{END}"),
                build_milestones,
            ),
            ("base", format!("{prefix}{END}"), build_base),
        ];

        let mut matchers = Vec::with_capacity(specs.len());
        for (name, pattern, build) in specs {
            let pattern = Regex::new(&pattern)
                .map_err(|e| Error::Config(format!("invalid {} pattern: {}", name, e)))?;
            matchers.push(Matcher {
                name,
                pattern,
                build,
            });
        }

        Ok(Self { matchers })
    }

    /// Classify a line. `None` means the line is not a board command.
    pub fn classify(&self, line: &str) -> Option<Command> {
        for matcher in &self.matchers {
            if let Some(caps) = matcher.pattern.captures(line) {
                if let Some(command) = (matcher.build)(&caps) {
                    tracing::trace!(matcher = matcher.name, "command matched");
                    return Some(command);
                }
            }
        }
        None
    }
}

/// `.` and `..` would address a different API path.
fn is_path_token(token: &str) -> bool {
    !token.chars().all(|c| c == '.')
}

fn repo_spec(caps: &Captures<'_>) -> Option<RepoSpec> {
    let owner = caps.name("owner")?.as_str();
    if !is_path_token(owner) {
        return None;
    }
    Some(match caps.name("repo") {
        Some(repo) if is_path_token(repo.as_str()) => RepoSpec::full(owner, repo.as_str()),
        Some(_) => return None,
        None => RepoSpec::bare(owner),
    })
}

fn milestone_spec(caps: &Captures<'_>) -> Option<MilestoneSpec> {
    MilestoneSpec::parse(caps.name("milestone")?.as_str())
}

fn status_word(caps: &Captures<'_>) -> Option<StatusWord> {
    StatusWord::parse(caps.name("status")?.as_str())
}

fn build_new_issue(caps: &Captures<'_>) -> Option<Command> {
    let milestone = match caps.name("milestone") {
        Some(m) => Some(MilestoneSpec::parse(m.as_str())?),
        None => None,
    };
    let title = caps.name("title")?.as_str().trim().to_string();
    if title.is_empty() {
        return None;
    }
    let body = caps
        .name("body")
        .map(|b| b.as_str().trim().to_string())
        .unwrap_or_default();
    Some(Command::NewIssue {
        repo: repo_spec(caps)?,
        milestone,
        title,
        body,
    })
}

fn build_milestone_status(caps: &Captures<'_>) -> Option<Command> {
    Some(Command::MilestoneStatus {
        repo: repo_spec(caps)?,
        milestone: milestone_spec(caps)?,
        status: status_word(caps)?,
    })
}

fn build_milestone_mine(caps: &Captures<'_>) -> Option<Command> {
    Some(Command::MilestoneMine {
        repo: repo_spec(caps)?,
        milestone: milestone_spec(caps)?,
    })
}

fn build_milestone(caps: &Captures<'_>) -> Option<Command> {
    Some(Command::Milestone {
        repo: repo_spec(caps)?,
        milestone: milestone_spec(caps)?,
    })
}

fn build_status(caps: &Captures<'_>) -> Option<Command> {
    Some(Command::Status {
        repo: repo_spec(caps)?,
        status: status_word(caps)?,
    })
}

fn build_mine(caps: &Captures<'_>) -> Option<Command> {
    Some(Command::Mine {
        repo: repo_spec(caps)?,
    })
}

fn build_latest(caps: &Captures<'_>) -> Option<Command> {
    Some(Command::Latest {
        repo: repo_spec(caps)?,
    })
}

fn build_milestones(caps: &Captures<'_>) -> Option<Command> {
    Some(Command::Milestones {
        repo: repo_spec(caps)?,
    })
}

fn build_base(caps: &Captures<'_>) -> Option<Command> {
    Some(Command::Base {
        repo: repo_spec(caps)?,
    })
}
