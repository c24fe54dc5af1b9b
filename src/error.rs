//! Error types for issueboard.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A bare repository token was given and no default owner is configured.
    #[error("No default owner configured and no owner/repo pair given")]
    ConfigMissing,

    #[error("No milestone matches: {}", .0.join(", "))]
    MilestoneNotFound(Vec<String>),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Fetch for label '{label}' failed: {source}")]
    Fanout {
        label: String,
        #[source]
        source: Box<Error>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Telegram error: {0}")]
    Telegram(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Fetch(e.to_string())
    }
}

impl Error {
    /// Errors caused by what the user typed rather than by an operational fault.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Error::ConfigMissing | Error::MilestoneNotFound(_))
    }
}
