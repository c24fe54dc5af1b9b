//! Configuration loading for issueboard.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::command::StatusWord;
use crate::error::Error;
pub type Result<T> = std::result::Result<T, Error>;

pub const ENV_GITHUB_TOKEN: &str = "ISSUEBOARD_GITHUB_TOKEN";
pub const ENV_DEFAULT_OWNER: &str = "ISSUEBOARD_DEFAULT_OWNER";
pub const ENV_TELEGRAM_TOKEN: &str = "ISSUEBOARD_TELEGRAM_TOKEN";

/// Get the issueboard home directory (~/.issueboard).
pub fn get_home_dir() -> Result<PathBuf> {
    let home = directories::UserDirs::new()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    Ok(home.home_dir().join(".issueboard"))
}

/// Get the settings file path.
pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_home_dir()?.join("settings.json"))
}

/// Load settings from ~/.issueboard/settings.json, then apply environment overrides.
pub fn load_settings() -> Result<Settings> {
    let path = get_settings_path()?;
    let mut settings = load_settings_from(&path)?;
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    validate_settings(&settings)?;
    Ok(settings)
}

/// Load settings from an explicit path. A missing file yields defaults.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        tracing::debug!("No settings at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    let content = std::fs::read_to_string(path)?;
    let settings: Settings = serde_json::from_str(&content)?;

    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Overlay environment variables on top of file settings.
pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(token) = non_empty(ENV_GITHUB_TOKEN) {
        settings.github.default_token = Some(token);
    }
    if let Some(owner) = non_empty(ENV_DEFAULT_OWNER) {
        settings.board.default_owner = Some(owner);
    }
    if let Some(token) = non_empty(ENV_TELEGRAM_TOKEN) {
        settings.channels.telegram.bot_token = Some(token);
    }
}

pub fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.board.trigger.trim().is_empty() {
        return Err(Error::Config("board.trigger must not be empty".to_string()));
    }
    if settings.board.default_statuses.is_empty() {
        return Err(Error::Config(
            "board.default_statuses must name at least one label".to_string(),
        ));
    }
    if settings.board.latest_count == 0 {
        return Err(Error::Config("board.latest_count must be at least 1".to_string()));
    }
    Ok(())
}

/// Labels a `!status` suffix expands to.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct StatusLabels {
    pub backlog: String,
    pub ready: String,
    pub working: String,
    pub done: String,
}

impl Default for StatusLabels {
    fn default() -> Self {
        Self {
            backlog: "0 - Backlog".to_string(),
            ready: "1 - Ready".to_string(),
            working: "2 - Working".to_string(),
            done: "3 - Done".to_string(),
        }
    }
}

impl StatusLabels {
    pub fn label_for(&self, word: StatusWord) -> &str {
        match word {
            StatusWord::Backlog => &self.backlog,
            StatusWord::Ready => &self.ready,
            StatusWord::Working => &self.working,
            StatusWord::Done => &self.done,
        }
    }
}

/// Board configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct BoardConfig {
    pub trigger: String,
    pub default_owner: Option<String>,
    pub default_statuses: Vec<String>,
    pub status_labels: StatusLabels,
    pub latest_count: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            trigger: "board".to_string(),
            default_owner: None,
            default_statuses: vec![
                "1 - Ready".to_string(),
                "2 - Working".to_string(),
                "3 - Done".to_string(),
            ],
            status_labels: StatusLabels::default(),
            latest_count: 10,
        }
    }
}

/// GitHub API configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct GithubConfig {
    pub api_base: String,
    pub default_token: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            default_token: None,
            request_timeout_secs: 30,
        }
    }
}

/// GitHub identity of a chat user.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct IdentityEntry {
    pub github_login: Option<String>,
    pub token: Option<String>,
}

/// Channel configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ChannelConfig {
    pub bot_token: Option<String>,
}

/// Channels configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Channels {
    #[serde(default)]
    pub telegram: ChannelConfig,
}

/// issueboard settings.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Settings {
    #[serde(default)]
    pub board: BoardConfig,

    #[serde(default)]
    pub github: GithubConfig,

    /// Chat user id -> GitHub identity.
    #[serde(default)]
    pub identities: HashMap<String, IdentityEntry>,

    #[serde(default)]
    pub channels: Channels,
}

impl Settings {
    /// Copy of the settings with every secret replaced, for display.
    pub fn redacted(&self) -> Settings {
        let mut out = self.clone();
        let redact = |v: &mut Option<String>| {
            if v.is_some() {
                *v = Some("***".to_string());
            }
        };
        redact(&mut out.github.default_token);
        redact(&mut out.channels.telegram.bot_token);
        for entry in out.identities.values_mut() {
            redact(&mut entry.token);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings.board.trigger, "board");
        assert_eq!(
            settings.board.default_statuses,
            vec!["1 - Ready", "2 - Working", "3 - Done"]
        );
        assert_eq!(settings.board.status_labels.backlog, "0 - Backlog");
        assert_eq!(settings.github.api_base, "https://api.github.com");
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{
                "board": { "default_owner": "acme", "latest_count": 3 },
                "identities": { "alice": { "github_login": "alice-gh" } }
            }"#,
        )
        .unwrap();

        let settings = load_settings_from(&path).unwrap();
        assert_eq!(settings.board.default_owner.as_deref(), Some("acme"));
        assert_eq!(settings.board.latest_count, 3);
        assert_eq!(settings.board.trigger, "board");
        assert_eq!(settings.board.status_labels.done, "3 - Done");
        assert_eq!(
            settings.identities["alice"].github_login.as_deref(),
            Some("alice-gh")
        );
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let mut settings = Settings::default();
        settings.board.default_owner = Some("from-file".to_string());

        apply_env_overrides(&mut settings, |key| match key {
            ENV_DEFAULT_OWNER => Some("from-env".to_string()),
            ENV_GITHUB_TOKEN => Some("   ".to_string()),
            _ => None,
        });

        assert_eq!(settings.board.default_owner.as_deref(), Some("from-env"));
        assert!(settings.github.default_token.is_none());
    }

    #[test]
    fn rejects_empty_status_set() {
        let mut settings = Settings::default();
        settings.board.default_statuses.clear();
        assert!(matches!(validate_settings(&settings), Err(Error::Config(_))));
    }

    #[test]
    fn redacted_hides_tokens() {
        let mut settings = Settings::default();
        settings.github.default_token = Some("ghp_secret".to_string());
        settings.identities.insert(
            "bob".to_string(),
            IdentityEntry {
                github_login: Some("bob".to_string()),
                token: Some("ghp_bob".to_string()),
            },
        );

        let json = serde_json::to_string(&settings.redacted()).unwrap();
        assert!(!json.contains("ghp_"));
        assert!(json.contains("***"));
    }
}
