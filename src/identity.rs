//! Chat user to GitHub credential resolution.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;

use crate::config::{IdentityEntry, Settings};
use crate::error::{Error, Result};

/// An API token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Token to act with on behalf of a chat user.
    async fn token_for(&self, chat_user: &str) -> Result<Credential>;

    /// GitHub login of a chat user together with their token.
    async fn github_user_and_token_for(&self, chat_user: &str) -> Result<(String, Credential)>;
}

/// Resolves identities from the `identities` table of the settings file,
/// falling back to the default token when a user has none of their own.
pub struct SettingsIdentityResolver {
    identities: HashMap<String, IdentityEntry>,
    default_token: Option<String>,
}

impl SettingsIdentityResolver {
    pub fn new(identities: HashMap<String, IdentityEntry>, default_token: Option<String>) -> Self {
        Self {
            identities,
            default_token,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.identities.clone(),
            settings.github.default_token.clone(),
        )
    }

    fn entry(&self, chat_user: &str) -> Option<&IdentityEntry> {
        self.identities
            .get(chat_user)
            .or_else(|| self.identities.get(&chat_user.to_lowercase()))
    }
}

#[async_trait]
impl IdentityResolver for SettingsIdentityResolver {
    async fn token_for(&self, chat_user: &str) -> Result<Credential> {
        let own = self.entry(chat_user).and_then(|e| e.token.clone());
        match own.or_else(|| self.default_token.clone()) {
            Some(token) if !token.trim().is_empty() => Ok(Credential::new(token)),
            _ => {
                tracing::warn!(chat_user, "no token and no default token");
                Err(Error::Credential(format!(
                    "no GitHub token for '{}' and no default token configured",
                    chat_user
                )))
            }
        }
    }

    async fn github_user_and_token_for(&self, chat_user: &str) -> Result<(String, Credential)> {
        let login = self
            .entry(chat_user)
            .and_then(|e| e.github_login.clone())
            .ok_or_else(|| {
                Error::Credential(format!("no GitHub login known for '{}'", chat_user))
            })?;
        let token = self.token_for(chat_user).await?;
        Ok((login, token))
    }
}
