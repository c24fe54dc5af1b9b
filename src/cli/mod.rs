//! CLI commands for issueboard using clap.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use clap::{Parser, Subcommand};

use crate::board::DisplayBlock;
use crate::command::{Dispatch, Dispatcher, IncomingLine, Transport};
use crate::config::{get_settings_path, load_settings, Settings};
use crate::github::GithubConnector;
use crate::identity::SettingsIdentityResolver;
use crate::telegram::render::color_marker;

/// issueboard - GitHub issue boards from chat commands.
#[derive(Parser)]
#[command(name = "issueboard")]
#[command(version = "0.1.0")]
#[command(about = "Chat-driven kanban board for GitHub issues", long_about = None)]
pub struct Commands {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the Telegram bot
    Telegram,

    /// Dispatch one command line and print the result
    Run {
        /// Chat user the line is sent as
        #[arg(long, env = "ISSUEBOARD_CHAT_USER")]
        user: String,

        /// Room name shown in logs
        #[arg(long, default_value = "cli")]
        room: String,

        /// The command line, e.g. "board acme/widgets !mine"
        line: String,
    },

    /// Show effective settings with secrets hidden
    Config,
}

impl Commands {
    /// Run the command.
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Command::Telegram => cmd_telegram().await,
            Command::Run { user, room, line } => cmd_run(user, room, line).await,
            Command::Config => cmd_config().await,
        }
    }
}

/// Prints blocks as plain text lines.
struct StdoutTransport;

#[async_trait]
impl Transport for StdoutTransport {
    async fn deliver(&self, _room: &str, blocks: Vec<DisplayBlock>) {
        for block in &blocks {
            println!("{}", plain_line(block));
        }
    }

    async fn notify(&self, _room: &str, text: &str) {
        println!("{}", text);
    }
}

fn plain_line(block: &DisplayBlock) -> String {
    let mut line = format!("{} {}", color_marker(block.color()), block.title());
    if let Some(link) = block.title_link() {
        line.push_str(&format!(" <{}>", link));
    }
    if let Some(text) = block.text() {
        line.push_str(&format!("\n    {}", text));
    }
    line
}

// Command implementations

async fn cmd_telegram() -> Result<()> {
    let settings = load_settings()?;
    crate::telegram::run_telegram_daemon(settings).await?;
    Ok(())
}

async fn cmd_run(user: &str, room: &str, line: &str) -> Result<()> {
    let settings = load_settings()?;
    let dispatcher = Dispatcher::new(
        settings.board.clone(),
        Arc::new(SettingsIdentityResolver::from_settings(&settings)),
        Arc::new(GithubConnector::new(&settings.github)),
        Arc::new(StdoutTransport),
    )?;

    match dispatcher
        .dispatch(&IncomingLine::new(room, user, line))
        .await?
    {
        Dispatch::Ignored => {
            println!(
                "Not a board command. Lines start with '{}', e.g. '{} owner/repo'.",
                settings.board.trigger, settings.board.trigger
            );
        }
        Dispatch::Delivered { command, blocks } => {
            tracing::debug!("{} delivered {} blocks", command, blocks);
        }
    }
    Ok(())
}

async fn cmd_config() -> Result<()> {
    let settings: Settings = load_settings()?;
    println!("# {}", get_settings_path()?.display());
    println!("{}", serde_json::to_string_pretty(&settings.redacted())?);
    Ok(())
}
