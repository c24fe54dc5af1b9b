//! Telegram bot client - polling loop feeding the command dispatcher.

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::RequestError;

use super::render::render_messages;
use crate::board::DisplayBlock;
use crate::command::{Dispatch, Dispatcher, IncomingLine, Transport};
use crate::config::Settings;
use crate::error::Error;
use crate::github::GithubConnector;
use crate::identity::SettingsIdentityResolver;

const HELP_TEXT: &str = "\
Board commands (replace board with your trigger):
board owner/repo - ready, working and done columns
board owner/repo !backlog|!ready|!working|!done - one column
board owner/repo v2:beta - board for the milestone matching v2 and beta
board owner/repo v2:beta !done - one column of that milestone
board owner/repo !mine - issues assigned to you
board owner/repo v2: !mine - your issues in a milestone
board owner/repo !latest - most recent issues
board owner/repo !milestones - milestones with open/total counts
board owner/repo !new Title - optional body - create an issue
A bare repo name uses the configured default owner.";

/// Delivers blocks to a Telegram chat. Rooms are chat ids.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn chat_id(room: &str) -> Option<ChatId> {
        room.parse::<i64>().ok().map(ChatId)
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn deliver(&self, room: &str, blocks: Vec<DisplayBlock>) {
        let Some(chat_id) = Self::chat_id(room) else {
            tracing::warn!("Cannot deliver to non-numeric room {}", room);
            return;
        };
        for message in render_messages(&blocks) {
            if let Err(e) = self
                .bot
                .send_message(chat_id, message)
                .parse_mode(ParseMode::Html)
                .await
            {
                tracing::warn!("Failed to deliver board to {}: {}", room, e);
                return;
            }
        }
    }

    async fn notify(&self, room: &str, text: &str) {
        let Some(chat_id) = Self::chat_id(room) else {
            tracing::warn!("Cannot notify non-numeric room {}", room);
            return;
        };
        if let Err(e) = self.bot.send_message(chat_id, text).await {
            tracing::warn!("Failed to send notice to {}: {}", room, e);
        }
    }
}

/// Run the telegram bot daemon using simple polling.
pub async fn run_telegram_daemon(settings: Settings) -> Result<(), Error> {
    tracing::info!("Starting Telegram bot...");

    let token = settings
        .channels
        .telegram
        .bot_token
        .clone()
        .ok_or_else(|| Error::Telegram("No bot token configured".to_string()))?;

    let bot = Bot::new(token);

    let dispatcher = Arc::new(Dispatcher::new(
        settings.board.clone(),
        Arc::new(SettingsIdentityResolver::from_settings(&settings)),
        Arc::new(GithubConnector::new(&settings.github)),
        Arc::new(TelegramTransport::new(bot.clone())),
    )?);

    if let Err(e) = bot
        .set_my_commands(vec![
            teloxide::types::BotCommand::new("help", "Show board command help"),
            teloxide::types::BotCommand::new(settings.board.trigger.clone(), "Show a board"),
        ])
        .await
    {
        tracing::warn!("Failed to set commands: {}", e);
    }

    tracing::info!("Telegram bot listening for '{}' commands", settings.board.trigger);

    teloxide::repl(bot, move |bot: Bot, msg: Message| {
        let dispatcher = Arc::clone(&dispatcher);
        async move { handle_message(bot, msg, dispatcher).await }
    })
    .await;

    Ok(())
}

/// Handle incoming messages.
async fn handle_message(
    bot: Bot,
    msg: Message,
    dispatcher: Arc<Dispatcher>,
) -> Result<(), RequestError> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    if text.trim() == "/help" || text.trim().starts_with("/help@") {
        bot.send_message(msg.chat.id, HELP_TEXT).await?;
        return Ok(());
    }

    let chat_user = msg
        .from
        .as_ref()
        .map(|u| u.id.0.to_string())
        .unwrap_or_else(|| "0".to_string());
    let line = IncomingLine::new(msg.chat.id.0.to_string(), chat_user, text);

    // One task per line so slow boards don't hold up the chat.
    tokio::spawn(async move {
        match dispatcher.dispatch(&line).await {
            Ok(Dispatch::Ignored) => {}
            Ok(Dispatch::Delivered { command, blocks }) => {
                tracing::info!("Delivered {} ({} blocks) to {}", command, blocks, line.room);
            }
            Err(e) => {
                tracing::error!("Board command from {} failed: {}", line.chat_user, e);
            }
        }
    });

    Ok(())
}
