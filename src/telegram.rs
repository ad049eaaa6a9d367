//! Telegram client using teloxide.

use teloxide::prelude::*;
use tracing::warn;

use crate::notifier::ChatSink;

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Send a plain-text message.
    pub async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), String> {
        self.bot
            .send_message(chat_id, text)
            .await
            .map(|_| ())
            .map_err(|e| {
                let msg = format!("Failed to send: {e}");
                warn!("{}", msg);
                msg
            })
    }
}

impl ChatSink for TelegramClient {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), String> {
        self.send_message(chat_id, text).await
    }
}
