//! Chat notifications with per-key de-duplication.

use std::collections::HashMap;

use teloxide::types::ChatId;
use tracing::{debug, error, info};

/// Anything that can deliver a text message to a chat.
pub trait ChatSink {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), String>;
}

/// Last message sent per homework, plus the last reported error.
///
/// Lives for the process lifetime only.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NotificationState {
    pub last_sent: HashMap<String, String>,
    pub last_error: Option<String>,
}

pub struct Notifier<C> {
    chat: C,
    chat_id: ChatId,
    state: NotificationState,
}

impl<C: ChatSink> Notifier<C> {
    pub fn new(chat: C, chat_id: ChatId) -> Self {
        Self {
            chat,
            chat_id,
            state: NotificationState::default(),
        }
    }

    pub fn state(&self) -> &NotificationState {
        &self.state
    }

    #[cfg(test)]
    pub fn chat(&self) -> &C {
        &self.chat
    }

    /// Attempt delivery once. Failures are logged and swallowed, never retried.
    ///
    /// Returns whether the message was delivered.
    pub async fn send_message(&self, message: &str) -> bool {
        debug!("Sending message to {}", self.chat_id);
        match self.chat.send_text(self.chat_id, message).await {
            Ok(()) => {
                info!("📨 Sent: {message}");
                true
            }
            Err(e) => {
                error!("Message not delivered: {e}");
                false
            }
        }
    }

    /// Send `message` unless it is what was last sent for `homework`.
    ///
    /// The slot is updated even when delivery fails.
    pub async fn notify_status(&mut self, homework: &str, message: &str) -> bool {
        if self.state.last_sent.get(homework).map(String::as_str) == Some(message) {
            debug!("No change for '{homework}'");
            return false;
        }
        self.send_message(message).await;
        self.state
            .last_sent
            .insert(homework.to_string(), message.to_string());
        true
    }

    /// Send `message` unless it equals the last reported error.
    pub async fn notify_error(&mut self, message: &str) -> bool {
        if self.state.last_error.as_deref() == Some(message) {
            debug!("Suppressing repeated error report");
            return false;
        }
        self.send_message(message).await;
        self.state.last_error = Some(message.to_string());
        true
    }

    pub fn clear_error(&mut self) {
        self.state.last_error = None;
    }
}
