//! Outbound Telegram actions.

use std::borrow::Cow;
use std::future::Future;

use chrono::{DateTime, Utc};
use teloxide::prelude::*;
use teloxide::types::{ChatPermissions, MessageId, ParseMode, UserId};
use tracing::{info, warn};

/// Telegram caps a message at 4096 UTF-16 code units; stay under it.
pub const MAX_MESSAGE_LEN: usize = 4000;

fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

/// Cut `text` to [`MAX_MESSAGE_LEN`], marking the cut with `...`.
pub fn truncate(text: &str) -> Cow<'_, str> {
    if utf16_len(text) <= MAX_MESSAGE_LEN {
        return Cow::Borrowed(text);
    }

    let mut truncated = String::new();
    let mut len = 0;
    for c in text.chars() {
        len += c.len_utf16();
        if len > MAX_MESSAGE_LEN - 3 {
            break;
        }
        truncated.push(c);
    }
    truncated.push_str("...");
    Cow::Owned(truncated)
}

/// Split `text` into sendable parts, breaking at newlines where possible.
pub fn split_message(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = utf16_len(line);
        if current_len + line_len > MAX_MESSAGE_LEN && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len <= MAX_MESSAGE_LEN {
            current.push_str(line);
            current_len += line_len;
            continue;
        }
        // A single overlong line is cut by characters
        for c in line.chars() {
            if current_len + c.len_utf16() > MAX_MESSAGE_LEN {
                parts.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push(c);
            current_len += c.len_utf16();
        }
    }

    if !current.is_empty() || parts.is_empty() {
        parts.push(current);
    }
    parts
}

/// Side effects a command handler can ask the platform for.
///
/// Every action is best-effort: errors come back as a message for the
/// caller to log or report, never as a panic.
pub trait ChatActions: Send + Sync + 'static {
    fn send_text(&self, chat_id: i64, text: &str) -> impl Future<Output = Result<(), String>> + Send;

    fn delete_message(&self, chat_id: i64, message_id: i32) -> impl Future<Output = Result<(), String>> + Send;

    /// Remove every permission until `until`.
    fn mute_user(
        &self,
        chat_id: i64,
        user_id: i64,
        until: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), String>> + Send;

    fn unmute_user(&self, chat_id: i64, user_id: i64) -> impl Future<Output = Result<(), String>> + Send;

    /// Remove from the group while allowing a later rejoin.
    fn kick_user(&self, chat_id: i64, user_id: i64) -> impl Future<Output = Result<(), String>> + Send;
}

/// Telegram API client.
#[derive(Clone)]
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Send a reply, HTML-formatted when `html` is set. Long replies go
    /// out as several messages.
    pub async fn send_reply(&self, chat_id: ChatId, text: &str, html: bool) -> Result<(), String> {
        for part in split_message(text) {
            let mut request = self.bot.send_message(chat_id, part);
            if html {
                request = request.parse_mode(ParseMode::Html);
            }
            request.await.map_err(|e| {
                let msg = format!("Failed to send: {e}");
                warn!("{}", msg);
                msg
            })?;
        }
        Ok(())
    }
}

impl ChatActions for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), String> {
        self.bot
            .send_message(ChatId(chat_id), truncate(text))
            .await
            .map(|_| ())
            .map_err(|e| format!("Failed to send to {chat_id}: {e}"))
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), String> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await
            .map(|_| ())
            .map_err(|e| format!("Failed to delete message {message_id}: {e}"))
    }

    async fn mute_user(&self, chat_id: i64, user_id: i64, until: DateTime<Utc>) -> Result<(), String> {
        info!("🔇 Muting user {} in chat {} until {}", user_id, chat_id, until);

        self.bot
            .restrict_chat_member(ChatId(chat_id), UserId(user_id as u64), ChatPermissions::empty())
            .until_date(until)
            .await
            .map(|_| ())
            .map_err(|e| {
                let msg = format!("Failed to mute user: {e}");
                warn!("{}", msg);
                msg
            })
    }

    async fn unmute_user(&self, chat_id: i64, user_id: i64) -> Result<(), String> {
        info!("🔊 Unmuting user {} in chat {}", user_id, chat_id);

        self.bot
            .restrict_chat_member(ChatId(chat_id), UserId(user_id as u64), ChatPermissions::all())
            .await
            .map(|_| ())
            .map_err(|e| {
                let msg = format!("Failed to unmute user: {e}");
                warn!("{}", msg);
                msg
            })
    }

    async fn kick_user(&self, chat_id: i64, user_id: i64) -> Result<(), String> {
        info!("👢 Kicking user {} from chat {}", user_id, chat_id);

        self.bot
            .ban_chat_member(ChatId(chat_id), UserId(user_id as u64))
            .await
            .map_err(|e| {
                let msg = format!("Failed to kick user: {e}");
                warn!("{}", msg);
                msg
            })?;

        // Immediately unban so they can rejoin
        self.bot
            .unban_chat_member(ChatId(chat_id), UserId(user_id as u64))
            .await
            .map_err(|e| {
                let msg = format!("Failed to unban after kick: {e}");
                warn!("{}", msg);
                msg
            })?;

        Ok(())
    }
}
