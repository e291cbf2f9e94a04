//! Telegram messenger. Long-polls the Bot API for updates.
//!
//! Text and document messages become [`InboundEvent`]s keyed by the sender's
//! numeric user id. Replies go to the same id, which is the chat id of a
//! private conversation with the bot.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::channels::messenger::local_file_name;
use crate::channels::{DocumentRef, EventStream, InboundEvent, Messenger};
use crate::error::ChannelError;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Telegram messenger connected to the Bot API via long-polling.
pub struct TelegramMessenger {
    bot_token: SecretString,
    allowed_users: Vec<String>,
    client: reqwest::Client,
}

impl TelegramMessenger {
    pub fn new(bot_token: SecretString, allowed_users: Vec<String>) -> Self {
        Self {
            bot_token,
            allowed_users,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{method}",
            self.bot_token.expose_secret()
        )
    }

    fn file_url(&self, file_path: &str) -> String {
        format!(
            "https://api.telegram.org/file/bot{}/{file_path}",
            self.bot_token.expose_secret()
        )
    }

    /// Check if a username or id is in the allowed list.
    pub fn is_user_allowed(&self, identity: &str) -> bool {
        check_user_allowed(&self.allowed_users, [identity])
    }

    /// Send a text message, trying Markdown first with plain text fallback.
    /// Splits long messages that exceed Telegram's 4096 char limit.
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), ChannelError> {
        for chunk in split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH) {
            self.send_message_chunk(chat_id, &chunk).await?;
        }
        Ok(())
    }

    /// Send a single message chunk (≤4096 chars), Markdown-first with fallback.
    async fn send_message_chunk(&self, chat_id: &str, text: &str) -> Result<(), ChannelError> {
        let markdown_body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown"
        });

        let markdown_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&markdown_body)
            .send()
            .await
            .map_err(|e| send_failed(e.to_string()))?;

        if markdown_resp.status().is_success() {
            return Ok(());
        }

        let markdown_status = markdown_resp.status();
        tracing::warn!(
            status = ?markdown_status,
            "Telegram sendMessage with Markdown failed; retrying without parse_mode"
        );

        let plain_body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        let plain_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&plain_body)
            .send()
            .await
            .map_err(|e| send_failed(e.to_string()))?;

        if !plain_resp.status().is_success() {
            let plain_err = plain_resp.text().await.unwrap_or_default();
            return Err(send_failed(format!(
                "sendMessage failed (markdown: {markdown_status}, plain: {plain_err})"
            )));
        }

        Ok(())
    }

    /// Resolve a `file_id` to a server-side file path via `getFile`.
    async fn resolve_file_path(&self, file_id: &str) -> Result<String, ChannelError> {
        let resp = self
            .client
            .post(self.api_url("getFile"))
            .json(&serde_json::json!({ "file_id": file_id }))
            .send()
            .await
            .map_err(|e| ChannelError::Http(e.to_string()))?;

        let data: Value = resp
            .json()
            .await
            .map_err(|e| ChannelError::Http(e.to_string()))?;

        data.get("result")
            .and_then(|r| r.get("file_path"))
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| ChannelError::Http(format!("getFile returned no file_path: {data}")))
    }
}

fn send_failed(reason: String) -> ChannelError {
    ChannelError::SendFailed {
        name: "telegram".into(),
        reason,
    }
}

// ── Messenger trait implementation ──────────────────────────────────

#[async_trait]
impl Messenger for TelegramMessenger {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let url = self.api_url("getUpdates");
        let allowed_users = self.allowed_users.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram messenger listening for messages...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": 30,
                    "allowed_updates": ["message"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {}", e.without_url());
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {}", e.without_url());
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let Some(results) = data.get("result").and_then(Value::as_array) else {
                    continue;
                };

                for update in results {
                    if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                        offset = uid + 1;
                    }

                    let Some(event) = parse_update(update, &allowed_users) else {
                        continue;
                    };

                    if tx.send(event).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn deliver_text(&self, user_id: &str, text: &str) -> Result<(), ChannelError> {
        self.send_message(user_id, text).await
    }

    async fn send_status(&self, user_id: &str, text: &str) -> Result<(), ChannelError> {
        let _ = self
            .client
            .post(self.api_url("sendChatAction"))
            .json(&serde_json::json!({
                "chat_id": user_id,
                "action": "typing"
            }))
            .send()
            .await;
        self.send_message(user_id, text).await
    }

    async fn download_document(
        &self,
        document: &DocumentRef,
        dest_dir: &Path,
    ) -> Result<PathBuf, ChannelError> {
        let download_failed = |reason: String| ChannelError::DownloadFailed {
            name: "telegram".into(),
            file_ref: document.file_ref.clone(),
            reason,
        };

        let file_path = self.resolve_file_path(&document.file_ref).await?;

        let resp = self
            .client
            .get(self.file_url(&file_path))
            .send()
            .await
            .map_err(|e| download_failed(e.without_url().to_string()))?;

        if !resp.status().is_success() {
            return Err(download_failed(format!("file download returned {}", resp.status())));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| download_failed(e.without_url().to_string()))?;

        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| download_failed(e.to_string()))?;
        let local_path = dest_dir.join(local_file_name(document));
        tokio::fs::write(&local_path, &bytes)
            .await
            .map_err(|e| download_failed(e.to_string()))?;

        tracing::debug!(
            file_name = %document.file_name,
            bytes = bytes.len(),
            "Telegram document downloaded"
        );
        Ok(local_path)
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram messenger shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Turn one `getUpdates` entry into an event, if it is an allowed text or
/// document message.
fn parse_update(update: &Value, allowed_users: &[String]) -> Option<InboundEvent> {
    let message = update.get("message")?;
    let from = message.get("from")?;

    let user_id = from.get("id").and_then(Value::as_i64)?.to_string();
    let username = from
        .get("username")
        .and_then(Value::as_str)
        .unwrap_or("unknown");

    if !check_user_allowed(allowed_users, [username, user_id.as_str()]) {
        tracing::warn!(
            "Telegram: ignoring message from unauthorized user: username={username}, user_id={user_id}"
        );
        return None;
    }

    if let Some(document) = message.get("document") {
        let file_id = document.get("file_id").and_then(Value::as_str)?;
        let file_name = document
            .get("file_name")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return Some(InboundEvent::document(
            user_id,
            DocumentRef::new(file_id, file_name),
        ));
    }

    let text = message.get("text").and_then(Value::as_str)?;
    Some(InboundEvent::text(user_id, text))
}

/// Check if any identity matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

/// Split a message into chunks that fit Telegram's character limit.
/// Tries to split on newlines, then spaces, then hard-cuts on a char boundary.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut boundary = max_len;
        while !remaining.is_char_boundary(boundary) {
            boundary -= 1;
        }

        let chunk = &remaining[..boundary];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(boundary);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}
