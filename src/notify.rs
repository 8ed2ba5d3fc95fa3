//! Telegram notification delivery
//!
//! Thin Bot API client: `sendMessage` for outgoing digests, plus typed
//! `getUpdates` / `setMyCommands` calls used by the auxiliary subcommands.
//! Digest bodies are sent as plain text, no parse mode, so formatting
//! characters in the digest arrive literally.

use crate::error::{BotError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Sink for outgoing digest text.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one text body to the configured destination.
    async fn send_text(&self, body: &str) -> Result<()>;
}

/// Telegram Bot API notifier
#[derive(Clone)]
pub struct TelegramNotifier {
    http: Client,
    base_url: String,
    bot_token: String,
    chat_id: String,
    enabled: bool,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            base_url: TELEGRAM_API_BASE.to_string(),
            bot_token,
            chat_id,
            enabled: true,
        })
    }

    /// No-op notifier for dry runs; every send is skipped and logged.
    pub fn disabled() -> Self {
        Self {
            http: Client::new(),
            base_url: TELEGRAM_API_BASE.to_string(),
            bot_token: String::new(),
            chat_id: String::new(),
            enabled: false,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.bot_token, method)
    }

    /// Recent updates for the bot. The alert loop never reads the chat;
    /// this backs the `updates` subcommand for chat id discovery.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>> {
        let mut request = self.http.get(self.method_url("getUpdates"));
        if let Some(offset) = offset {
            request = request.query(&[("offset", offset.to_string())]);
        }
        let response: ApiResponse<Vec<Update>> = request.send().await?.json().await?;
        api_result("getUpdates", response)
    }

    /// Register the bot's command list with Telegram.
    pub async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<()> {
        let response: ApiResponse<bool> = self
            .http
            .post(self.method_url("setMyCommands"))
            .json(&serde_json::json!({ "commands": commands }))
            .send()
            .await?
            .json()
            .await?;
        api_result("setMyCommands", response).map(|_| ())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_text(&self, body: &str) -> Result<()> {
        if !self.enabled {
            debug!("notifications disabled, skipping send");
            return Ok(());
        }

        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text: body,
        };
        let response: ApiResponse<Message> = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&request)
            .send()
            .await?
            .json()
            .await?;
        api_result("sendMessage", response).map(|_| ())
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Bot API envelope: `ok` plus either `result` or an error `description`.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    ok: bool,
    description: Option<String>,
    result: Option<T>,
}

pub(crate) fn api_result<T>(method: &str, response: ApiResponse<T>) -> Result<T> {
    if !response.ok {
        return Err(BotError::Notify(format!(
            "{method}: {}",
            response
                .description
                .unwrap_or_else(|| "unknown telegram error".to_string())
        )));
    }
    response
        .result
        .ok_or_else(|| BotError::Notify(format!("{method}: missing result")))
}

/// One entry from `getUpdates`.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub username: Option<String>,
}

/// Command descriptor for `setMyCommands`.
#[derive(Debug, Clone, Serialize)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}
