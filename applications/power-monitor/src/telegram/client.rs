use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::debug;

use super::types::{
    AnswerCallbackQuery, ApiResponse, EditMessageText, GetUpdates, InlineKeyboardMarkup, Message,
    SendMessage, Update, PARSE_MODE_HTML,
};
use crate::config::TelegramConfig;
use crate::error::{AppError, Result};
use crate::notify::NotificationGateway;

/// Headroom on top of the long-polling timeout before the HTTP request gives up.
const REQUEST_TIMEOUT_MARGIN_SECS: u64 = 10;

/// Minimal Telegram Bot API client.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    chat_id: String,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(
                config.poll_timeout_secs + REQUEST_TIMEOUT_MARGIN_SECS,
            ))
            .build()
            .map_err(|e| AppError::Http(e.without_url()))?;

        Ok(Self {
            http,
            base_url: format!(
                "{}/bot{}",
                config.api_base_url.trim_end_matches('/'),
                config.bot_token
            ),
            chat_id: config.chat_id.clone(),
        })
    }

    /// Configured destination channel for proactive notifications.
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    async fn call<P, R>(&self, method: &str, payload: &P) -> Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        // The URL embeds the bot token, so it is stripped from transport errors.
        let response = self
            .http
            .post(format!("{}/{}", self.base_url, method))
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::Http(e.without_url()))?;

        let body: ApiResponse<R> = response
            .json()
            .await
            .map_err(|e| AppError::Http(e.without_url()))?;

        if !body.ok {
            return Err(AppError::Telegram(format!(
                "{} failed: {}",
                method,
                body.description.unwrap_or_else(|| "no description".to_string())
            )));
        }

        body.result
            .ok_or_else(|| AppError::Telegram(format!("{} returned no result", method)))
    }

    pub async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<Message> {
        self.call(
            "sendMessage",
            &SendMessage {
                chat_id,
                text,
                parse_mode: PARSE_MODE_HTML,
                reply_markup,
            },
        )
        .await
    }

    pub async fn edit_message_text(&self, chat_id: &str, message_id: i64, text: &str) -> Result<()> {
        // Telegram answers with either the edited message or `true`.
        let _: serde_json::Value = self
            .call(
                "editMessageText",
                &EditMessageText {
                    chat_id,
                    message_id,
                    text,
                    parse_mode: PARSE_MODE_HTML,
                },
            )
            .await?;
        Ok(())
    }

    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<()> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                &AnswerCallbackQuery { callback_query_id },
            )
            .await?;
        Ok(())
    }

    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        let updates: Vec<Update> = self
            .call(
                "getUpdates",
                &GetUpdates {
                    offset,
                    timeout: timeout_secs,
                    allowed_updates: vec!["message", "callback_query"],
                },
            )
            .await?;
        debug!(count = updates.len(), ?offset, "received updates");
        Ok(updates)
    }
}

#[async_trait]
impl NotificationGateway for TelegramClient {
    async fn send(&self, text: &str) -> Result<()> {
        self.send_message(&self.chat_id, text, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base: &str) -> TelegramConfig {
        TelegramConfig {
            bot_token: "123:abc".to_string(),
            chat_id: "-100200".to_string(),
            api_base_url: base.to_string(),
            poll_timeout_secs: 30,
        }
    }

    #[test]
    fn test_base_url_includes_token() {
        let client = TelegramClient::new(&config("https://api.telegram.org/")).unwrap();
        assert_eq!(client.base_url, "https://api.telegram.org/bot123:abc");
        assert_eq!(client.chat_id(), "-100200");
    }

    #[tokio::test]
    async fn test_unreachable_api_is_an_http_error_without_token() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let client = TelegramClient::new(&config("http://127.0.0.1:9")).unwrap();
        let err = client.send("hello").await.unwrap_err();

        assert!(matches!(err, AppError::Http(_)));
        assert!(!err.to_string().contains("123:abc"));
    }
}
