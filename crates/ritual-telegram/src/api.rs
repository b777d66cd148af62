use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

use crate::types::{ApiResponse, InlineKeyboardMarkup, Message, ReplyMarkup, Update, User};

const API_BASE: &str = "https://api.telegram.org";

/// Ceiling for ordinary method calls. Long polls get their own, longer
/// deadline so the server side always expires first.
const CALL_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("api error {code}: {description}")]
    Api { code: i32, description: String },
    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct BotApi {
    http: Client,
    base: String,
}

impl BotApi {
    pub fn new(token: &str) -> Result<Self, TelegramError> {
        let http = Client::builder().timeout(CALL_TIMEOUT).build()?;
        Ok(Self {
            http,
            base: format!("{}/bot{}", API_BASE, token),
        })
    }

    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", &json!({})).await
    }

    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        let payload = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        self.call_with_timeout("getUpdates", &payload, Duration::from_secs(timeout_secs + 10))
            .await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<&ReplyMarkup>,
    ) -> Result<Message, TelegramError> {
        let mut payload = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        });
        if let Some(markup) = reply_markup {
            payload["reply_markup"] = serde_json::to_value(markup)?;
        }
        self.call("sendMessage", &payload).await
    }

    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<(), TelegramError> {
        let mut payload = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
            "parse_mode": "HTML",
        });
        if let Some(markup) = reply_markup {
            payload["reply_markup"] = serde_json::to_value(markup)?;
        }
        // Returns the edited message, or plain `true` for inline-mode
        // messages; callers have no use for either.
        let _: serde_json::Value = self.call("editMessageText", &payload).await?;
        Ok(())
    }

    /// Stops the client-side spinner on the pressed button.
    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TelegramError> {
        let _: bool = self
            .call("answerCallbackQuery", &json!({ "callback_query_id": callback_query_id }))
            .await?;
        Ok(())
    }

    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), TelegramError> {
        let _: bool = self
            .call("deleteMessage", &json!({ "chat_id": chat_id, "message_id": message_id }))
            .await?;
        Ok(())
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &serde_json::Value,
    ) -> Result<T, TelegramError> {
        self.call_with_timeout(method, payload, CALL_TIMEOUT).await
    }

    async fn call_with_timeout<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &serde_json::Value,
        timeout: Duration,
    ) -> Result<T, TelegramError> {
        let resp = self
            .http
            .post(format!("{}/{}", self.base, method))
            .timeout(timeout)
            .json(payload)
            .send()
            .await?;

        let body: ApiResponse<T> = resp.json().await?;
        if !body.ok {
            return Err(TelegramError::Api {
                code: body.error_code.unwrap_or(0),
                description: body.description.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        body.result.ok_or(TelegramError::Api {
            code: 0,
            description: "ok response with no result".to_string(),
        })
    }
}
