// src/notify/telegram.rs — Telegram transport (Bot API)
//
// Uses the Telegram Bot API (https://core.telegram.org/bots/api).
// All text is sent with parse_mode=HTML.

use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::infra::config::TelegramConfig;
use crate::infra::errors::{CiError, CiResult};
use crate::notify::types::{ChatApi, InlineKeyboard, MessageId};
use crate::util;

/// Timeout for messages, photos and edits.
const MESSAGE_TIMEOUT: Duration = Duration::from_secs(30);
/// Documents (build logs) can be large.
const DOCUMENT_TIMEOUT: Duration = Duration::from_secs(300);

pub struct TelegramApi {
    client: Client,
    api_base: String,
    bot_token: String,
}

impl TelegramApi {
    pub fn new(api_base: impl Into<String>, bot_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
            bot_token: bot_token.into(),
        }
    }

    pub fn from_config(cfg: &TelegramConfig) -> Self {
        Self::new(cfg.api_base.trim_end_matches('/'), cfg.bot_token.clone())
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> CiResult<T> {
        let resp: TelegramResponse<T> = self
            .client
            .post(self.api_url(method))
            .timeout(MESSAGE_TIMEOUT)
            .json(body)
            .send()
            .await?
            .json()
            .await?;
        resp.into_result(method)
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        method: &str,
        form: Form,
        timeout: Duration,
    ) -> CiResult<T> {
        let resp: TelegramResponse<T> = self
            .client
            .post(self.api_url(method))
            .timeout(timeout)
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;
        resp.into_result(method)
    }

    async fn edit(
        &self,
        method: &str,
        mut body: serde_json::Value,
        keyboard: Option<&InlineKeyboard>,
    ) -> CiResult<()> {
        if let Some(kb) = keyboard {
            body["reply_markup"] = serde_json::to_value(kb)?;
        }
        // editMessage* returns the edited Message, or `true` for inline messages.
        let _: serde_json::Value = self.post_json(method, &body).await?;
        Ok(())
    }
}

// -- Telegram API response types --

#[derive(Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> TelegramResponse<T> {
    fn into_result(self, method: &str) -> CiResult<T> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(CiError::Telegram {
                method: method.to_string(),
                description: self.description.unwrap_or_else(|| "unknown".into()),
            }),
        }
    }
}

#[derive(Deserialize)]
struct SentMessage {
    message_id: MessageId,
}

// -- ChatApi implementation --

#[async_trait]
impl ChatApi for TelegramApi {
    async fn send_text(&self, chat_id: &str, text: &str) -> CiResult<MessageId> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        let sent: SentMessage = self.post_json("sendMessage", &body).await?;
        Ok(sent.message_id)
    }

    async fn send_photo(
        &self,
        chat_id: &str,
        photo: &Path,
        caption: &str,
    ) -> CiResult<MessageId> {
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .text("parse_mode", "HTML")
            .part("photo", util::file_part(photo).await?);
        let sent: SentMessage = self.post_form("sendPhoto", form, MESSAGE_TIMEOUT).await?;
        Ok(sent.message_id)
    }

    async fn send_file(&self, chat_id: &str, file: &Path) -> CiResult<MessageId> {
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("parse_mode", "HTML")
            .part("document", util::file_part(file).await?);
        let sent: SentMessage = self
            .post_form("sendDocument", form, DOCUMENT_TIMEOUT)
            .await?;
        Ok(sent.message_id)
    }

    async fn edit_text(
        &self,
        chat_id: &str,
        message_id: MessageId,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> CiResult<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        self.edit("editMessageText", body, keyboard).await
    }

    async fn edit_caption(
        &self,
        chat_id: &str,
        message_id: MessageId,
        caption: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> CiResult<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "caption": caption,
            "parse_mode": "HTML",
        });
        self.edit("editMessageCaption", body, keyboard).await
    }
}
