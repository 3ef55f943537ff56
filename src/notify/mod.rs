// src/notify/mod.rs — Best-effort status reporting on the chat service
//
// Notification failures are never fatal to the build: every call here logs
// and degrades instead of returning an error.

pub mod messages;
pub mod telegram;
pub mod types;

use std::path::Path;
use std::sync::Arc;

pub use types::{download_buttons, ChatApi, InlineButton, InlineKeyboard, MessageId};

use crate::infra::config::TelegramConfig;
use crate::infra::errors::CiResult;

/// Chat facade bound to the primary and error channels.
#[derive(Clone)]
pub struct Notifier {
    api: Arc<dyn ChatApi>,
    chat_id: String,
    error_chat_id: String,
}

impl Notifier {
    pub fn new(api: Arc<dyn ChatApi>, chat_id: impl Into<String>, error_chat_id: Option<String>) -> Self {
        let chat_id = chat_id.into();
        let error_chat_id = error_chat_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| chat_id.clone());
        Self {
            api,
            chat_id,
            error_chat_id,
        }
    }

    pub fn from_config(cfg: &TelegramConfig) -> Self {
        Self::new(
            Arc::new(telegram::TelegramApi::from_config(cfg)),
            cfg.chat_id.clone(),
            cfg.error_chat_id.clone(),
        )
    }

    pub async fn send_text(&self, text: &str) -> Option<MessageId> {
        logged("sending message", self.api.send_text(&self.chat_id, text).await)
    }

    pub async fn send_photo(&self, photo: &Path, caption: &str) -> Option<MessageId> {
        logged(
            "sending photo",
            self.api.send_photo(&self.chat_id, photo, caption).await,
        )
    }

    pub async fn send_file(&self, file: &Path) -> Option<MessageId> {
        logged("sending file", self.api.send_file(&self.chat_id, file).await)
    }

    /// Failure logs go to the dedicated error chat.
    pub async fn send_file_to_error_chat(&self, file: &Path) -> Option<MessageId> {
        logged(
            "sending file",
            self.api.send_file(&self.error_chat_id, file).await,
        )
    }

    pub async fn edit_text(&self, id: MessageId, text: &str, keyboard: Option<&InlineKeyboard>) {
        let result = self.api.edit_text(&self.chat_id, id, text, keyboard).await;
        log_edit("editing message", result);
    }

    pub async fn edit_caption(
        &self,
        id: MessageId,
        caption: &str,
        keyboard: Option<&InlineKeyboard>,
    ) {
        let result = self
            .api
            .edit_caption(&self.chat_id, id, caption, keyboard)
            .await;
        log_edit("editing caption", result);
    }
}

fn logged<T>(action: &str, result: CiResult<T>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("Error {}: {}", action, e);
            None
        }
    }
}

fn log_edit(action: &str, result: CiResult<()>) {
    match result {
        Ok(()) => {}
        Err(e) if e.is_not_modified() => tracing::debug!("{}: content unchanged", action),
        Err(e) => tracing::warn!("Error {}: {}", action, e),
    }
}

/// How the build status message was posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMode {
    Text,
    /// Banner photo; status lives in the caption.
    Photo,
}

/// Handle to the single message that tracks the build status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMessage {
    id: Option<MessageId>,
    mode: StatusMode,
}

impl StatusMessage {
    /// No message could be posted; updates become no-ops.
    pub fn unsent() -> Self {
        Self {
            id: None,
            mode: StatusMode::Text,
        }
    }

    pub fn text(id: Option<MessageId>) -> Self {
        Self {
            id,
            mode: StatusMode::Text,
        }
    }

    pub fn photo(id: MessageId) -> Self {
        Self {
            id: Some(id),
            mode: StatusMode::Photo,
        }
    }

    pub fn mode(&self) -> StatusMode {
        self.mode
    }

    /// Edit the message in place, as text or caption depending on its mode.
    pub async fn update(
        &self,
        notifier: &Notifier,
        body: &str,
        keyboard: Option<&InlineKeyboard>,
    ) {
        let Some(id) = self.id else {
            return;
        };
        match self.mode {
            StatusMode::Text => notifier.edit_text(id, body, keyboard).await,
            StatusMode::Photo => notifier.edit_caption(id, body, keyboard).await,
        }
    }
}
