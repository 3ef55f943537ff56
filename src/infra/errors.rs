// src/infra/errors.rs — Error types for romci

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CiError {
    // Chat transport errors (never fatal to the build)
    #[error("Telegram {method} failed: {description}")]
    Telegram { method: String, description: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Upload backends
    #[error("GoFile error: {0}")]
    Gofile(String),

    // External tools
    #[error("Command `{command}` failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("Required tool '{0}' not found in PATH")]
    ToolMissing(String),

    // Infra
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CiError {
    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        CiError::CommandFailed {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Telegram answers edits that change nothing with a 400 "message is not
    /// modified"; callers treat that as success.
    pub fn is_not_modified(&self) -> bool {
        matches!(self, CiError::Telegram { description, .. } if description.contains("not modified"))
    }
}

pub type CiResult<T> = Result<T, CiError>;
