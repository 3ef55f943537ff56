// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::infra::errors::CiError;
use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Preferred upload target. Uploads go to GoFile when `remote` is unset.
    #[serde(default)]
    pub rclone: RcloneConfig,

    #[serde(default)]
    pub gofile: GofileConfig,

    #[serde(default)]
    pub power: PowerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Device codename, e.g. "cancunf"
    pub device: String,
    /// "user", "userdebug" or "eng"
    pub variant: String,
    pub official: bool,
    /// AxionAOSP flavor ("axion-pico", "axion-core", "axion-vanilla").
    /// Empty selects the generic `brunch` flow.
    pub rom_type: String,
    /// ROM archives at or below this size are ignored (OTA fragments, partial zips).
    pub min_rom_size_mb: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            variant: "userdebug".into(),
            official: false,
            rom_type: String::new(),
            min_rom_size_mb: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
    /// Chat receiving failure logs. Defaults to `chat_id`.
    #[serde(default)]
    pub error_chat_id: Option<String>,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".into()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            error_chat_id: None,
            api_base: default_telegram_api(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RcloneConfig {
    /// rclone remote name, e.g. "gdrive"
    #[serde(default)]
    pub remote: Option<String>,
    /// Folder inside the remote; empty means the remote root
    #[serde(default)]
    pub folder: String,
}

impl RcloneConfig {
    pub fn is_configured(&self) -> bool {
        self.remote.as_deref().is_some_and(|r| !r.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GofileConfig {
    #[serde(default = "default_gofile_api")]
    pub api_base: String,
}

fn default_gofile_api() -> String {
    "https://api.gofile.io".into()
}

impl Default for GofileConfig {
    fn default() -> Self {
        Self {
            api_base: default_gofile_api(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerConfig {
    /// Shut the machine down after a completed run
    pub poweroff: bool,
    /// Grace period during which Ctrl+C cancels the shutdown
    pub delay_secs: u64,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            poweroff: false,
            delay_secs: 10,
        }
    }
}

impl Config {
    /// Load config from `./romci.toml`, then the user-level file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let local = Path::new(paths::LOCAL_CONFIG);
        if local.exists() {
            return Self::load_from(local);
        }
        match paths::config_file_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Reject configurations that cannot produce a build command.
    pub fn validate(&self) -> Result<(), CiError> {
        if self.build.device.trim().is_empty() {
            return Err(CiError::Config("build.device is not set".into()));
        }
        if !matches!(self.build.variant.as_str(), "user" | "userdebug" | "eng") {
            return Err(CiError::Config(format!(
                "build.variant must be user, userdebug or eng (got '{}')",
                self.build.variant
            )));
        }
        if self.telegram.bot_token.is_empty() || self.telegram.chat_id.is_empty() {
            tracing::warn!("Telegram bot_token/chat_id not set; status messages will not be delivered");
        }
        Ok(())
    }

    pub fn min_rom_size_bytes(&self) -> u64 {
        self.build.min_rom_size_mb.saturating_mul(1024 * 1024)
    }
}
