// src/notify/types.rs — Chat transport trait and inline keyboard payloads

use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;

use crate::infra::errors::CiResult;

/// Opaque identifier the chat service assigns to a sent message.
pub type MessageId = i64;

/// A clickable URL button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineButton {
    pub text: String,
    pub url: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: url.into(),
        }
    }
}

/// Rows of URL buttons attached below a message (`reply_markup`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InlineKeyboard {
    pub inline_keyboard: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    pub fn rows(&self) -> &[Vec<InlineButton>] {
        &self.inline_keyboard
    }
}

/// Raw chat transport. Implementations report every failure; the
/// [`Notifier`](super::Notifier) decides what is fatal (nothing is).
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn send_text(&self, chat_id: &str, text: &str) -> CiResult<MessageId>;

    async fn send_photo(&self, chat_id: &str, photo: &Path, caption: &str)
        -> CiResult<MessageId>;

    async fn send_file(&self, chat_id: &str, file: &Path) -> CiResult<MessageId>;

    async fn edit_text(
        &self,
        chat_id: &str,
        message_id: MessageId,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> CiResult<()>;

    async fn edit_caption(
        &self,
        chat_id: &str,
        message_id: MessageId,
        caption: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> CiResult<()>;
}

/// Telegram rejects the whole edit if any button URL is not a web link.
pub fn is_web_link(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

/// First row is the ROM download; boot images follow two per row.
/// Entries whose link is not a web URL (e.g. a failed upload) get no button,
/// and `None` is returned when nothing is left to show.
pub fn download_buttons(rom_url: &str, boot_images: &[(String, String)]) -> Option<InlineKeyboard> {
    let mut rows = Vec::new();
    if is_web_link(rom_url) {
        rows.push(vec![InlineButton::new("📥 Download ROM", rom_url)]);
    }
    let images: Vec<&(String, String)> =
        boot_images.iter().filter(|(_, url)| is_web_link(url)).collect();
    for pair in images.chunks(2) {
        rows.push(
            pair.iter()
                .map(|(name, url)| InlineButton::new(image_label(name), url.clone()))
                .collect(),
        );
    }
    if rows.is_empty() {
        return None;
    }
    Some(InlineKeyboard {
        inline_keyboard: rows,
    })
}

/// `vendor_boot.img` -> `Vendor Boot`
pub fn image_label(name: &str) -> String {
    name.trim_end_matches(".img")
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn images(names: &[&str]) -> Vec<(String, String)> {
        names
            .iter()
            .map(|n| (n.to_string(), format!("https://x/{n}")))
            .collect()
    }

    #[test]
    fn test_rom_only_keyboard() {
        let kb = download_buttons("https://x/rom.zip", &[]).unwrap();
        assert_eq!(kb.rows().len(), 1);
        assert_eq!(kb.rows()[0][0].text, "📥 Download ROM");
        assert_eq!(kb.rows()[0][0].url, "https://x/rom.zip");
    }

    #[test]
    fn test_boot_images_two_per_row() {
        let kb = download_buttons(
            "https://x/rom.zip",
            &images(&["vendor_boot.img", "boot.img", "init_boot.img"]),
        )
        .unwrap();
        let rows = kb.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].len(), 2);
        assert_eq!(rows[1][0].text, "Vendor Boot");
        assert_eq!(rows[1][1].text, "Boot");
        assert_eq!(rows[2].len(), 1);
        assert_eq!(rows[2][0].text, "Init Boot");
        assert_eq!(rows[2][0].url, "https://x/init_boot.img");
    }

    #[test]
    fn test_keyboard_serializes_as_reply_markup() {
        let kb = download_buttons("https://u", &[]).unwrap();
        let json = serde_json::to_value(&kb).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"inline_keyboard": [[{"text": "📥 Download ROM", "url": "https://u"}]]})
        );
    }

    #[test]
    fn test_non_web_links_get_no_button() {
        assert_eq!(download_buttons("Upload failed", &[]), None);

        let kb = download_buttons(
            "Upload failed",
            &[
                ("boot.img".into(), "Upload failed".into()),
                ("vendor_boot.img".into(), "https://x/vb.img".into()),
            ],
        )
        .unwrap();
        assert_eq!(kb.rows().len(), 1);
        assert_eq!(kb.rows()[0], vec![InlineButton::new("Vendor Boot", "https://x/vb.img")]);
        assert!(kb.rows().iter().flatten().all(|b| is_web_link(&b.url)));
    }

    #[test]
    fn test_image_label() {
        assert_eq!(image_label("vendor_boot.img"), "Vendor Boot");
        assert_eq!(image_label("boot.img"), "Boot");
        assert_eq!(image_label("INIT_BOOT.img"), "Init Boot");
    }
}
