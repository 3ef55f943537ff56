// src/notify/messages.rs — HTML bodies for the build status message

use crate::build::session::BuildSession;
use crate::notify::types::image_label;
use crate::notify::StatusMode;
use crate::util;

/// Escape text interpolated into Telegram HTML.
pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Figures shown in the final success message.
#[derive(Debug, Clone)]
pub struct SuccessReport {
    pub duration_secs: u64,
    pub actions: String,
    pub file_name: String,
    pub size_bytes: u64,
    pub sha256: String,
    /// ROM link, or the upload-failure marker when every backend failed.
    pub rom_url: String,
    /// `(file name, link)` per uploaded boot image.
    pub boot_images: Vec<(String, String)>,
}

pub fn syncing(s: &BuildSession) -> String {
    format!(
        "🟡 | <i>Syncing sources!!</i>\n\n\
         <b>• ROM:</b> <code>{}</code>\n\
         <b>• DEVICE:</b> <code>{}</code>\n\
         <b>• ANDROID VERSION:</b> <code>{}</code>",
        escape(&s.rom_name),
        escape(&s.device),
        escape(&s.android_version),
    )
}

pub fn synced(s: &BuildSession) -> String {
    format!(
        "🟢 | <i>Sources synced!!</i>\n\n\
         <b>• ROM:</b> <code>{}</code>\n\
         <b>• DEVICE:</b> <code>{}</code>",
        escape(&s.rom_name),
        escape(&s.device),
    )
}

pub fn sync_failed() -> String {
    "🔴 | <i>Sync failed, continuing with build...</i>".into()
}

/// Caption posted with the banner before the build starts.
pub fn banner_initial(s: &BuildSession) -> String {
    format!(
        "<b>🔨 Building {}</b>\n\n\
         <b>Device:</b> {} | <b>Android:</b> {}\n\
         <b>Type:</b> {}\n\n\
         <b>⏳ Status:</b> Initializing build...",
        escape(&s.rom_name),
        escape(&s.device),
        escape(&s.android_version),
        s.build_type(),
    )
}

/// Status body for a progress snapshot, in the shape matching the message mode.
pub fn progress(s: &BuildSession, mode: StatusMode, progress: &str) -> String {
    match mode {
        StatusMode::Photo => format!(
            "<b>🔨 Building {}</b>\n\n\
             <b>Device:</b> {} | <b>Android:</b> {}\n\
             <b>Type:</b> {}\n\n\
             <b>⏳ Progress:</b> {}",
            escape(&s.rom_name),
            escape(&s.device),
            escape(&s.android_version),
            s.build_type(),
            escape(progress),
        ),
        StatusMode::Text => format!(
            "🟡 | <i>Compiling ROM...</i>\n\n\
             <b>• ROM:</b> <code>{}</code>\n\
             <b>• DEVICE:</b> <code>{}</code>\n\
             <b>• ANDROID VERSION:</b> <code>{}</code>\n\
             <b>• TYPE:</b> <code>{}</code>\n\
             <b>• PROGRESS:</b> <code>{}</code>",
            escape(&s.rom_name),
            escape(&s.device),
            escape(&s.android_version),
            s.build_type(),
            escape(progress),
        ),
    }
}

pub fn uploading(s: &BuildSession, what: &str) -> String {
    format!(
        "<b>📤 Uploading Files...</b>\n\n\
         <b>Device:</b> {} | <b>Android:</b> {}\n\
         <b>Type:</b> {}\n\n\
         <b>⏳ Status:</b> Uploading {}...",
        escape(&s.device),
        escape(&s.android_version),
        s.build_type(),
        what,
    )
}

pub fn failed(s: &BuildSession) -> String {
    format!(
        "<b>❌ {} Build Failed</b>\n\n\
         <b>Device:</b> {} | <b>Android:</b> {}\n\n\
         <i>Check logs below</i>",
        escape(&s.rom_name),
        escape(&s.device),
        escape(&s.android_version),
    )
}

pub fn success(s: &BuildSession, r: &SuccessReport) -> String {
    let mut body = format!(
        "<b>✅ {} Build Complete!</b>\n\n\
         <b>Device:</b> {} | <b>Android:</b> {}\n\
         <b>Type:</b> {} | <b>Build Type:</b> {}\n\n\
         <b>📊 Build Stats:</b>\n\
         <b>• Duration:</b> {}\n\
         <b>• Actions:</b> {}\n\n\
         <b>🔧 Configuration:</b>\n\
         <b>• File:</b> <code>{}</code>\n\
         <b>• Size:</b> {:.2} GiB\n\
         <b>• SHA256:</b> <code>{}</code>",
        escape(&s.rom_name),
        escape(&s.device),
        escape(&s.android_version),
        s.build_type(),
        escape(&s.variant),
        util::format_duration(r.duration_secs),
        escape(&r.actions),
        escape(&r.file_name),
        util::size_gib(r.size_bytes),
        r.sha256,
    );
    body.push_str(&format!("\n\n<b>📥 Download:</b> {}", escape(&r.rom_url)));
    for (name, url) in &r.boot_images {
        body.push_str(&format!("\n<b>• {}:</b> {}", image_label(name), escape(url)));
    }
    body
}

pub fn interrupted(s: &BuildSession) -> String {
    format!(
        "⚠️ | <i>Build interrupted by user</i>\n\n\
         <b>• ROM:</b> <code>{}</code>\n\
         <b>• DEVICE:</b> <code>{}</code>\n\n\
         <i>Build was cancelled</i>",
        escape(&s.rom_name),
        escape(&s.device),
    )
}
