// src/build/banner.rs — Build banner image via ImageMagick
//
// Optional: if `convert` is missing or any step fails, the caller falls back
// to a plain text status message.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use crate::build::session::BuildSession;
use crate::infra::errors::{CiError, CiResult};

pub const BANNER_FILE: &str = "build_banner.png";
const LOGO_FILE: &str = "rom_logo.png";
const CIRCLE_FILE: &str = "logo_circle.png";
const MASK_FILE: &str = "mask.png";
const SHADOW_FILE: &str = "logo_shadow.png";

/// Everything this module may leave in the source root.
pub const TEMP_FILES: &[&str] = &[BANNER_FILE, LOGO_FILE, CIRCLE_FILE, MASK_FILE, SHADOW_FILE];

const LOGO_TIMEOUT: Duration = Duration::from_secs(10);

/// Render the banner into `<root>/build_banner.png`. Returns `None` on any failure.
pub async fn generate(session: &BuildSession) -> Option<PathBuf> {
    match try_generate(session).await {
        Ok(path) => Some(path),
        Err(e) => {
            tracing::warn!("Error generating banner: {}", e);
            None
        }
    }
}

fn info_line(session: &BuildSession) -> String {
    format!(
        "Device: {}  |  Android {}",
        session.device, session.android_version
    )
}

async fn try_generate(session: &BuildSession) -> CiResult<PathBuf> {
    which::which("convert").map_err(|_| CiError::ToolMissing("convert".into()))?;
    convert(["--version"]).await?;

    let root = &session.root;
    let banner = root.join(BANNER_FILE);
    convert([
        OsStr::new("-size"),
        OsStr::new("1920x1080"),
        OsStr::new("gradient:#2E3B8E-#6B2E8E"),
        banner.as_os_str(),
    ])
    .await?;

    let title = session.rom_name.to_uppercase();
    let logo = match &session.avatar_url {
        Some(url) => fetch_logo(url, &root.join(LOGO_FILE)).await,
        None => {
            tracing::info!("No GitHub org avatar available; rendering text-only banner");
            None
        }
    };

    match logo {
        Some(logo) => {
            compose_with_logo(root, &banner, &logo).await?;
            convert([
                banner.as_os_str(),
                OsStr::new("-gravity"),
                OsStr::new("center"),
                OsStr::new("-pointsize"),
                OsStr::new("200"),
                OsStr::new("-fill"),
                OsStr::new("white"),
                OsStr::new("-font"),
                OsStr::new("DejaVu-Sans-Bold"),
                OsStr::new("-annotate"),
                OsStr::new("+350-100"),
                OsStr::new(&title),
                banner.as_os_str(),
            ])
            .await?;
            let info = info_line(session);
            convert([
                banner.as_os_str(),
                OsStr::new("-gravity"),
                OsStr::new("center"),
                OsStr::new("-pointsize"),
                OsStr::new("65"),
                OsStr::new("-fill"),
                OsStr::new("white"),
                OsStr::new("-font"),
                OsStr::new("DejaVu-Sans"),
                OsStr::new("-annotate"),
                OsStr::new("+350+80"),
                OsStr::new(&info),
                banner.as_os_str(),
            ])
            .await?;
            remove_quietly(&root.join(CIRCLE_FILE));
            remove_quietly(&logo);
        }
        None => {
            let info = info_line(session);
            convert([
                banner.as_os_str(),
                OsStr::new("-gravity"),
                OsStr::new("center"),
                OsStr::new("-pointsize"),
                OsStr::new("180"),
                OsStr::new("-fill"),
                OsStr::new("white"),
                OsStr::new("-font"),
                OsStr::new("DejaVu-Sans-Bold"),
                OsStr::new("-annotate"),
                OsStr::new("+0-100"),
                OsStr::new(&title),
                OsStr::new("-pointsize"),
                OsStr::new("80"),
                OsStr::new("-fill"),
                OsStr::new("#E0E7FF"),
                OsStr::new("-annotate"),
                OsStr::new("+0+50"),
                OsStr::new(&info),
                banner.as_os_str(),
            ])
            .await?;
        }
    }

    if banner.exists() {
        Ok(banner)
    } else {
        Err(CiError::command("convert", "banner file was not produced"))
    }
}

/// Circular, shadowed logo composited on the left of the banner.
async fn compose_with_logo(root: &Path, banner: &Path, logo: &Path) -> CiResult<()> {
    let circle = root.join(CIRCLE_FILE);
    let mask = root.join(MASK_FILE);
    let shadow = root.join(SHADOW_FILE);

    convert([
        logo.as_os_str(),
        OsStr::new("-resize"),
        OsStr::new("400x400"),
        OsStr::new("-gravity"),
        OsStr::new("center"),
        OsStr::new("-extent"),
        OsStr::new("400x400"),
        OsStr::new("-background"),
        OsStr::new("white"),
        OsStr::new("-alpha"),
        OsStr::new("remove"),
        circle.as_os_str(),
    ])
    .await?;
    convert([
        OsStr::new("-size"),
        OsStr::new("400x400"),
        OsStr::new("xc:black"),
        OsStr::new("-fill"),
        OsStr::new("white"),
        OsStr::new("-draw"),
        OsStr::new("circle 200,200 200,0"),
        mask.as_os_str(),
    ])
    .await?;
    convert([
        circle.as_os_str(),
        mask.as_os_str(),
        OsStr::new("-alpha"),
        OsStr::new("off"),
        OsStr::new("-compose"),
        OsStr::new("copy_opacity"),
        OsStr::new("-composite"),
        circle.as_os_str(),
    ])
    .await?;
    convert([
        circle.as_os_str(),
        OsStr::new("("),
        OsStr::new("+clone"),
        OsStr::new("-background"),
        OsStr::new("black"),
        OsStr::new("-shadow"),
        OsStr::new("80x8+0+0"),
        OsStr::new(")"),
        OsStr::new("+swap"),
        OsStr::new("-background"),
        OsStr::new("none"),
        OsStr::new("-layers"),
        OsStr::new("merge"),
        OsStr::new("+repage"),
        shadow.as_os_str(),
    ])
    .await?;
    convert([
        banner.as_os_str(),
        shadow.as_os_str(),
        OsStr::new("-gravity"),
        OsStr::new("west"),
        OsStr::new("-geometry"),
        OsStr::new("+150+0"),
        OsStr::new("-composite"),
        banner.as_os_str(),
    ])
    .await?;

    remove_quietly(&mask);
    remove_quietly(&shadow);
    Ok(())
}

async fn convert<I, S>(args: I) -> CiResult<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new("convert")
        .args(args)
        .output()
        .await
        .map_err(|e| CiError::command("convert", e.to_string()))?;
    if output.status.success() {
        Ok(())
    } else {
        Err(CiError::command(
            "convert",
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ))
    }
}

/// Download the org avatar. `None` when it cannot be fetched.
async fn fetch_logo(url: &str, dest: &Path) -> Option<PathBuf> {
    println!("📥 Downloading logo from: {url}");
    let result = async {
        let resp = reqwest::Client::new()
            .get(url)
            .timeout(LOGO_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        let bytes = resp.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        Ok::<(), CiError>(())
    }
    .await;

    match result {
        Ok(()) => {
            println!("✅ Logo saved to: {}", dest.display());
            Some(dest.to_path_buf())
        }
        Err(e) => {
            println!("❌ Failed to download logo: {e}");
            None
        }
    }
}

fn remove_quietly(path: &Path) {
    let _ = std::fs::remove_file(path);
}

/// Delete banner temp files from the source root. Returns the names removed.
pub fn cleanup(root: &Path) -> Vec<&'static str> {
    TEMP_FILES
        .iter()
        .copied()
        .filter(|name| std::fs::remove_file(root.join(name)).is_ok())
        .collect()
}
