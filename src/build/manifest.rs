// src/build/manifest.rs — ROM name and Android version from the manifest checkout

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::Command;

use crate::build::session::RomIdentity;
use crate::infra::paths;

const GIT_TIMEOUT: Duration = Duration::from_secs(5);

fn github_org_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"github\.com[:/]([^/]+)").expect("static regex"))
}

fn revision_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"revision="refs/tags/android-(\d+)\."#).expect("static regex"))
}

fn android_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"android-(\d+)\.\d+\.\d+").expect("static regex"))
}

/// Extract the GitHub organisation from an https or ssh remote URL.
pub fn github_org(remote_url: &str) -> Option<String> {
    github_org_re()
        .captures(remote_url)
        .map(|c| c[1].to_string())
}

pub fn avatar_url(org: &str) -> String {
    format!("https://github.com/{org}.png?size=200")
}

/// Android major version from `default.xml` content.
pub fn android_version_from_manifest(xml: &str) -> Option<String> {
    revision_tag_re()
        .captures(xml)
        .or_else(|| android_tag_re().captures(xml))
        .map(|c| c[1].to_string())
}

/// Detect the ROM identity. Falls back to the root directory name and "Unknown".
pub async fn detect(root: &Path) -> RomIdentity {
    let manifests = paths::manifests_dir(root);
    let fallback_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "ROM".into());

    let (rom_name, avatar) = match manifest_remote(&manifests).await {
        Some(url) => {
            println!("📡 Manifest remote: {url}");
            match github_org(&url) {
                Some(org) => {
                    let avatar = avatar_url(&org);
                    println!("✅ Found ROM: {org}");
                    (org, Some(avatar))
                }
                None => (fallback_name, None),
            }
        }
        None => {
            println!("⚠️  Using directory name as ROM name: {fallback_name}");
            (fallback_name, None)
        }
    };

    let android_version = std::fs::read_to_string(manifests.join("default.xml"))
        .ok()
        .and_then(|xml| android_version_from_manifest(&xml));
    match &android_version {
        Some(v) => println!("✅ Found Android version: {v}"),
        None => println!("⚠️  Could not detect Android version, using 'Unknown'"),
    }

    RomIdentity {
        rom_name,
        android_version: android_version.unwrap_or_else(|| "Unknown".into()),
        avatar_url: avatar,
    }
}

async fn manifest_remote(manifests: &Path) -> Option<String> {
    if !manifests.exists() {
        return None;
    }
    let output = tokio::time::timeout(
        GIT_TIMEOUT,
        Command::new("git")
            .arg("-C")
            .arg(manifests)
            .args(["remote", "get-url", "origin"])
            .kill_on_drop(true)
            .output(),
    )
    .await;

    match output {
        Ok(Ok(out)) if out.status.success() => {
            let url = String::from_utf8_lossy(&out.stdout).trim().to_string();
            (!url.is_empty()).then_some(url)
        }
        Ok(Ok(out)) => {
            tracing::warn!("git remote get-url exited with {}", out.status);
            None
        }
        Ok(Err(e)) => {
            tracing::warn!("Could not get manifest remote: {}", e);
            None
        }
        Err(_) => {
            tracing::warn!("git remote get-url timed out");
            None
        }
    }
}
