// src/upload/rclone.rs — Upload to a configured rclone remote
//
// Never overwrites: an existing `name.ext` on the remote makes the upload go
// to `name (1).ext`, `name (2).ext`, ... The local file is linked (or copied)
// under the new name into a private staging directory beside it; the
// directory is removed when the upload ends, however it ends.

use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use crate::infra::config::RcloneConfig;
use crate::infra::errors::{CiError, CiResult};
use crate::upload::Uploader;
use crate::util;

pub struct RcloneUploader {
    remote: String,
    folder: String,
    binary: PathBuf,
}

impl RcloneUploader {
    pub fn new(remote: impl Into<String>, folder: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            folder: folder.into(),
            binary: PathBuf::from("rclone"),
        }
    }

    /// `None` when no remote is configured.
    pub fn from_config(cfg: &RcloneConfig) -> Option<Self> {
        if !cfg.is_configured() {
            return None;
        }
        let remote = cfg.remote.as_deref()?.trim().trim_end_matches(':');
        Some(Self::new(remote, cfg.folder.trim_matches('/')))
    }

    /// Use a specific rclone executable instead of the one on PATH.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// `remote:folder`, or `remote:` for the remote root.
    pub fn destination(&self) -> String {
        format!("{}:{}", self.remote, self.folder)
    }

    /// Full remote path of a file in the destination.
    pub fn remote_path(&self, name: &str) -> String {
        if self.folder.is_empty() {
            format!("{}:{name}", self.remote)
        } else {
            format!("{}:{}/{name}", self.remote, self.folder)
        }
    }

    /// `rclone lsf` prints the entry when the file exists.
    async fn exists(&self, name: String) -> bool {
        let output = Command::new(&self.binary)
            .arg("lsf")
            .arg(self.remote_path(&name))
            .output()
            .await;
        match output {
            Ok(out) => out.status.success() && !String::from_utf8_lossy(&out.stdout).trim().is_empty(),
            Err(e) => {
                tracing::warn!("rclone lsf failed: {}", e);
                false
            }
        }
    }

    async fn transfer(&self, file: &Path) -> CiResult<()> {
        let mut child = Command::new(&self.binary)
            .arg("copy")
            .arg(file)
            .arg(self.destination())
            .args(["--progress", "--stats", "1s"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CiError::command("rclone copy", e.to_string()))?;

        let stderr = child.stderr.take().map(|s| tokio::spawn(echo_progress(s)));
        if let Some(stdout) = child.stdout.take() {
            echo_progress(stdout).await;
        }
        if let Some(handle) = stderr {
            let _ = handle.await;
        }

        let status = child.wait().await?;
        if status.success() {
            Ok(())
        } else {
            Err(CiError::command("rclone copy", status.to_string()))
        }
    }

    async fn link(&self, remote_path: &str) -> Option<String> {
        let out = Command::new(&self.binary)
            .arg("link")
            .arg(remote_path)
            .output()
            .await
            .ok()?;
        let link = String::from_utf8_lossy(&out.stdout).trim().to_string();
        (out.status.success() && !link.is_empty()).then_some(link)
    }

    async fn upload(&self, path: &Path) -> CiResult<String> {
        let original = util::file_name(path);
        let size = tokio::fs::metadata(path).await?.len();
        println!(
            "📤 Uploading via rclone: {original} ({:.2} MB)",
            util::size_mb(size)
        );
        println!("   Destination: {}", self.destination());
        println!("   Checking for existing file...");

        let name = first_free_name(&original, |candidate| self.exists(candidate)).await;

        let staged = if name != original {
            println!("   ✅ Using versioned name: {name}");
            Some(Staged::create(path, &name).await?)
        } else {
            None
        };

        self.transfer(staged.as_ref().map_or(path, Staged::file)).await?;
        drop(staged);
        println!("✅ Upload complete!");

        println!("Getting shareable link...");
        let remote_path = self.remote_path(&name);
        Ok(self.link(&remote_path).await.unwrap_or(remote_path))
    }
}

#[async_trait]
impl Uploader for RcloneUploader {
    fn name(&self) -> &str {
        "rclone"
    }

    async fn try_upload(&self, path: &Path) -> Option<String> {
        match self.upload(path).await {
            Ok(url) => Some(url),
            Err(e) => {
                println!("❌ Upload failed: {e}");
                None
            }
        }
    }
}

/// The local file under its versioned name, inside a temporary directory
/// that is deleted on drop.
struct Staged {
    _dir: tempfile::TempDir,
    file: PathBuf,
}

impl Staged {
    async fn create(source: &Path, name: &str) -> CiResult<Self> {
        let parent = match source.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let dir = tempfile::Builder::new()
            .prefix(".romci-upload-")
            .tempdir_in(&parent)?;
        let file = dir.path().join(name);
        if let Err(e) = tokio::fs::hard_link(source, &file).await {
            tracing::debug!("Hard link failed ({}), copying instead", e);
            tokio::fs::copy(source, &file).await?;
        }
        Ok(Self { _dir: dir, file })
    }

    fn file(&self) -> &Path {
        &self.file
    }
}

/// `name (n).ext`
pub fn versioned_name(name: &str, n: u32) -> String {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    match path.extension() {
        Some(ext) => format!("{stem} ({n}).{}", ext.to_string_lossy()),
        None => format!("{stem} ({n})"),
    }
}

/// First of `name`, `name (1).ext`, `name (2).ext`, ... that `exists` reports absent.
pub async fn first_free_name<F, Fut>(name: &str, mut exists: F) -> String
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = bool>,
{
    let mut candidate = name.to_string();
    let mut version = 0;
    while exists(candidate.clone()).await {
        version += 1;
        candidate = versioned_name(name, version);
        println!("   ⚠️  File exists, trying: {candidate}");
    }
    candidate
}

/// Transfer stats lines worth showing (rate, percentage, ETA).
pub fn is_transfer_progress(line: &str) -> bool {
    line.contains("Transferred:") || line.contains('%') || line.contains("ETA")
}

async fn echo_progress<R: AsyncRead + Unpin>(reader: R) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if !line.is_empty() && is_transfer_progress(line) {
            println!("   {line}");
        }
    }
}
