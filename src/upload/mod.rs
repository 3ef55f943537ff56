// src/upload/mod.rs — Artifact upload with ordered fallback
//
// Backends are tried in order; the first one that returns a URL wins.
// No backend is retried: falling back is a choice between services.

pub mod gofile;
pub mod rclone;

use async_trait::async_trait;
use std::path::Path;

use crate::infra::config::Config;

/// Terminal result when every backend failed. Shown verbatim to users.
pub const UPLOAD_FAILED: &str = "Upload failed";

/// One upload backend.
#[async_trait]
pub trait Uploader: Send + Sync {
    fn name(&self) -> &str;

    /// Upload the file and return a shareable URL, or `None` if this backend failed.
    async fn try_upload(&self, path: &Path) -> Option<String>;
}

/// Ordered chain of upload backends.
pub struct UploadChain {
    uploaders: Vec<Box<dyn Uploader>>,
}

impl UploadChain {
    pub fn new(uploaders: Vec<Box<dyn Uploader>>) -> Self {
        Self { uploaders }
    }

    /// rclone first when a remote is configured, GoFile always last.
    pub fn from_config(config: &Config) -> Self {
        let mut uploaders: Vec<Box<dyn Uploader>> = Vec::new();
        if let Some(rclone) = rclone::RcloneUploader::from_config(&config.rclone) {
            uploaders.push(Box::new(rclone));
        }
        uploaders.push(Box::new(gofile::GofileUploader::from_config(&config.gofile)));
        Self::new(uploaders)
    }

    pub fn names(&self) -> Vec<&str> {
        self.uploaders.iter().map(|u| u.name()).collect()
    }

    /// URL from the first backend that succeeds, else [`UPLOAD_FAILED`].
    pub async fn upload(&self, path: &Path) -> String {
        for uploader in &self.uploaders {
            match uploader.try_upload(path).await {
                Some(url) => return url,
                None => {
                    tracing::warn!(
                        backend = uploader.name(),
                        "Upload of {} failed, trying next backend",
                        path.display()
                    );
                }
            }
        }
        UPLOAD_FAILED.to_string()
    }
}
