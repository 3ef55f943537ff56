// src/build/session.rs — Per-invocation build context

use std::path::PathBuf;

use crate::infra::config::BuildConfig;
use crate::infra::paths;

/// ROM identity detected from the manifest checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomIdentity {
    pub rom_name: String,
    pub android_version: String,
    /// GitHub org avatar, used as the banner logo
    pub avatar_url: Option<String>,
}

/// Everything the pipeline components need to know about this build.
/// Created once at startup and passed by reference; never global.
#[derive(Debug, Clone)]
pub struct BuildSession {
    pub rom_name: String,
    pub device: String,
    pub android_version: String,
    pub variant: String,
    pub official: bool,
    pub rom_type: String,
    pub avatar_url: Option<String>,
    pub root: PathBuf,
    pub out_dir: PathBuf,
    pub build_log: PathBuf,
    pub error_log: PathBuf,
}

impl BuildSession {
    pub fn new(build: &BuildConfig, root: PathBuf, identity: RomIdentity) -> Self {
        Self {
            rom_name: identity.rom_name,
            device: build.device.clone(),
            android_version: identity.android_version,
            variant: build.variant.clone(),
            official: build.official,
            rom_type: build.rom_type.clone(),
            avatar_url: identity.avatar_url,
            out_dir: paths::product_dir(&root, &build.device),
            build_log: paths::build_log(&root),
            error_log: paths::error_log(&root),
            root,
        }
    }

    pub fn build_type(&self) -> &'static str {
        if self.official {
            "Official"
        } else {
            "Unofficial"
        }
    }
}
