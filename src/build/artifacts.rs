// src/build/artifacts.rs — Locating and fingerprinting build outputs

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::util;

/// ROM archive name patterns, in priority order.
pub const ROM_PATTERNS: &[&str] = &[
    "axion-*.zip",
    "lineage-*.zip",
    "voltage-*.zip",
    "arrow-*.zip",
    "evolution-*.zip",
];

/// Boot images uploaded alongside the ROM, in upload order.
pub const BOOT_IMAGES: &[&str] = &["vendor_boot.img", "boot.img", "init_boot.img"];

/// Boot images are only published for devices that ship a vendor_boot.
pub const BOOT_IMAGE_MARKER: &str = "vendor_boot.img";

/// The flashable ROM archive produced by a successful build.
#[derive(Debug, Clone)]
pub struct RomArtifact {
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
    pub sha256: String,
}

impl RomArtifact {
    /// Stat and hash the archive.
    pub fn inspect(path: PathBuf) -> std::io::Result<Self> {
        let size_bytes = std::fs::metadata(&path)?.len();
        let sha256 = sha256_file(&path)?;
        Ok(Self {
            file_name: util::file_name(&path),
            path,
            size_bytes,
            sha256,
        })
    }
}

fn is_excluded(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("ota") || lower.contains("img")
}

/// Newest archive matching the first pattern that has any qualifying candidate.
/// Names containing "ota"/"img" and files of `min_size` bytes or less are skipped.
pub fn find_rom_zip(out_dir: &Path, min_size: u64) -> Option<PathBuf> {
    let dir = glob::Pattern::escape(&out_dir.to_string_lossy());
    for pattern in ROM_PATTERNS {
        let Ok(entries) = glob::glob(&format!("{dir}/{pattern}")) else {
            continue;
        };
        let newest = entries
            .filter_map(Result::ok)
            .filter(|p| !is_excluded(&util::file_name(p)))
            .filter_map(|p| {
                let meta = std::fs::metadata(&p).ok()?;
                if !meta.is_file() || meta.len() <= min_size {
                    return None;
                }
                let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                Some((mtime, p))
            })
            .max_by_key(|(mtime, _)| *mtime)
            .map(|(_, p)| p);
        if newest.is_some() {
            return newest;
        }
    }
    None
}

/// Boot images present in the output directory, or none when the device has no vendor_boot.
pub fn boot_images(out_dir: &Path) -> Vec<PathBuf> {
    if !out_dir.join(BOOT_IMAGE_MARKER).exists() {
        return Vec::new();
    }
    BOOT_IMAGES
        .iter()
        .map(|name| out_dir.join(name))
        .filter(|p| p.exists())
        .collect()
}

/// Streaming SHA-256 of a file, hex-encoded.
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
