// src/infra/paths.rs — Config locations and the Android build-tree layout
//
// Config respects the ROMCI_HOME environment variable for isolation. When
// unset, the user-level config lives in the XDG config dir (romci/config.toml).
// Build-tree paths are always relative to the ROM source root.

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Name of the combined build output log, written at the source root.
pub const BUILD_LOG: &str = "build.log";

/// Sentinel written by the Android build system when a build step fails.
pub const ERROR_LOG: &str = "out/error.log";

/// Soong lock file left behind by an interrupted build.
pub const SOONG_LOCK: &str = "out/.lock";

/// Project-local config file, checked before the user-level one.
pub const LOCAL_CONFIG: &str = "romci.toml";

fn romci_home() -> Option<PathBuf> {
    std::env::var_os("ROMCI_HOME").map(PathBuf::from)
}

/// Configuration directory: $ROMCI_HOME/ or XDG_CONFIG_HOME/romci
pub fn config_dir() -> Option<PathBuf> {
    if let Some(home) = romci_home() {
        return Some(home);
    }
    ProjectDirs::from("", "", "romci").map(|d| d.config_dir().to_path_buf())
}

/// User-level config file path
pub fn config_file_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

pub fn build_log(root: &Path) -> PathBuf {
    root.join(BUILD_LOG)
}

pub fn error_log(root: &Path) -> PathBuf {
    root.join(ERROR_LOG)
}

/// `out/target/product/<device>`
pub fn product_dir(root: &Path, device: &str) -> PathBuf {
    root.join("out").join("target").join("product").join(device)
}

/// `.repo/manifests`, the checkout of the ROM's manifest repository.
pub fn manifests_dir(root: &Path) -> PathBuf {
    root.join(".repo").join("manifests")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_dir_layout() {
        let p = product_dir(Path::new("/src/rom"), "cancunf");
        assert_eq!(p, PathBuf::from("/src/rom/out/target/product/cancunf"));
    }

    #[test]
    fn test_logs_under_root() {
        let root = Path::new("/src/rom");
        assert_eq!(build_log(root), PathBuf::from("/src/rom/build.log"));
        assert_eq!(error_log(root), PathBuf::from("/src/rom/out/error.log"));
    }

    #[test]
    fn test_manifests_dir() {
        assert_eq!(
            manifests_dir(Path::new("/r")),
            PathBuf::from("/r/.repo/manifests")
        );
    }
}
