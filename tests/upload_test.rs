// tests/upload_test.rs — Integration tests for the upload fallback chain

use romci::upload::rclone::RcloneUploader;
use romci::upload::{UploadChain, Uploader, UPLOAD_FAILED};

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ---------- Mock backends ----------

/// Returns a fixed result and counts how often it was asked.
struct FixedUploader {
    name: &'static str,
    url: Option<&'static str>,
    calls: Arc<AtomicUsize>,
}

impl FixedUploader {
    fn boxed(name: &'static str, url: Option<&'static str>) -> (Box<dyn Uploader>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(Self {
                name,
                url,
                calls: calls.clone(),
            }),
            calls,
        )
    }
}

#[async_trait]
impl Uploader for FixedUploader {
    fn name(&self) -> &str {
        self.name
    }

    async fn try_upload(&self, _path: &Path) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.url.map(String::from)
    }
}

// ---------- Chain ordering ----------

#[tokio::test]
async fn test_primary_success_skips_fallback() {
    let (remote, remote_calls) = FixedUploader::boxed("rclone", Some("https://drive/x.zip"));
    let (public, public_calls) = FixedUploader::boxed("gofile", Some("https://gofile.io/d/x"));
    let chain = UploadChain::new(vec![remote, public]);

    assert_eq!(chain.upload(Path::new("x.zip")).await, "https://drive/x.zip");
    assert_eq!(remote_calls.load(Ordering::SeqCst), 1);
    assert_eq!(public_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_primary_failure_falls_back_once() {
    let (remote, remote_calls) = FixedUploader::boxed("rclone", None);
    let (public, public_calls) = FixedUploader::boxed("gofile", Some("https://gofile.io/d/x"));
    let chain = UploadChain::new(vec![remote, public]);

    assert_eq!(chain.upload(Path::new("x.zip")).await, "https://gofile.io/d/x");
    assert_eq!(remote_calls.load(Ordering::SeqCst), 1);
    assert_eq!(public_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_all_backends_failing_yields_marker() {
    let (remote, _) = FixedUploader::boxed("rclone", None);
    let (public, public_calls) = FixedUploader::boxed("gofile", None);
    let chain = UploadChain::new(vec![remote, public]);

    assert_eq!(chain.upload(Path::new("x.zip")).await, UPLOAD_FAILED);
    assert_eq!(public_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_without_remote_only_public_host_is_used() {
    let (public, public_calls) = FixedUploader::boxed("gofile", Some("https://gofile.io/d/y"));
    let chain = UploadChain::new(vec![public]);

    assert_eq!(chain.names(), vec!["gofile"]);
    assert_eq!(chain.upload(Path::new("y.zip")).await, "https://gofile.io/d/y");
    assert_eq!(public_calls.load(Ordering::SeqCst), 1);
}

// ---------- rclone against a fake binary ----------

#[cfg(unix)]
mod fake_rclone {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    /// Shell stand-in for rclone; the "remote" is a directory next to it.
    /// Marker files beside the script switch on failure modes.
    const SCRIPT: &str = r#"#!/bin/sh
here="$(dirname "$0")"
state="$here/remote"
case "$1" in
  lsf)
    [ -e "$here/fail-lsf" ] && exit 3
    name="${2#*:}"; name="${name##*/}"
    [ -e "$state/$name" ] && echo "$name"
    exit 0 ;;
  copy)
    [ -e "$here/fail-copy" ] && exit 1
    [ -e "$here/slow-copy" ] && sleep 5
    cp "$2" "$state/" || exit 1
    echo "Transferred:   3 B / 3 B, 100%, 3 B/s, ETA 0s"
    exit 0 ;;
  link)
    [ -e "$here/fail-link" ] && exit 1
    name="${2#*:}"; name="${name##*/}"
    echo "https://remote.example.com/$name" ;;
esac
"#;

    struct FakeRemote {
        dir: tempfile::TempDir,
    }

    impl FakeRemote {
        fn new(existing: &[&str]) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let remote = dir.path().join("remote");
            std::fs::create_dir_all(&remote).unwrap();
            for name in existing {
                std::fs::write(remote.join(name), b"old").unwrap();
            }
            let bin = dir.path().join("rclone");
            std::fs::write(&bin, SCRIPT).unwrap();
            std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
            Self { dir }
        }

        fn binary(&self) -> PathBuf {
            self.dir.path().join("rclone")
        }

        fn holds(&self, name: &str) -> bool {
            self.dir.path().join("remote").join(name).exists()
        }

        fn switch_on(&self, marker: &str) {
            std::fs::write(self.dir.path().join(marker), b"").unwrap();
        }
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn local_rom() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let rom = dir.path().join("rom.zip");
        std::fs::write(&rom, b"new").unwrap();
        (dir, rom)
    }

    #[tokio::test]
    async fn test_existing_names_are_never_overwritten() {
        let remote = FakeRemote::new(&["rom.zip", "rom (1).zip"]);
        let (local, rom) = local_rom();
        let up = RcloneUploader::new("fake", "").with_binary(remote.binary());

        let url = up.try_upload(&rom).await;
        assert_eq!(url.as_deref(), Some("https://remote.example.com/rom (2).zip"));
        assert!(remote.holds("rom (2).zip"));
        assert_eq!(
            std::fs::read(remote.dir.path().join("remote/rom.zip")).unwrap(),
            b"old"
        );

        // The staged copy is gone, the original stays.
        assert_eq!(entries(local.path()), vec!["rom.zip"]);
    }

    #[tokio::test]
    async fn test_local_file_with_versioned_name_is_left_alone() {
        let remote = FakeRemote::new(&["rom.zip"]);
        let (local, rom) = local_rom();
        let neighbour = local.path().join("rom (1).zip");
        std::fs::write(&neighbour, b"keep").unwrap();
        let up = RcloneUploader::new("fake", "").with_binary(remote.binary());

        let url = up.try_upload(&rom).await;
        assert_eq!(url.as_deref(), Some("https://remote.example.com/rom (1).zip"));
        assert_eq!(
            std::fs::read(remote.dir.path().join("remote/rom (1).zip")).unwrap(),
            b"new"
        );
        assert_eq!(std::fs::read(&neighbour).unwrap(), b"keep");
        assert_eq!(entries(local.path()), vec!["rom (1).zip", "rom.zip"]);
    }

    #[tokio::test]
    async fn test_cancelled_transfer_leaves_no_staged_copy() {
        let remote = FakeRemote::new(&["rom.zip"]);
        remote.switch_on("slow-copy");
        let (local, rom) = local_rom();
        let up = RcloneUploader::new("fake", "").with_binary(remote.binary());

        let res = tokio::time::timeout(
            std::time::Duration::from_millis(800),
            up.try_upload(&rom),
        )
        .await;
        assert!(res.is_err());
        assert_eq!(entries(local.path()), vec!["rom.zip"]);
    }

    #[tokio::test]
    async fn test_missing_link_falls_back_to_remote_path() {
        let remote = FakeRemote::new(&[]);
        remote.switch_on("fail-link");
        let (_local, rom) = local_rom();

        let root = RcloneUploader::new("fake", "").with_binary(remote.binary());
        assert_eq!(root.try_upload(&rom).await.as_deref(), Some("fake:rom.zip"));

        std::fs::remove_file(remote.dir.path().join("remote/rom.zip")).unwrap();
        let nested = RcloneUploader::new("fake", "builds").with_binary(remote.binary());
        assert_eq!(
            nested.try_upload(&rom).await.as_deref(),
            Some("fake:builds/rom.zip")
        );
    }

    #[tokio::test]
    async fn test_failing_listing_counts_as_absent() {
        let remote = FakeRemote::new(&["rom.zip"]);
        remote.switch_on("fail-lsf");
        let (local, rom) = local_rom();
        let up = RcloneUploader::new("fake", "").with_binary(remote.binary());

        assert_eq!(
            up.try_upload(&rom).await.as_deref(),
            Some("https://remote.example.com/rom.zip")
        );
        assert_eq!(entries(local.path()), vec!["rom.zip"]);
    }

    #[tokio::test]
    async fn test_fresh_name_is_uploaded_as_is() {
        let remote = FakeRemote::new(&[]);
        let (_local, rom) = local_rom();
        let up = RcloneUploader::new("fake", "").with_binary(remote.binary());

        assert_eq!(
            up.try_upload(&rom).await.as_deref(),
            Some("https://remote.example.com/rom.zip")
        );
        assert!(remote.holds("rom.zip"));
    }

    #[tokio::test]
    async fn test_failed_copy_falls_back_to_next_backend() {
        let remote = FakeRemote::new(&[]);
        remote.switch_on("fail-copy");
        let (_local, rom) = local_rom();

        let rclone: Box<dyn Uploader> =
            Box::new(RcloneUploader::new("fake", "").with_binary(remote.binary()));
        let (public, public_calls) = FixedUploader::boxed("gofile", Some("https://gofile.io/d/z"));
        let chain = UploadChain::new(vec![rclone, public]);

        assert_eq!(chain.upload(&rom).await, "https://gofile.io/d/z");
        assert_eq!(public_calls.load(Ordering::SeqCst), 1);
        assert!(!remote.holds("rom.zip"));
    }
}
