// src/build/runner.rs — Build command composition and the child build process
//
// The Android build runs as `bash -c ". build/envsetup.sh && ..."` with
// stdout and stderr both redirected into the build log. Success is decided
// by the error-log sentinel, not by the child's exit status.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::infra::errors::{CiError, CiResult};
use crate::infra::paths;

const ENVSETUP: &str = ". build/envsetup.sh";

/// Grace period between SIGTERM to the build's process group and SIGKILL.
const TERMINATE_GRACE: Duration = Duration::from_secs(10);

/// Shell command line that builds the ROM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    target: String,
}

impl BuildCommand {
    /// AxionAOSP flavors (`axion-<gms>`) use the `axion`/`ax` helpers,
    /// everything else goes through `brunch`.
    pub fn compose(device: &str, variant: &str, rom_type: &str) -> Self {
        let target = match rom_type.strip_prefix("axion-") {
            Some(gms) => {
                let gms_variant = if gms == "vanilla" {
                    "vanilla".to_string()
                } else {
                    format!("gms {gms}")
                };
                format!("axion {device} {variant} {gms_variant} && ax -br")
            }
            None => format!("brunch {device} {variant}"),
        };
        Self { target }
    }

    /// The build part, without environment setup.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Full script handed to bash.
    pub fn script(&self) -> String {
        format!("{ENVSETUP} && {}", self.target)
    }
}

/// How the child build process ended.
#[derive(Debug)]
pub enum ChildExit {
    Exited(ExitStatus),
    /// Terminated because the run was cancelled
    Cancelled,
}

/// Outcome of a build that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    Succeeded,
    Failed,
}

/// Running build child.
pub struct BuildProcess {
    child: Child,
    liveness: CancellationToken,
}

impl BuildProcess {
    /// Spawn the build in `root`, truncating `log_path` and sending all output there.
    /// The liveness token is a child of `cancel`, so interruption also stops observers.
    pub fn spawn(
        command: &BuildCommand,
        root: &Path,
        log_path: &Path,
        cancel: &CancellationToken,
    ) -> CiResult<Self> {
        let log = std::fs::File::create(log_path)?;
        let log_err = log.try_clone()?;

        let mut cmd = Command::new("bash");
        cmd.arg("-c")
            .arg(command.script())
            .current_dir(root)
            .stdin(Stdio::null())
            .stdout(log)
            .stderr(log_err)
            .kill_on_drop(true);
        // Own process group so the whole ninja tree can be signalled at once.
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd
            .spawn()
            .map_err(|e| CiError::command("bash -c <build>", e.to_string()))?;
        tracing::debug!("Build started (pid {:?})", child.id());

        Ok(Self {
            child,
            liveness: cancel.child_token(),
        })
    }

    /// Cancelled once the child has exited (or the run was cancelled).
    pub fn liveness(&self) -> CancellationToken {
        self.liveness.clone()
    }

    /// Wait for the build, terminating it if `cancel` fires first.
    pub async fn wait(mut self, cancel: &CancellationToken) -> CiResult<ChildExit> {
        let exit = tokio::select! {
            status = self.child.wait() => status.map(ChildExit::Exited),
            _ = cancel.cancelled() => {
                self.terminate().await;
                Ok(ChildExit::Cancelled)
            }
        };
        self.liveness.cancel();
        Ok(exit?)
    }

    async fn terminate(&mut self) {
        #[cfg(unix)]
        if let Some(pid) = self.child.id() {
            let _ = Command::new("kill")
                .args(["-TERM", &format!("-{pid}")])
                .status()
                .await;
            if tokio::time::timeout(TERMINATE_GRACE, self.child.wait())
                .await
                .is_ok()
            {
                return;
            }
        }
        let _ = self.child.start_kill();
        let _ = self.child.wait().await;
    }
}

/// The sentinel policy: a non-empty error log means the build failed,
/// whatever the exit status was.
pub fn determine_outcome(error_log: &Path) -> BuildOutcome {
    match std::fs::metadata(error_log) {
        Ok(meta) if meta.len() > 0 => BuildOutcome::Failed,
        _ => BuildOutcome::Succeeded,
    }
}

/// Remove logs and locks left by a previous run so they cannot leak into this one.
pub fn remove_stale_files(root: &Path) {
    for rel in [paths::ERROR_LOG, paths::SOONG_LOCK, paths::BUILD_LOG] {
        let path = root.join(rel);
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::debug!("Removed stale {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Could not remove {}: {}", path.display(), e),
        }
    }
}

/// `repo sync` with the usual CI flags, output inherited.
pub async fn sync_sources(root: &Path) -> CiResult<()> {
    let status = Command::new("repo")
        .args(["sync", "-c", "--force-sync", "--no-clone-bundle", "--no-tags"])
        .current_dir(root)
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|e| CiError::command("repo sync", e.to_string()))?;
    if status.success() {
        Ok(())
    } else {
        Err(CiError::command("repo sync", status.to_string()))
    }
}

/// Delete the whole `out/` directory.
pub async fn clean_out_dir(root: &Path) -> CiResult<()> {
    match tokio::fs::remove_dir_all(root.join("out")).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_brunch_by_default() {
        let c = BuildCommand::compose("begonia", "userdebug", "");
        assert_eq!(c.target(), "brunch begonia userdebug");
        assert_eq!(
            c.script(),
            ". build/envsetup.sh && brunch begonia userdebug"
        );
    }

    #[test]
    fn test_axion_gms_flavors() {
        assert_eq!(
            BuildCommand::compose("cancunf", "user", "axion-pico").target(),
            "axion cancunf user gms pico && ax -br"
        );
        assert_eq!(
            BuildCommand::compose("cancunf", "user", "axion-core").target(),
            "axion cancunf user gms core && ax -br"
        );
        assert_eq!(
            BuildCommand::compose("cancunf", "user", "axion-vanilla").target(),
            "axion cancunf user vanilla && ax -br"
        );
    }

    #[test]
    fn test_non_axion_rom_type_uses_brunch() {
        assert_eq!(
            BuildCommand::compose("x", "eng", "pixel").target(),
            "brunch x eng"
        );
    }

    #[test]
    fn test_outcome_from_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("error.log");
        assert_eq!(determine_outcome(&log), BuildOutcome::Succeeded);

        std::fs::write(&log, b"").unwrap();
        assert_eq!(determine_outcome(&log), BuildOutcome::Succeeded);

        std::fs::write(&log, b"FAILED: out/soong/build.ninja\n").unwrap();
        assert_eq!(determine_outcome(&log), BuildOutcome::Failed);
    }

    #[test]
    fn test_remove_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("out")).unwrap();
        std::fs::write(dir.path().join(paths::ERROR_LOG), b"x").unwrap();
        std::fs::write(dir.path().join(paths::BUILD_LOG), b"x").unwrap();
        remove_stale_files(dir.path());
        assert!(!dir.path().join(paths::ERROR_LOG).exists());
        assert!(!dir.path().join(paths::BUILD_LOG).exists());
        assert!(dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_clean_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        clean_out_dir(dir.path()).await.unwrap();
        std::fs::create_dir_all(dir.path().join("out/target")).unwrap();
        clean_out_dir(dir.path()).await.unwrap();
        assert!(!dir.path().join("out").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_wait_reports_exit_and_ends_liveness() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("build")).unwrap();
        std::fs::write(dir.path().join("build/envsetup.sh"), "brunch() { echo \"[ 100% 2/2] $1\"; }\n").unwrap();

        let cancel = CancellationToken::new();
        let log = dir.path().join("build.log");
        let cmd = BuildCommand::compose("begonia", "user", "");
        let process = BuildProcess::spawn(&cmd, dir.path(), &log, &cancel).unwrap();
        let liveness = process.liveness();
        assert!(!liveness.is_cancelled());

        let exit = process.wait(&cancel).await.unwrap();
        assert!(matches!(exit, ChildExit::Exited(s) if s.success()));
        assert!(liveness.is_cancelled());
        assert_eq!(
            std::fs::read_to_string(&log).unwrap(),
            "[ 100% 2/2] begonia\n"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancel_terminates_child() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("build")).unwrap();
        std::fs::write(dir.path().join("build/envsetup.sh"), "brunch() { sleep 30; }\n").unwrap();

        let cancel = CancellationToken::new();
        let cmd = BuildCommand::compose("d", "user", "");
        let process =
            BuildProcess::spawn(&cmd, dir.path(), &dir.path().join("build.log"), &cancel).unwrap();
        cancel.cancel();
        let exit = tokio::time::timeout(Duration::from_secs(15), process.wait(&cancel))
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(exit, ChildExit::Cancelled));
    }
}
