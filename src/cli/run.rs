// src/cli/run.rs — The build pipeline: sync, build, report, upload
//
// One status message is posted before the build and edited in place for the
// rest of the run (progress, uploading, final result). Interruption is a
// cancellation token: the runner kills the build, every other phase is
// raced against it.

use std::future::Future;
use std::path::Path;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::build::artifacts::{self, RomArtifact};
use crate::build::monitor::Monitors;
use crate::build::progress::{self, Progress};
use crate::build::runner::{self, BuildCommand, BuildOutcome, BuildProcess, ChildExit};
use crate::build::session::BuildSession;
use crate::build::{banner, manifest};
use crate::cli::Cli;
use crate::infra::config::Config;
use crate::notify::messages::{self, SuccessReport};
use crate::notify::{download_buttons, Notifier, StatusMessage, StatusMode};
use crate::power;
use crate::upload::UploadChain;
use crate::util;

/// How a pipeline run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded,
    /// The build failed and the failure was reported.
    BuildFailed,
    /// The build passed but no ROM archive qualified for upload.
    MissingArtifact,
    Interrupted,
}

impl RunOutcome {
    /// Process exit code. A reported build failure still exits 0.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Interrupted => 130,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub sync: bool,
    pub clean: bool,
}

/// A build child that ran to completion.
#[derive(Debug, Clone, Copy)]
pub struct CompletedBuild {
    pub elapsed: Duration,
    pub status: ExitStatus,
}

pub struct Pipeline {
    session: Arc<BuildSession>,
    notifier: Notifier,
    uploads: UploadChain,
    min_rom_size: u64,
    status: StatusMessage,
    banner: bool,
}

impl Pipeline {
    pub fn new(
        session: Arc<BuildSession>,
        notifier: Notifier,
        uploads: UploadChain,
        min_rom_size: u64,
    ) -> Self {
        Self {
            session,
            notifier,
            uploads,
            min_rom_size,
            status: StatusMessage::unsent(),
            banner: true,
        }
    }

    /// Skip banner rendering and always post a text status.
    pub fn without_banner(mut self) -> Self {
        self.banner = false;
        self
    }

    /// Continue with an already-posted status message.
    pub fn with_status(mut self, status: StatusMessage) -> Self {
        self.status = status;
        self
    }

    pub fn status(&self) -> StatusMessage {
        self.status
    }

    pub async fn run(
        &mut self,
        opts: RunOptions,
        cancel: &CancellationToken,
    ) -> anyhow::Result<RunOutcome> {
        if opts.sync && or_cancelled(cancel, self.sync_sources()).await.is_none() {
            return Ok(self.interrupted().await);
        }

        if opts.clean {
            println!("🧹 Cleaning build directory...");
            if let Err(e) = runner::clean_out_dir(&self.session.root).await {
                tracing::warn!("Could not clean out/: {}", e);
            }
        }

        self.announce().await;
        if cancel.is_cancelled() {
            return Ok(self.interrupted().await);
        }

        let Some(build) = self.build(cancel).await? else {
            return Ok(self.interrupted().await);
        };

        match or_cancelled(cancel, self.conclude(&build)).await {
            Some(outcome) => outcome,
            None => Ok(self.interrupted().await),
        }
    }

    /// `repo sync` with its own chat message. Failure is reported, not fatal.
    pub async fn sync_sources(&self) {
        println!("🔄 Syncing sources...");
        let id = self.notifier.send_text(&messages::syncing(&self.session)).await;
        let sync_status = StatusMessage::text(id);

        match runner::sync_sources(&self.session.root).await {
            Ok(()) => {
                println!("✅ Sources synced");
                sync_status
                    .update(&self.notifier, &messages::synced(&self.session), None)
                    .await;
            }
            Err(e) => {
                println!("❌ Sync failed: {e}");
                sync_status
                    .update(&self.notifier, &messages::sync_failed(), None)
                    .await;
            }
        }
    }

    /// Post the status message: banner photo when possible, text otherwise.
    pub async fn announce(&mut self) {
        if self.banner {
            println!("📸 Generating build banner...");
            if let Some(path) = banner::generate(&self.session).await {
                let caption = messages::banner_initial(&self.session);
                if let Some(id) = self.notifier.send_photo(&path, &caption).await {
                    println!("✅ Banner sent (message {id})");
                    self.status = StatusMessage::photo(id);
                    return;
                }
            }
        }

        let body = messages::progress(
            &self.session,
            StatusMode::Text,
            &Progress::Initializing.to_string(),
        );
        self.status = StatusMessage::text(self.notifier.send_text(&body).await);
    }

    /// Run the build with its observers. `None` when interrupted.
    pub async fn build(&self, cancel: &CancellationToken) -> anyhow::Result<Option<CompletedBuild>> {
        let s = &self.session;
        let command = BuildCommand::compose(&s.device, &s.variant, &s.rom_type);
        println!("\n🔨 Starting build...");
        println!("   Command: {}", command.target());
        println!("   Log: {}\n", s.build_log.display());

        let started = Instant::now();
        let process = BuildProcess::spawn(&command, &s.root, &s.build_log, cancel)?;
        let monitors = Monitors::spawn(
            Arc::clone(s),
            self.notifier.clone(),
            self.status,
            process.liveness(),
        );

        match process.wait(cancel).await? {
            ChildExit::Cancelled => Ok(None),
            ChildExit::Exited(status) => {
                monitors.join().await;
                Ok(Some(CompletedBuild {
                    elapsed: started.elapsed(),
                    status,
                }))
            }
        }
    }

    /// Decide the outcome from the error-log sentinel and report it.
    pub async fn conclude(&self, build: &CompletedBuild) -> anyhow::Result<RunOutcome> {
        let outcome = runner::determine_outcome(&self.session.error_log);
        match (outcome, build.status.success()) {
            (BuildOutcome::Succeeded, false) => tracing::warn!(
                "Build exited with {} but the error log is empty; treating as success",
                build.status
            ),
            (BuildOutcome::Failed, true) => tracing::warn!(
                "Build exited cleanly but the error log is not empty; treating as failure"
            ),
            _ => {}
        }

        match outcome {
            BuildOutcome::Failed => {
                self.report_failure().await;
                Ok(RunOutcome::BuildFailed)
            }
            BuildOutcome::Succeeded => self.report_success(build.elapsed).await,
        }
    }

    pub async fn report_failure(&self) {
        println!("\n❌ Build failed!");
        self.status
            .update(&self.notifier, &messages::failed(&self.session), None)
            .await;
        for log in [&self.session.error_log, &self.session.build_log] {
            if log.exists() {
                println!("📤 Sending {}...", util::file_name(log));
                self.notifier.send_file_to_error_chat(log).await;
            }
        }
    }

    /// Locate, hash and upload the ROM (plus boot images), then post the final status.
    pub async fn report_success(&self, elapsed: Duration) -> anyhow::Result<RunOutcome> {
        let s = &self.session;
        println!("\n✅ Build completed successfully!");
        let actions = progress::format_actions(progress::max_actions(&s.build_log));

        let Some(rom) = artifacts::find_rom_zip(&s.out_dir, self.min_rom_size) else {
            println!("❌ Could not find ROM zip in {}", s.out_dir.display());
            return Ok(RunOutcome::MissingArtifact);
        };
        println!("📦 Found ROM: {}", util::file_name(&rom));
        println!("🔐 Calculating SHA256...");
        let artifact = tokio::task::spawn_blocking(move || RomArtifact::inspect(rom)).await??;

        self.status
            .update(&self.notifier, &messages::uploading(s, "ROM zip"), None)
            .await;
        let rom_url = self.uploads.upload(&artifact.path).await;

        let images = artifacts::boot_images(&s.out_dir);
        let mut image_links = Vec::with_capacity(images.len());
        if !images.is_empty() {
            self.status
                .update(&self.notifier, &messages::uploading(s, "boot images"), None)
                .await;
            for image in &images {
                let url = self.uploads.upload(image).await;
                image_links.push((util::file_name(image), url));
            }
        }

        let report = SuccessReport {
            duration_secs: elapsed.as_secs(),
            actions,
            file_name: artifact.file_name,
            size_bytes: artifact.size_bytes,
            sha256: artifact.sha256,
            rom_url,
            boot_images: image_links,
        };
        let keyboard = download_buttons(&report.rom_url, &report.boot_images);
        self.status
            .update(&self.notifier, &messages::success(s, &report), keyboard.as_ref())
            .await;

        if s.build_log.exists() {
            println!("📤 Sending build log...");
            self.notifier.send_file(&s.build_log).await;
        }
        Ok(RunOutcome::Succeeded)
    }

    pub async fn interrupted(&self) -> RunOutcome {
        self.status
            .update(&self.notifier, &messages::interrupted(&self.session), None)
            .await;
        cleanup_temp_files(&self.session.root);
        RunOutcome::Interrupted
    }
}

/// `None` if `cancel` fires before `fut` completes. Cancellation wins ties.
pub async fn or_cancelled<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        out = fut => Some(out),
    }
}

pub fn cleanup_temp_files(root: &Path) {
    for name in banner::cleanup(root) {
        println!("🗑️  Cleaned up: {name}");
    }
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        println!("\n\n⚠️  Interrupted by user");
        cancel.cancel();
    }
}

fn print_summary(session: &BuildSession, uploads: &UploadChain) {
    println!("\n📋 Build configuration");
    println!("   ROM:     {}", session.rom_name);
    println!("   Device:  {}", session.device);
    println!("   Android: {}", session.android_version);
    println!("   Variant: {} ({})", session.variant, session.build_type());
    println!("   Upload:  {}\n", uploads.names().join(" → "));
}

/// Everything one `romci` invocation does.
pub async fn run_build(cli: &Cli, config: &Config) -> anyhow::Result<RunOutcome> {
    config.validate()?;
    if cli.clean_device {
        tracing::info!("--c-d has no effect");
    }

    println!("🚀 Starting ROM build process...");
    let root = std::env::current_dir()?;
    println!("📄 Getting ROM info from manifest repository...");
    let identity = manifest::detect(&root).await;
    let session = Arc::new(BuildSession::new(&config.build, root, identity));
    let uploads = UploadChain::from_config(config);
    print_summary(&session, &uploads);

    runner::remove_stale_files(&session.root);

    let cancel = CancellationToken::new();
    let listener = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let mut pipeline = Pipeline::new(
        Arc::clone(&session),
        Notifier::from_config(&config.telegram),
        uploads,
        config.min_rom_size_bytes(),
    );
    let result = pipeline
        .run(
            RunOptions {
                sync: cli.sync,
                clean: cli.clean,
            },
            &cancel,
        )
        .await;

    if !matches!(result, Ok(RunOutcome::Interrupted)) {
        cleanup_temp_files(&session.root);
    }
    let outcome = result?;

    if matches!(outcome, RunOutcome::Succeeded | RunOutcome::BuildFailed) {
        println!("\n✨ All done!");
        power::maybe_poweroff(&config.power, &cancel).await;
    }
    listener.abort();
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(RunOutcome::Succeeded.exit_code(), 0);
        assert_eq!(RunOutcome::BuildFailed.exit_code(), 0);
        assert_eq!(RunOutcome::MissingArtifact.exit_code(), 0);
        assert_eq!(RunOutcome::Interrupted.exit_code(), 130);
    }

    #[tokio::test]
    async fn test_or_cancelled() {
        let token = CancellationToken::new();
        assert_eq!(or_cancelled(&token, async { 7 }).await, Some(7));

        token.cancel();
        let pending = std::future::pending::<()>();
        assert_eq!(or_cancelled(&token, pending).await, None);
    }

    #[test]
    fn test_cleanup_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(banner::BANNER_FILE), b"png").unwrap();
        cleanup_temp_files(dir.path());
        assert!(!dir.path().join(banner::BANNER_FILE).exists());
    }
}
