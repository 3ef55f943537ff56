// src/power.rs — Optional machine shutdown after a completed run

use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::infra::config::PowerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerOff {
    Disabled,
    /// Ctrl+C during the grace period
    Cancelled,
    Issued,
    Failed,
}

/// Wait out the grace period, then `sudo poweroff` unless `cancel` fires first.
pub async fn maybe_poweroff(cfg: &PowerConfig, cancel: &CancellationToken) -> PowerOff {
    if !cfg.poweroff {
        return PowerOff::Disabled;
    }

    println!(
        "\n⚠️  POWEROFF is enabled - shutting down in {} seconds...",
        cfg.delay_secs
    );
    println!("   Press Ctrl+C to cancel");

    tokio::select! {
        _ = cancel.cancelled() => {
            println!("\n⚠️  Shutdown cancelled by user");
            return PowerOff::Cancelled;
        }
        _ = tokio::time::sleep(Duration::from_secs(cfg.delay_secs)) => {}
    }

    println!("🔌 Shutting down system...");
    match Command::new("sudo").arg("poweroff").status().await {
        Ok(status) if status.success() => PowerOff::Issued,
        Ok(status) => {
            tracing::error!("sudo poweroff exited with {}", status);
            PowerOff::Failed
        }
        Err(e) => {
            tracing::error!("Could not run sudo poweroff: {}", e);
            PowerOff::Failed
        }
    }
}
