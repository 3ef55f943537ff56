// src/build/monitor.rs — Background observers of a running build
//
// Two independent tasks read the append-only build log:
// - the tail task mirrors new lines to the console every 0.5s;
// - the poll task samples progress every 5s and edits the status message
//   only when the rendered value changed.
// Both stop when the build's liveness token is cancelled. File reads run on
// the blocking pool so a slow disk never stalls the runtime.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::build::progress::{fetch_progress, LogTail, Progress};
use crate::build::session::BuildSession;
use crate::notify::{messages, Notifier, StatusMessage};

pub const TAIL_INTERVAL: Duration = Duration::from_millis(500);
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const TAIL_JOIN_TIMEOUT: Duration = Duration::from_secs(2);
pub const POLL_JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Remembers the last snapshot so repeated values are not re-sent.
pub struct ProgressPoller {
    log: PathBuf,
    previous: Option<Progress>,
}

impl ProgressPoller {
    pub fn new(log: impl Into<PathBuf>) -> Self {
        Self {
            log: log.into(),
            previous: None,
        }
    }

    /// Sample the log; `Some` only when the snapshot differs from the last one.
    pub async fn poll(&mut self) -> Option<Progress> {
        let log = self.log.clone();
        let current = match tokio::task::spawn_blocking(move || fetch_progress(&log)).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("Progress read failed: {}", e);
                return None;
            }
        };
        if self.previous.as_ref() == Some(&current) {
            return None;
        }
        self.previous = Some(current.clone());
        Some(current)
    }
}

/// Pushes progress changes to the status message.
pub struct ProgressMonitor {
    poller: ProgressPoller,
    session: Arc<BuildSession>,
    notifier: Notifier,
    status: StatusMessage,
}

impl ProgressMonitor {
    pub fn new(session: Arc<BuildSession>, notifier: Notifier, status: StatusMessage) -> Self {
        Self {
            poller: ProgressPoller::new(session.build_log.clone()),
            session,
            notifier,
            status,
        }
    }

    /// One poll cycle. Returns true when an update was sent.
    pub async fn tick(&mut self) -> bool {
        let Some(progress) = self.poller.poll().await else {
            return false;
        };
        let rendered = progress.to_string();
        eprintln!("\n🔨 Build Progress: {rendered}\n");
        let body = messages::progress(&self.session, self.status.mode(), &rendered);
        self.status.update(&self.notifier, &body, None).await;
        true
    }

    pub async fn run(mut self, liveness: CancellationToken) {
        while !liveness.is_cancelled() {
            self.tick().await;
            tokio::select! {
                _ = liveness.cancelled() => break,
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }
    }
}

/// Read appended lines off the runtime; hands the tail back for the next round.
async fn read_lines(mut tail: LogTail) -> Option<(LogTail, Vec<String>)> {
    let read = tokio::task::spawn_blocking(move || {
        let lines = tail.read_new_lines();
        (tail, lines)
    })
    .await;
    match read {
        Ok(pair) => Some(pair),
        Err(e) => {
            tracing::warn!("Log tail read failed: {}", e);
            None
        }
    }
}

/// Mirror the build log to stdout until the build ends, then drain what is left.
pub async fn tail_log(path: PathBuf, liveness: CancellationToken) {
    let mut tail = LogTail::new(path);
    loop {
        let Some((next, lines)) = read_lines(tail).await else {
            return;
        };
        tail = next;
        for line in lines {
            println!("{line}");
        }
        tokio::select! {
            _ = liveness.cancelled() => break,
            _ = tokio::time::sleep(TAIL_INTERVAL) => {}
        }
    }
    if let Some((_, lines)) = read_lines(tail).await {
        for line in lines {
            println!("{line}");
        }
    }
}

/// Handles to the running observer tasks.
pub struct Monitors {
    tail: JoinHandle<()>,
    poll: JoinHandle<()>,
}

impl Monitors {
    pub fn spawn(
        session: Arc<BuildSession>,
        notifier: Notifier,
        status: StatusMessage,
        liveness: CancellationToken,
    ) -> Self {
        let tail = tokio::spawn(tail_log(session.build_log.clone(), liveness.clone()));
        let monitor = ProgressMonitor::new(session, notifier, status);
        let poll = tokio::spawn(monitor.run(liveness));
        Self { tail, poll }
    }

    /// Join with bounded waits; a task that overruns is aborted.
    pub async fn join(self) {
        join_bounded("log tail", self.tail, TAIL_JOIN_TIMEOUT).await;
        join_bounded("progress monitor", self.poll, POLL_JOIN_TIMEOUT).await;
    }
}

async fn join_bounded(name: &str, mut handle: JoinHandle<()>, limit: Duration) {
    match tokio::time::timeout(limit, &mut handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("{} task failed: {}", name, e),
        Err(_) => {
            tracing::warn!("{} task did not stop within {:?}; abandoning it", name, limit);
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_identical_polls_report_once() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[ 10% 100/1000] a").unwrap();
        f.flush().unwrap();

        let mut poller = ProgressPoller::new(f.path());
        assert_eq!(
            poller.poll().await.map(|p| p.to_string()).as_deref(),
            Some("10% (100/1000)")
        );
        assert_eq!(poller.poll().await, None);

        // Same value again on a new line is still no change.
        writeln!(f, "[ 10% 100/1000] b").unwrap();
        f.flush().unwrap();
        assert_eq!(poller.poll().await, None);

        writeln!(f, "[ 11% 110/1000] c").unwrap();
        f.flush().unwrap();
        assert!(poller.poll().await.is_some());
    }

    #[tokio::test]
    async fn test_first_poll_of_missing_log_reports_initializing() {
        let mut poller = ProgressPoller::new("/nonexistent/build.log");
        assert_eq!(poller.poll().await, Some(Progress::Initializing));
        assert_eq!(poller.poll().await, None);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_log_reads_keep_tail_position() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "one").unwrap();
        f.flush().unwrap();

        let (tail, lines) = read_lines(LogTail::new(f.path())).await.unwrap();
        assert_eq!(lines, vec!["one"]);

        writeln!(f, "two").unwrap();
        f.flush().unwrap();
        let (_, lines) = read_lines(tail).await.unwrap();
        assert_eq!(lines, vec!["two"]);
    }

    #[tokio::test]
    async fn test_tail_stops_on_liveness() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let token = CancellationToken::new();
        let handle = tokio::spawn(tail_log(f.path().to_path_buf(), token.clone()));
        token.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_join_bounded_aborts_overrunning_task() {
        let handle = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        let started = std::time::Instant::now();
        join_bounded("sleeper", handle, Duration::from_millis(50)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
