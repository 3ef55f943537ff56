// src/build/progress.rs — Build log parsing: progress snapshots, console tail, action stats
//
// Ninja prints status lines like `[ 42% 4711/11185 5m4s remaining] ...`.
// The log is append-only while the build runs, so readers keep their own
// offsets and never need to coordinate with the writer.

use regex::Regex;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Bytes read per step when scanning the log backwards.
const TAIL_WINDOW: u64 = 64 * 1024;

fn progress_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)% (\d+)/(\d+)").expect("static regex"))
}

fn ninja_status_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\s*\d+%\s+(\d+)/(\d+)").expect("static regex"))
}

/// Latest progress observed in the build log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// Log missing or unreadable
    Initializing,
    /// Log exists but no ninja status line has been written yet
    WaitingForBuildSystem,
    Step { percent: u32, done: u64, total: u64 },
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Progress::Initializing => write!(f, "Initializing..."),
            Progress::WaitingForBuildSystem => write!(f, "Initializing the build system..."),
            Progress::Step {
                percent,
                done,
                total,
            } => write!(f, "{percent}% ({done}/{total})"),
        }
    }
}

/// Parse a single log line into a progress step.
pub fn parse_progress_line(line: &str) -> Option<Progress> {
    let caps = progress_re().captures(line)?;
    Some(Progress::Step {
        percent: caps[1].parse().ok()?,
        done: caps[2].parse().ok()?,
        total: caps[3].parse().ok()?,
    })
}

/// Return the progress of the last matching line in the log.
pub fn fetch_progress(path: &Path) -> Progress {
    let Ok(mut file) = File::open(path) else {
        return Progress::Initializing;
    };
    match last_progress_in(&mut file) {
        Ok(Some(p)) => p,
        Ok(None) => Progress::WaitingForBuildSystem,
        Err(e) => {
            tracing::debug!("Could not scan {}: {}", path.display(), e);
            Progress::Initializing
        }
    }
}

/// Walk the file backwards window by window, newest line first.
fn last_progress_in(file: &mut File) -> std::io::Result<Option<Progress>> {
    let mut end = file.metadata()?.len();
    // Head of a line that started before the window we just scanned.
    let mut carry: Vec<u8> = Vec::new();

    while end > 0 {
        let start = end.saturating_sub(TAIL_WINDOW);
        let mut chunk = vec![0u8; (end - start) as usize];
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(&mut chunk)?;
        chunk.extend_from_slice(&carry);

        let split = if start > 0 {
            chunk.iter().position(|b| *b == b'\n')
        } else {
            None
        };
        let (head, body) = match split {
            Some(i) => (&chunk[..i], &chunk[i + 1..]),
            None if start > 0 => (&chunk[..], &chunk[..0]),
            None => (&chunk[..0], &chunk[..]),
        };

        let text = String::from_utf8_lossy(body);
        if let Some(p) = text.lines().rev().find_map(parse_progress_line) {
            return Ok(Some(p));
        }

        carry = head.to_vec();
        end = start;
    }

    Ok(None)
}

/// Highest ninja action count seen in the log, if any.
pub fn max_actions(path: &Path) -> Option<u64> {
    let file = File::open(path).ok()?;
    BufReader::new(file)
        .split(b'\n')
        .map_while(Result::ok)
        .filter_map(|raw| {
            let line = String::from_utf8_lossy(&raw).into_owned();
            ninja_status_re()
                .captures(&line)
                .and_then(|c| c[2].parse::<u64>().ok())
        })
        .max()
        .filter(|n| *n > 0)
}

/// "11185/11185 actions", or "N/A" when the log has no ninja status lines.
pub fn format_actions(max: Option<u64>) -> String {
    match max {
        Some(n) => format!("{n}/{n} actions"),
        None => "N/A".into(),
    }
}

/// Incremental reader that returns only lines appended since the last call.
pub struct LogTail {
    path: PathBuf,
    offset: u64,
    pending: Vec<u8>,
}

impl LogTail {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
            pending: Vec::new(),
        }
    }

    /// Complete lines written since the previous call. A trailing line without
    /// its newline is held back until the newline arrives.
    pub fn read_new_lines(&mut self) -> Vec<String> {
        let Ok(mut file) = File::open(&self.path) else {
            return Vec::new();
        };
        let len = file.metadata().map(|m| m.len()).unwrap_or(0);
        if len < self.offset {
            // Truncated underneath us; start over.
            self.offset = 0;
            self.pending.clear();
        }
        if file.seek(SeekFrom::Start(self.offset)).is_err() {
            return Vec::new();
        }
        let mut buf = Vec::new();
        if file.read_to_end(&mut buf).is_err() {
            return Vec::new();
        }
        self.offset += buf.len() as u64;
        self.pending.extend_from_slice(&buf);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            lines.push(line.trim_end_matches('\r').to_string());
        }
        lines
    }
}
