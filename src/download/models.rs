//! Data models for the download flow.
//!
//! Links, per-task state, engine settings and the run summary.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// One image to fetch: absolute URL plus the file name it is saved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLink {
    pub url: String,
    pub filename: String,
}

impl ImageLink {
    /// The file name is the last path segment of the URL and may be empty;
    /// such links are reported and skipped by the engine.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let filename = url.rsplit('/').next().unwrap_or_default().to_string();
        Self { url, filename }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Succeeded,
    Failed,
    Skipped,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
    }
}

/// Mutable state of a single download, owned by the worker running it.
#[derive(Debug)]
pub struct DownloadTask {
    pub id: usize,
    pub link: ImageLink,
    pub status: TaskStatus,
    pub bytes_written: u64,
    pub total_bytes: Option<u64>,
}

impl DownloadTask {
    pub fn new(id: usize, link: ImageLink) -> Self {
        Self {
            id,
            link,
            status: TaskStatus::Pending,
            bytes_written: 0,
            total_bytes: None,
        }
    }
}

/// Terminal state reported by a worker once a task ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskOutcome {
    pub id: usize,
    pub status: TaskStatus,
    pub bytes_written: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownloadSummary {
    pub succeeded: u32,
    pub failed: u32,
    pub skipped: u32,
}

impl DownloadSummary {
    pub fn record(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::Succeeded => self.succeeded += 1,
            TaskStatus::Skipped => self.skipped += 1,
            TaskStatus::Failed | TaskStatus::Pending | TaskStatus::InProgress => self.failed += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.succeeded + self.failed + self.skipped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// Carriage-return overwritten text lines on stdout.
    Lines,
    /// One indicatif bar per in-flight file.
    Bars,
}

impl FromStr for ProgressMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lines" => Ok(Self::Lines),
            "bars" => Ok(Self::Bars),
            other => Err(format!(
                "unknown progress_style '{other}', expected one of: lines, bars"
            )),
        }
    }
}

/// Line terminator for user-facing output, picked once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn native() -> Self {
        if cfg!(windows) { Self::CrLf } else { Self::Lf }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings fixed for the lifetime of one engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_concurrency: usize,
    pub chunk_size: usize,
    pub user_agent: String,
    pub request_timeout: Option<Duration>,
    pub line_ending: LineEnding,
    pub progress: ProgressMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 50,
            chunk_size: 4096,
            user_agent: "Mozilla/5.0".to_string(),
            request_timeout: Some(Duration::from_secs(60)),
            line_ending: LineEnding::native(),
            progress: ProgressMode::Lines,
        }
    }
}
