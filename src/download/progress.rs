//! Progress text and the sinks that print it.
//!
//! Every task reports through a shared `ProgressSink`; a sink writes each
//! line in one locked write so lines from concurrent downloads never split.

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::models::{EngineConfig, LineEnding, ProgressMode};

/// Stateless progress formatting.
pub struct ProgressReporter;

impl ProgressReporter {
    /// Percentage of `total` covered by `written`, floored to one decimal and
    /// capped at 99.9 so that 100.0 only ever appears in the completion line.
    pub fn percent(written: u64, total: u64) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let per_mille = (u128::from(written) * 1000 / u128::from(total)).min(999);
        per_mille as f64 / 10.0
    }

    pub fn downloading_line(filename: &str, written: u64, total: u64) -> String {
        format!(
            "Downloading {filename}: {:.1}%",
            Self::percent(written, total)
        )
    }

    pub fn downloaded_line(filename: &str) -> String {
        format!("Downloaded {filename}: 100.0%!")
    }
}

pub trait ProgressSink: Send + Sync {
    fn started(&self, _task_id: usize, _filename: &str, _total: u64) {}

    fn advanced(&self, task_id: usize, filename: &str, written: u64, total: u64);

    fn finished(&self, task_id: usize, filename: &str);

    /// The task ended before completion; drop whatever it was displaying.
    fn aborted(&self, _task_id: usize) {}

    /// A standalone status message (skips, failures).
    fn message(&self, text: &str);
}

pub fn make_sink(config: &EngineConfig) -> Arc<dyn ProgressSink> {
    match config.progress {
        ProgressMode::Lines => Arc::new(LineSink::stdout(config.line_ending)),
        ProgressMode::Bars => Arc::new(BarSink::new()),
    }
}

// ── Plain lines ────────────────────────────────────────────────

/// Carriage-return overwritten lines, as a plain terminal shows them.
pub struct LineSink<W: Write + Send> {
    out: Mutex<W>,
    line_ending: LineEnding,
}

impl LineSink<io::Stdout> {
    pub fn stdout(line_ending: LineEnding) -> Self {
        Self::new(io::stdout(), line_ending)
    }
}

impl<W: Write + Send> LineSink<W> {
    pub fn new(out: W, line_ending: LineEnding) -> Self {
        Self {
            out: Mutex::new(out),
            line_ending,
        }
    }

    fn write_line(&self, text: &str) {
        // Output errors must not fail a download.
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> ProgressSink for LineSink<W> {
    fn advanced(&self, _task_id: usize, filename: &str, written: u64, total: u64) {
        let line = ProgressReporter::downloading_line(filename, written, total);
        self.write_line(&format!("\r{line}"));
    }

    fn finished(&self, _task_id: usize, filename: &str) {
        let line = ProgressReporter::downloaded_line(filename);
        self.write_line(&format!("\r{line}{}", self.line_ending));
    }

    fn message(&self, text: &str) {
        self.write_line(&format!("{text}{}", self.line_ending));
    }
}

// ── indicatif bars ─────────────────────────────────────────────

pub struct BarSink {
    mp: MultiProgress,
    style: ProgressStyle,
    bars: Mutex<HashMap<usize, ProgressBar>>,
}

impl BarSink {
    pub fn new() -> Self {
        let style = ProgressStyle::with_template("[{elapsed_precise}] {bar:30} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");
        Self {
            mp: MultiProgress::with_draw_target(ProgressDrawTarget::stdout_with_hz(10)),
            style,
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn bars(&self) -> MutexGuard<'_, HashMap<usize, ProgressBar>> {
        self.bars.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn take_bar(&self, task_id: usize) -> Option<ProgressBar> {
        self.bars().remove(&task_id)
    }
}

impl Default for BarSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarSink {
    fn started(&self, task_id: usize, filename: &str, total: u64) {
        let bar = self.mp.add(ProgressBar::new(total));
        bar.set_style(self.style.clone());
        bar.set_message(ProgressReporter::downloading_line(filename, 0, total));
        self.bars().insert(task_id, bar);
    }

    fn advanced(&self, task_id: usize, filename: &str, written: u64, total: u64) {
        if let Some(bar) = self.bars().get(&task_id) {
            bar.set_position(written.min(total));
            bar.set_message(ProgressReporter::downloading_line(filename, written, total));
        }
    }

    fn finished(&self, task_id: usize, filename: &str) {
        if let Some(bar) = self.take_bar(task_id) {
            bar.finish_and_clear();
            self.mp.remove(&bar);
        }
        let _ = self.mp.println(ProgressReporter::downloaded_line(filename));
    }

    fn aborted(&self, task_id: usize) {
        if let Some(bar) = self.take_bar(task_id) {
            bar.finish_and_clear();
            self.mp.remove(&bar);
        }
    }

    fn message(&self, text: &str) {
        let _ = self.mp.println(text);
    }
}
