//! A single image download, run start to finish on one worker.

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, warn};

use super::fetcher::{DownloadError, Fetcher};
use super::models::{DownloadTask, LineEnding, TaskOutcome, TaskStatus};
use super::progress::ProgressSink;

/// Everything a worker needs, shared read-only by all workers.
pub(crate) struct TaskContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub sink: Arc<dyn ProgressSink>,
    pub album_dir: PathBuf,
    pub chunk_size: usize,
    pub line_ending: LineEnding,
}

/// Runs `task` and turns any panic inside it into a `Failed` outcome, so a
/// worker always survives to take the next task.
pub(crate) fn execute_isolated(ctx: &TaskContext, task: DownloadTask) -> TaskOutcome {
    let id = task.id;
    let url = task.link.url.clone();
    match panic::catch_unwind(AssertUnwindSafe(|| execute(ctx, task))) {
        Ok(outcome) => outcome,
        Err(_) => {
            ctx.sink.aborted(id);
            error!("download of {} panicked", url);
            let text = format!("Failed to download {url}: {}", DownloadError::Panicked);
            ctx.sink.message(&text);
            TaskOutcome {
                id,
                status: TaskStatus::Failed,
                bytes_written: 0,
            }
        }
    }
}

pub(crate) fn execute(ctx: &TaskContext, mut task: DownloadTask) -> TaskOutcome {
    let status = match download(ctx, &mut task) {
        Ok(status) => status,
        Err(err) => {
            ctx.sink.aborted(task.id);
            warn!("download of {} failed: {}", task.link.url, err);
            ctx.sink.message(&format!(
                "Failed to download {} from {}: {}",
                task.link.filename, task.link.url, err
            ));
            TaskStatus::Failed
        }
    };
    task.status = status;
    debug_assert!(task.status.is_terminal());
    debug!(
        "task {} ({}) ended {:?} after {} of {:?} bytes",
        task.id, task.link.filename, task.status, task.bytes_written, task.total_bytes
    );

    TaskOutcome {
        id: task.id,
        status: task.status,
        bytes_written: task.bytes_written,
    }
}

/// A file name from the page is used only when it names a single entry
/// directly inside the album folder on every platform.
fn is_plain_file_name(name: &str) -> bool {
    if name.contains(['\\', ':']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Non-2xx answers end the task before any file is touched. The site uses
/// 403, 404, 405 and 500 for missing or protected images.
fn is_failure_status(status: u16) -> bool {
    !(200..300).contains(&status)
}

fn download(ctx: &TaskContext, task: &mut DownloadTask) -> Result<TaskStatus, DownloadError> {
    let url = task.link.url.as_str();
    let filename = task.link.filename.as_str();

    if !is_plain_file_name(filename) {
        warn!("no usable file name in {} ({:?})", url, filename);
        ctx.sink.message(&format!("Failed to get a filename for {url}"));
        return Ok(TaskStatus::Skipped);
    }

    task.status = TaskStatus::InProgress;
    debug!("task {} fetching {}", task.id, url);
    let resp = ctx.fetcher.fetch(url)?;

    if is_failure_status(resp.status) {
        warn!("{} answered {}", url, resp.status);
        ctx.sink.message(&format!(
            "Couldn't download the file from {url}.{}Status code: {}",
            ctx.line_ending, resp.status
        ));
        return Ok(TaskStatus::Failed);
    }

    let Some(total) = resp.content_length else {
        warn!("{} has no Content-Length", url);
        ctx.sink.message(&format!("{filename} has no content."));
        return Ok(TaskStatus::Skipped);
    };
    task.total_bytes = Some(total);

    let path = ctx.album_dir.join(filename);
    let mut file = File::create(&path)?;
    ctx.sink.started(task.id, filename, total);

    let mut body = resp.body;
    if let Err(err) = stream_to_file(ctx, task, &mut *body, &mut file, total) {
        drop(file);
        let _ = fs::remove_file(&path);
        return Err(err);
    }

    ctx.sink.finished(task.id, &task.link.filename);
    Ok(TaskStatus::Succeeded)
}

fn stream_to_file(
    ctx: &TaskContext,
    task: &mut DownloadTask,
    body: &mut dyn Read,
    file: &mut File,
    total: u64,
) -> Result<(), DownloadError> {
    let mut buf = vec![0u8; ctx.chunk_size.max(1)];
    loop {
        let n = match body.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        file.write_all(&buf[..n])?;
        task.bytes_written += n as u64;
        ctx.sink.advanced(task.id, &task.link.filename, task.bytes_written, total);
    }
    file.flush()?;

    if task.bytes_written < total {
        return Err(DownloadError::Truncated {
            written: task.bytes_written,
            total,
        });
    }
    Ok(())
}
