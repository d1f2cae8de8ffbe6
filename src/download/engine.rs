//! Bounded worker pool that downloads every link of an album.
//!
//! The caller's thread pulls links lazily and hands them to a fixed set of
//! worker threads over a bounded channel; a full channel blocks the producer,
//! which is the only backpressure. Each worker runs one task at a time, so
//! no more than `max_concurrency` downloads are ever in flight.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crossbeam_channel as channel;
use tracing::{debug, info, warn};

use super::fetcher::Fetcher;
use super::models::{DownloadSummary, DownloadTask, EngineConfig, ImageLink, TaskOutcome};
use super::progress::ProgressSink;
use super::task::{TaskContext, execute_isolated};

pub struct DownloadEngine {
    workers: usize,
    ctx: Arc<TaskContext>,
}

impl DownloadEngine {
    pub fn new(
        config: &EngineConfig,
        fetcher: Arc<dyn Fetcher>,
        sink: Arc<dyn ProgressSink>,
        album_dir: PathBuf,
    ) -> Self {
        Self {
            workers: config.max_concurrency.max(1),
            ctx: Arc::new(TaskContext {
                fetcher,
                sink,
                album_dir,
                chunk_size: config.chunk_size.max(1),
                line_ending: config.line_ending,
            }),
        }
    }

    /// Downloads every link and returns once all of them reached a terminal
    /// state. Per-link failures are reported and counted, never returned.
    pub fn run<I>(&self, links: I) -> DownloadSummary
    where
        I: IntoIterator<Item = ImageLink>,
    {
        let (tx, rx) = channel::bounded::<DownloadTask>(self.workers);
        let (tx_evt, rx_evt) = channel::unbounded::<TaskOutcome>();

        let mut handles = Vec::with_capacity(self.workers);
        for idx in 0..self.workers {
            let rx = rx.clone();
            let tx_evt = tx_evt.clone();
            let ctx = Arc::clone(&self.ctx);

            let spawned = thread::Builder::new()
                .name(format!("download-{idx}"))
                .spawn(move || {
                    for task in rx.iter() {
                        let _ = tx_evt.send(execute_isolated(&ctx, task));
                    }
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    warn!("could only start {} of {} workers: {}", idx, self.workers, err);
                    break;
                }
            }
        }
        drop(rx);

        let mut submitted = 0usize;
        for link in links {
            let task = DownloadTask::new(submitted, link);
            submitted += 1;

            // With no worker left to receive, run the task on this thread.
            let task = if handles.is_empty() {
                Some(task)
            } else {
                tx.send(task).err().map(|channel::SendError(task)| task)
            };
            if let Some(task) = task {
                let _ = tx_evt.send(execute_isolated(&self.ctx, task));
            }
        }
        drop(tx);
        drop(tx_evt);
        info!("queued {} downloads on {} workers", submitted, handles.len());

        for handle in handles {
            let _ = handle.join();
        }

        let mut summary = DownloadSummary::default();
        for outcome in rx_evt.try_iter() {
            debug!(
                "task {} reported {:?} ({} bytes)",
                outcome.id, outcome.status, outcome.bytes_written
            );
            summary.record(outcome.status);
        }
        info!(
            "{} downloads finished: {} succeeded, {} failed, {} skipped",
            summary.total(),
            summary.succeeded,
            summary.failed,
            summary.skipped
        );
        summary
    }
}
