//! In-memory fetcher and recording sink for engine and task tests.

use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::fetcher::{DownloadError, FetchResponse, Fetcher};
use super::progress::{ProgressReporter, ProgressSink};

#[derive(Debug, Clone)]
pub(crate) enum Canned {
    Response {
        status: u16,
        length: Option<u64>,
        body: Vec<u8>,
        fail_after: Option<usize>,
    },
    Unreachable,
    Panic,
}

impl Canned {
    pub(crate) fn ok(body: &[u8]) -> Self {
        Self::Response {
            status: 200,
            length: Some(body.len() as u64),
            body: body.to_vec(),
            fail_after: None,
        }
    }

    pub(crate) fn status(status: u16) -> Self {
        Self::Response {
            status,
            length: Some(9),
            body: b"not found".to_vec(),
            fail_after: None,
        }
    }

    pub(crate) fn unreachable() -> Self {
        Self::Unreachable
    }

    pub(crate) fn panicking() -> Self {
        Self::Panic
    }

    pub(crate) fn without_length(self) -> Self {
        self.map_response(|length, _| *length = None)
    }

    pub(crate) fn with_length(self, declared: u64) -> Self {
        self.map_response(|length, _| *length = Some(declared))
    }

    pub(crate) fn fail_after(self, bytes: usize) -> Self {
        self.map_response(|_, fail_after| *fail_after = Some(bytes))
    }

    fn map_response(mut self, f: impl FnOnce(&mut Option<u64>, &mut Option<usize>)) -> Self {
        if let Self::Response {
            length, fail_after, ..
        } = &mut self
        {
            f(length, fail_after);
        }
        self
    }
}

/// Counts requests and how many are open at once. A request counts as open
/// from `fetch` until its body is dropped.
#[derive(Debug, Default)]
pub(crate) struct CallStats {
    total: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl CallStats {
    pub(crate) fn count(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub(crate) fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

struct ActiveGuard(Arc<CallStats>);

impl ActiveGuard {
    fn enter(stats: &Arc<CallStats>) -> Self {
        stats.total.fetch_add(1, Ordering::SeqCst);
        let now = stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        stats.peak.fetch_max(now, Ordering::SeqCst);
        Self(Arc::clone(stats))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

struct CannedBody {
    data: Cursor<Vec<u8>>,
    fail_after: Option<usize>,
    read_delay: Duration,
    _guard: ActiveGuard,
}

impl Read for CannedBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.read_delay.is_zero() {
            thread::sleep(self.read_delay);
        }
        let pos = self.data.position() as usize;
        let limit = match self.fail_after {
            Some(limit) if pos >= limit => {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer"));
            }
            Some(limit) => (limit - pos).min(buf.len()),
            None => buf.len(),
        };
        self.data.read(&mut buf[..limit])
    }
}

#[derive(Default)]
pub(crate) struct MemoryFetcher {
    responses: HashMap<String, Canned>,
    fallback: Option<Canned>,
    read_delay: Duration,
    stats: Arc<CallStats>,
}

impl MemoryFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, url: &str, canned: Canned) -> Self {
        self.responses.insert(url.to_string(), canned);
        self
    }

    /// Answer for every URL without its own entry.
    pub(crate) fn otherwise(mut self, canned: Canned) -> Self {
        self.fallback = Some(canned);
        self
    }

    pub(crate) fn read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> Arc<CallStats> {
        Arc::clone(&self.stats)
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&self, url: &str) -> Result<FetchResponse, DownloadError> {
        let guard = ActiveGuard::enter(&self.stats);
        let canned = self
            .responses
            .get(url)
            .or(self.fallback.as_ref())
            .cloned()
            .unwrap_or_else(|| Canned::status(404));

        match canned {
            Canned::Response {
                status,
                length,
                body,
                fail_after,
            } => Ok(FetchResponse {
                status,
                content_length: length,
                body: Box::new(CannedBody {
                    data: Cursor::new(body),
                    fail_after,
                    read_delay: self.read_delay,
                    _guard: guard,
                }),
            }),
            Canned::Unreachable => Err(DownloadError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
            Canned::Panic => panic!("fetcher exploded for {url}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SinkEvent {
    Started { id: usize, file: String, total: u64 },
    Advanced { id: usize, file: String, percent: f64 },
    Finished { id: usize, file: String },
    Aborted { id: usize },
    Message(String),
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Message(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: SinkEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl ProgressSink for RecordingSink {
    fn started(&self, task_id: usize, filename: &str, total: u64) {
        self.push(SinkEvent::Started {
            id: task_id,
            file: filename.to_string(),
            total,
        });
    }

    fn advanced(&self, task_id: usize, filename: &str, written: u64, total: u64) {
        self.push(SinkEvent::Advanced {
            id: task_id,
            file: filename.to_string(),
            percent: ProgressReporter::percent(written, total),
        });
    }

    fn finished(&self, task_id: usize, filename: &str) {
        self.push(SinkEvent::Finished {
            id: task_id,
            file: filename.to_string(),
        });
    }

    fn aborted(&self, task_id: usize) {
        self.push(SinkEvent::Aborted { id: task_id });
    }

    fn message(&self, text: &str) {
        self.push(SinkEvent::Message(text.to_string()));
    }
}
