//! Opening streamed image responses.
//!
//! The engine only sees the `Fetcher` trait; `HttpFetcher` is the reqwest
//! implementation used at runtime.

use std::io::{self, Read};

use reqwest::blocking::Client;
use reqwest::header::CONTENT_LENGTH;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("body ended after {written} of {total} bytes")]
    Truncated { written: u64, total: u64 },
    #[error("download task panicked")]
    Panicked,
}

/// Status line, declared size and the unread body of one response.
pub struct FetchResponse {
    pub status: u16,
    pub content_length: Option<u64>,
    pub body: Box<dyn Read + Send>,
}

pub trait Fetcher: Send + Sync {
    /// Opens `url` without reading its body.
    fn fetch(&self, url: &str) -> Result<FetchResponse, DownloadError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchResponse, DownloadError> {
        let resp = self.client.get(url).send()?;
        // Read the header itself: only a declared length drives progress.
        let content_length = resp
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        Ok(FetchResponse {
            status: resp.status().as_u16(),
            content_length,
            body: Box::new(resp),
        })
    }
}
