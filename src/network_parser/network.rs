use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, CONNECTION, HeaderMap, HeaderValue, USER_AGENT};
use thiserror::Error;
use tracing::{debug, error, info};

/// Form field the site reads the album password from.
const PASSWORD_FIELD: &str = "content-password";

#[derive(Debug, Error)]
pub enum PageError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Failed to make a page request, verify your internet connection! ({0})")]
    Connect(#[source] reqwest::Error),
    #[error("album page {url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("failed to read album page body: {0}")]
    Body(#[source] reqwest::Error),
}

/// Builds the blocking client shared by the page request and every image
/// worker. `Client` is reference counted, so clones share one pool.
pub fn build_client(user_agent: &str, timeout: Option<Duration>) -> reqwest::Result<Client> {
    // No decompression features are enabled, so ask for identity bodies and
    // Content-Length stays the on-wire size.
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent).unwrap_or(HeaderValue::from_static("Mozilla/5.0")),
    );

    // The blocking builder applies a 30s default unless told otherwise, so
    // `None` must be passed through explicitly.
    Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
}

pub struct AlbumWebNetwork {
    client: Client,
}

impl AlbumWebNetwork {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn with_settings(user_agent: &str, timeout: Option<Duration>) -> Result<Self, PageError> {
        build_client(user_agent, timeout)
            .map(Self::new)
            .map_err(PageError::Client)
    }

    /// A handle on the same connection pool, for the image downloads.
    pub fn client(&self) -> Client {
        self.client.clone()
    }

    /// Fetches the album page. Protected albums take their password as a
    /// form field on the same POST.
    pub fn fetch_album_page(&self, url: &str, password: Option<&str>) -> Result<String, PageError> {
        let mut request = self.client.post(url);
        if let Some(password) = password {
            request = request.form(&[(PASSWORD_FIELD, password)]);
        }

        debug!("requesting album page {}", url);
        let resp = request.send().map_err(|e| {
            error!("album page request failed: {}", e);
            PageError::Connect(e)
        })?;

        let status = resp.status();
        if !status.is_success() {
            error!("album page {} answered {}", url, status);
            return Err(PageError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.text().map_err(PageError::Body)?;
        info!("album page fetched ({} bytes)", body.len());
        Ok(body)
    }
}
