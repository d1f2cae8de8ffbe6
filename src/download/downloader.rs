//! Main download flow: page → album folder → links → engine.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};

use super::engine::DownloadEngine;
use super::fetcher::{Fetcher, HttpFetcher};
use super::models::{DownloadSummary, EngineConfig};
use super::progress::{ProgressSink, make_sink};
use crate::album_parser::parser::{AlbumPage, LinkError};
use crate::base_system::album_paths::ensure_album_dir;
use crate::network_parser::network::AlbumWebNetwork;

/// Fetches the album page and downloads every image into
/// `<save_dir>/<album name>`.
pub fn download_album(
    engine_cfg: &EngineConfig,
    save_dir: &Path,
    url: &str,
    password: Option<&str>,
) -> Result<DownloadSummary> {
    let network =
        AlbumWebNetwork::with_settings(&engine_cfg.user_agent, engine_cfg.request_timeout)?;
    let html = network.fetch_album_page(url, password)?;
    let page = AlbumPage::parse(&html, url);

    let fetcher = Arc::new(HttpFetcher::new(network.client()));
    let sink = make_sink(engine_cfg);
    download_page(&page, engine_cfg, save_dir, fetcher, sink)
}

/// Everything after the page request. The album folder exists before the
/// first link is scheduled; a malformed entry stops scheduling and is
/// returned once the tasks already queued have finished.
pub fn download_page(
    page: &AlbumPage,
    engine_cfg: &EngineConfig,
    save_dir: &Path,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn ProgressSink>,
) -> Result<DownloadSummary> {
    let album_name = page.album_name()?;
    let album_dir = ensure_album_dir(save_dir, &album_name)
        .with_context(|| format!("preparing folder for album '{album_name}'"))?;
    info!("saving album '{}' to {}", album_name, album_dir.display());

    let engine = DownloadEngine::new(engine_cfg, fetcher, sink, album_dir);

    let mut link_error: Option<LinkError> = None;
    let links = page.links().map_while(|item| match item {
        Ok(link) => Some(link),
        Err(err) => {
            link_error = Some(err);
            None
        }
    });
    let summary = engine.run(links);

    if let Some(err) = link_error {
        error!("{}", err);
        return Err(err).context(format!("reading image links of {}", page.source_url()));
    }
    Ok(summary)
}
