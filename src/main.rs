//! Album image downloader.
//!
//! Requests an album page, creates a folder named after the album and
//! downloads every full-size image into it on a bounded worker pool.
//!
//! Code layout:
//! - `base_system`: config, logging, album folder
//! - `network_parser`: HTTP client and the album page request
//! - `album_parser`: album title and image links
//! - `download`: tasks, worker pool, progress output and the overall flow

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use url::Url;

mod album_parser;
mod base_system;
mod download;
mod network_parser;

use base_system::config::load_or_create;
use base_system::context::Config;
use base_system::logging::{LogOptions, LogSystem};
use download::downloader::download_album;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "album-downloader", version)]
#[command(about = "Download every image of a web album into a folder named after it")]
struct Cli {
    /// Album page URL (http or https)
    #[arg(value_parser = parse_album_url)]
    album_url: Url,

    /// Password for protected albums
    password: Option<String>,

    /// Maximum number of simultaneous downloads
    #[arg(long)]
    workers: Option<usize>,

    /// Bytes read per write while streaming an image
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Progress output style
    #[arg(long, value_parser = ["lines", "bars"])]
    progress: Option<String>,

    /// Mirror debug logs to stderr
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Directory holding config.yml and logs/
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Explicit config file path
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_album_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("not a valid URL: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{other}', expected http or https")),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let data_dir = cli.data_dir.as_deref();
    let mut config = load_or_create::<Config>(cli.config.as_deref(), data_dir)
        .context("loading configuration")?;
    apply_overrides(&mut config, &cli);

    let log = LogSystem::init(
        LogOptions {
            debug: cli.debug,
            archive_on_exit: config.archive_logs_on_exit,
            ..LogOptions::default()
        },
        data_dir,
    )
    .context("starting the log system")?;
    info!("album-downloader v{}", VERSION);

    println!("Starting, please wait...");

    let engine_cfg = config.engine_config()?;
    let save_dir = config.save_dir()?;
    let start = Instant::now();

    let summary = download_album(
        &engine_cfg,
        &save_dir,
        cli.album_url.as_str(),
        cli.password.as_deref(),
    )
    .inspect_err(|err| error!("{err:#}"))?;

    let elapsed = start.elapsed().as_secs_f64();
    info!(
        "album done in {:.1}s: {} succeeded, {} failed, {} skipped",
        elapsed, summary.succeeded, summary.failed, summary.skipped
    );
    println!(
        "Finished in {elapsed:.1}s: {} downloaded, {} failed, {} skipped.",
        summary.succeeded, summary.failed, summary.skipped
    );

    log.safe_exit();
    Ok(())
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(workers) = cli.workers {
        config.max_workers = workers;
    }
    if let Some(chunk_size) = cli.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(progress) = &cli.progress {
        config.progress_style = progress.clone();
    }
}
