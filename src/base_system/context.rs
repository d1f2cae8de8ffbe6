//! Global configuration (`Config`) and its defaults.
//!
//! Also resolves the per-run `EngineConfig` handed to the download engine.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::{ConfigError, ConfigSpec, FieldMeta};
use crate::download::models::{EngineConfig, LineEnding, ProgressMode};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Network
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    // Output
    #[serde(default)]
    pub save_path: String,
    #[serde(default = "default_progress_style")]
    pub progress_style: String,

    // Logging
    #[serde(default = "default_false")]
    pub archive_logs_on_exit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            chunk_size: default_chunk_size(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
            save_path: String::new(),
            progress_style: default_progress_style(),
            archive_logs_on_exit: default_false(),
        }
    }
}

impl ConfigSpec for Config {
    const FILE_NAME: &'static str = "config.yml";

    fn fields() -> &'static [FieldMeta] {
        static FIELDS: [FieldMeta; 7] = [
            FieldMeta {
                name: "max_workers",
                description: "Maximum number of images downloaded at the same time",
            },
            FieldMeta {
                name: "chunk_size",
                description: "Bytes read from the network per write, in bytes",
            },
            FieldMeta {
                name: "request_timeout",
                description: "Per-request timeout in seconds, 0 disables the timeout",
            },
            FieldMeta {
                name: "user_agent",
                description: "User-Agent header sent with every request",
            },
            FieldMeta {
                name: "save_path",
                description: "Directory album folders are created in (empty = current directory)",
            },
            FieldMeta {
                name: "progress_style",
                description: "Progress output, one of: [lines, bars]",
            },
            FieldMeta {
                name: "archive_logs_on_exit",
                description: "Zip logs/latest.log into logs/ when the program exits",
            },
        ];
        &FIELDS
    }
}

impl Config {
    /// Directory album folders are created in.
    pub fn save_dir(&self) -> Result<PathBuf, ConfigError> {
        let trimmed = self.save_path.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
        std::env::current_dir().map_err(|source| ConfigError::Io {
            path: PathBuf::from("."),
            source,
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.request_timeout > 0).then(|| Duration::from_secs(self.request_timeout))
    }

    /// Resolves the immutable engine settings for this run.
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let progress = self
            .progress_style
            .parse::<ProgressMode>()
            .map_err(ConfigError::Validation)?;

        Ok(EngineConfig {
            max_concurrency: self.max_workers.max(1),
            chunk_size: self.chunk_size.max(1),
            user_agent: self.user_agent.clone(),
            request_timeout: self.timeout(),
            line_ending: LineEnding::native(),
            progress,
        })
    }
}

fn default_max_workers() -> usize {
    50
}

fn default_chunk_size() -> usize {
    4096
}

fn default_request_timeout() -> u64 {
    60
}

fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

fn default_progress_style() -> String {
    "lines".to_string()
}

fn default_false() -> bool {
    false
}
