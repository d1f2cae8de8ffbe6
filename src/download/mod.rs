//! Download flow entry point.
//!
//! Submodules:
//! - `models`: links, task state, engine settings, run summary
//! - `progress`: progress text and output sinks
//! - `fetcher`: streamed HTTP responses behind the `Fetcher` trait
//! - `task`: one image download, isolated from the others
//! - `engine`: bounded worker pool running the tasks
//! - `downloader`: page fetch, folder, links and engine wired together

pub mod downloader;
pub mod engine;
pub mod fetcher;
pub mod models;
pub mod progress;
pub(crate) mod task;

#[cfg(test)]
pub(crate) mod test_helpers;
