pub mod album_paths;
pub mod config;
pub mod context;
pub mod logging;
