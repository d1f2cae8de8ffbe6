//! Album directory naming and creation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlbumError {
    #[error("failed to parse an album name from {0}")]
    MissingName(String),
    #[error("album name is empty after sanitizing")]
    EmptyName,
    #[error("failed to create album directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
}

/// Turns an album title into a single path segment.
///
/// Path separators become `-`, control characters are dropped and a name made
/// only of dots cannot name the current or parent directory.
pub fn sanitize_album_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '/' | '\\' => '-',
            _ => c,
        })
        .collect();

    if !cleaned.is_empty() && cleaned.chars().all(|c| c == '.') {
        return cleaned.replace('.', "_");
    }
    cleaned
}

/// Creates `base/<sanitized name>` if needed and returns it.
///
/// An existing directory is not an error, so running twice against the same
/// album is fine.
pub fn ensure_album_dir(base: &Path, album_name: &str) -> Result<PathBuf, AlbumError> {
    let name = sanitize_album_name(album_name);
    if name.is_empty() {
        return Err(AlbumError::EmptyName);
    }
    let path = base.join(name);
    match fs::create_dir(&path) {
        Ok(()) => Ok(path),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(path),
        Err(source) => Err(AlbumError::CreateDir { path, source }),
    }
}
