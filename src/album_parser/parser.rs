//! Album page parsing: the album title and the image links.

use std::sync::OnceLock;

use scraper::html::Select;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

use crate::base_system::album_paths::AlbumError;
use crate::download::models::ImageLink;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Something went wrong while trying to get link {entry}: {reason}")]
    Malformed { entry: String, reason: &'static str },
}

// Compiled once and shared by every page.
fn sel_album_title() -> &'static Selector {
    static S: OnceLock<Selector> = OnceLock::new();
    S.get_or_init(|| Selector::parse("h1.text-overflow-ellipsis").expect("valid selector"))
}

fn sel_image_entry() -> &'static Selector {
    static S: OnceLock<Selector> = OnceLock::new();
    S.get_or_init(|| Selector::parse("div.list-item-image.fixed-size").expect("valid selector"))
}

fn sel_img_with_alt() -> &'static Selector {
    static S: OnceLock<Selector> = OnceLock::new();
    S.get_or_init(|| Selector::parse("img[alt]").expect("valid selector"))
}

/// A fetched album page.
pub struct AlbumPage {
    document: Html,
    source_url: String,
}

impl AlbumPage {
    pub fn parse(html: &str, source_url: &str) -> Self {
        Self {
            document: Html::parse_document(html),
            source_url: source_url.to_string(),
        }
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// The album title: every text node of the page heading, concatenated
    /// and trimmed.
    pub fn album_name(&self) -> Result<String, AlbumError> {
        let name = self
            .document
            .select(sel_album_title())
            .next()
            .map(|h1| h1.text().collect::<String>().trim().to_string())
            .filter(|text| !text.is_empty());

        name.ok_or_else(|| AlbumError::MissingName(self.source_url.clone()))
    }

    /// Image links in page order, converted one entry at a time as the
    /// caller pulls them.
    pub fn links(&self) -> LinkSource<'_> {
        LinkSource {
            entries: self.document.select(sel_image_entry()),
        }
    }
}

pub struct LinkSource<'a> {
    entries: Select<'a, 'static>,
}

impl Iterator for LinkSource<'_> {
    type Item = Result<ImageLink, LinkError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next().map(link_from_entry)
    }
}

fn link_from_entry(entry: ElementRef<'_>) -> Result<ImageLink, LinkError> {
    let malformed = |reason| LinkError::Malformed {
        entry: entry.html(),
        reason,
    };

    let img = entry
        .select(sel_img_with_alt())
        .next()
        .ok_or_else(|| malformed("no img with an alt attribute"))?;
    let alt = img.value().attr("alt").unwrap_or_default();
    let src = img
        .value()
        .attr("src")
        .ok_or_else(|| malformed("img has no src"))?;

    full_size_url(src, alt)
        .map(ImageLink::new)
        .ok_or_else(|| malformed("src has too few path segments"))
}

/// Rebuilds the full-size image URL from a thumbnail `src`.
///
/// The thumbnail and the original differ only in the last path segment, so
/// the scheme part (`https:` and the empty segment after it) and the final
/// segment are dropped and `filename` takes its place under `https://`:
///
/// `https://cdn.example/t/abc/thumb.jpg` + `photo.jpg`
/// → `https://cdn.example/t/abc/photo.jpg`
pub fn full_size_url(src: &str, filename: &str) -> Option<String> {
    let segments: Vec<&str> = src.split('/').collect();
    if segments.len() < 4 {
        return None;
    }
    let kept = &segments[2..segments.len() - 1];
    Some(format!("https://{}/{}", kept.join("/"), filename))
}
