use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

/// An ingested ebook.
///
/// Immutable once built by the importer; reading sessions refer to it by
/// [`Book::id`] and never own it.
#[derive(Debug, Clone, Default)]
pub struct Book {
    /// Stable document id (content hash of the source archive).
    pub id: String,
    pub metadata: Metadata,
    /// Reading order.
    pub chapters: Vec<Chapter>,
    pub toc: Vec<TocEntry>,
    /// Resources keyed by normalized path (see [`normalize_path`]).
    pub resources: HashMap<String, Resource>,
}

/// Book metadata (Dublin Core subset)
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: String,
    pub authors: Vec<String>,
    pub language: String,
    pub identifier: String,
    pub publisher: Option<String>,
    pub description: Option<String>,
    /// Normalized resource path of the cover image.
    pub cover_image: Option<String>,
}

/// One spine document of the book.
#[derive(Debug, Clone)]
pub struct Chapter {
    pub title: String,
    /// Href of the chapter file relative to the package document.
    pub source_anchor: String,
    /// Original XHTML markup.
    pub html: String,
    /// Markdown rendition of the markup.
    pub markdown: String,
}

/// A table of contents entry (hierarchical)
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TocEntry {
    pub title: String,
    pub href: String,
    pub children: Vec<TocEntry>,
    /// Play order for sorting (from NCX playOrder attribute)
    pub play_order: Option<usize>,
}

impl Ord for TocEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.play_order.cmp(&other.play_order)
    }
}

impl PartialOrd for TocEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// A packaged resource (image, stylesheet, font, content document).
#[derive(Debug, Clone)]
pub struct Resource {
    pub data: Vec<u8>,
    pub media_type: String,
}

impl Resource {
    /// Render the resource as a `data:` URL for inline display.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, BASE64.encode(&self.data))
    }
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    /// First listed author, or an empty string.
    pub fn author(&self) -> &str {
        self.metadata.authors.first().map(String::as_str).unwrap_or("")
    }

    /// Add a resource under its normalized path.
    pub fn add_resource(&mut self, path: &str, data: Vec<u8>, media_type: impl Into<String>) {
        self.resources.insert(
            normalize_path(path),
            Resource {
                data,
                media_type: media_type.into(),
            },
        );
    }

    /// Look up a resource by any spelling of its path (`OEBPS/Images/a.png`,
    /// `../images/a.png`, ...).
    pub fn resource(&self, path: &str) -> Option<&Resource> {
        self.resources.get(&normalize_path(path))
    }

    /// The cover image resource, if the package declares one.
    pub fn cover(&self) -> Option<&Resource> {
        self.metadata
            .cover_image
            .as_deref()
            .and_then(|path| self.resource(path))
    }

    /// Titles in reading order, for chapter-jump menus.
    pub fn chapter_titles(&self) -> Vec<&str> {
        self.chapters.iter().map(|c| c.title.as_str()).collect()
    }

    pub fn add_chapter(&mut self, title: impl Into<String>, href: impl Into<String>, html: impl Into<String>) {
        let html = html.into();
        let markdown = crate::markdown::html_to_markdown(&html);
        self.chapters.push(Chapter {
            title: title.into(),
            source_anchor: href.into(),
            html,
            markdown,
        });
    }
}

impl TocEntry {
    pub fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: href.into(),
            children: Vec::new(),
            play_order: None,
        }
    }

    pub fn with_child(mut self, child: TocEntry) -> Self {
        self.children.push(child);
        self
    }

    /// Depth-first search for the entry pointing at `href` (fragment ignored).
    pub fn find_by_file<'a>(entries: &'a [TocEntry], href: &str) -> Option<&'a TocEntry> {
        for entry in entries {
            let file = entry.href.split('#').next().unwrap_or(&entry.href);
            if file == href {
                return Some(entry);
            }
            if let Some(found) = Self::find_by_file(&entry.children, href) {
                return Some(found);
            }
        }
        None
    }
}

/// Normalize a resource path so it can be looked up from any reference.
///
/// Drops a leading `OEBPS/`, lower-cases, then drops one leading `./` or `../`.
pub fn normalize_path(path: &str) -> String {
    let path = path.strip_prefix("OEBPS/").unwrap_or(path);
    let lowered = path.to_lowercase();
    let lowered = lowered.strip_prefix("./").unwrap_or(&lowered);
    let lowered = lowered.strip_prefix("../").unwrap_or(lowered);
    lowered.to_string()
}

/// Media type guessed from the file extension.
pub fn mime_from_extension(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}
