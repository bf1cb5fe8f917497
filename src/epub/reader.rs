use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use zip::ZipArchive;

use super::package::{Package, parse_nav, parse_ncx, rootfile_path};
use crate::book::{Book, TocEntry, mime_from_extension};
use crate::dom::parse_html;
use crate::error::{Error, Result};
use crate::util::{content_hash, decode_text, strip_bom};

/// Media type of an EPUB container.
pub const EPUB_MEDIA_TYPE: &str = "application/epub+zip";

/// Read an EPUB file from disk into a [`Book`].
///
/// The declared media type is taken from the file extension; files without
/// one are sniffed from their contents.
///
/// # Example
///
/// ```no_run
/// let book = lectern::parse_book("path/to/book.epub")?;
/// println!("{} chapters", book.chapters.len());
/// # Ok::<(), lectern::Error>(())
/// ```
pub fn parse_book<P: AsRef<Path>>(path: P) -> Result<Book> {
    let path = path.as_ref();
    let declared = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(media_type_for_extension);
    if let Some(media_type) = declared
        && media_type != EPUB_MEDIA_TYPE
    {
        return Err(Error::UnsupportedFormat(media_type.to_string()));
    }
    let data = std::fs::read(path)?;
    parse_book_bytes(&data, declared)
}

/// Parse an in-memory EPUB.
///
/// `declared_media_type` is what the caller was told the file is (a file
/// picker's MIME type, say). Anything other than `application/epub+zip` is
/// rejected with [`Error::UnsupportedFormat`]; when absent the archive's
/// `mimetype` entry decides.
pub fn parse_book_bytes(data: &[u8], declared_media_type: Option<&str>) -> Result<Book> {
    if let Some(media_type) = declared_media_type
        && media_type != EPUB_MEDIA_TYPE
    {
        return Err(Error::UnsupportedFormat(media_type.to_string()));
    }

    let mut archive = ZipArchive::new(Cursor::new(data))
        .map_err(|e| Error::UnsupportedFormat(format!("not a ZIP container: {e}")))?;

    if let Some(mimetype) = read_entry(&mut archive, "mimetype")? {
        let mimetype = String::from_utf8_lossy(&mimetype);
        if mimetype.trim() != EPUB_MEDIA_TYPE {
            return Err(Error::UnsupportedFormat(mimetype.trim().to_string()));
        }
    }

    let container = read_text(&mut archive, "META-INF/container.xml")?
        .ok_or_else(|| Error::MalformedArchive("META-INF/container.xml not found".into()))?;
    let opf_path = rootfile_path(&container)?
        .ok_or_else(|| Error::MalformedArchive("no rootfile in container.xml".into()))?;
    let opf = read_text(&mut archive, &opf_path)?
        .ok_or_else(|| Error::MalformedArchive(format!("package document {opf_path} not found")))?;
    let package = Package::parse(&opf)?;
    let opf_dir = parent_dir(&opf_path);

    let mut book = Book::new();
    book.id = content_hash(data);
    book.metadata = package.metadata.clone();
    book.metadata.cover_image = package
        .cover()
        .map(|item| resolve_path(&opf_dir, &item.href));

    load_resources(&mut archive, &package, &opf_dir, &mut book)?;
    book.toc = load_toc(&mut archive, &package, &opf_dir)?;

    for idref in &package.spine {
        let Some(item) = package.item(idref) else {
            warn!(idref = %idref, "spine item missing from manifest");
            continue;
        };
        let Some(bytes) = read_chapter(&mut archive, &opf_dir, &item.href)? else {
            warn!(href = %item.href, "chapter file not found in archive");
            continue;
        };
        let html = decode_text(&bytes).into_owned();
        let title = chapter_title(&book.toc, &item.href, &html);
        book.add_chapter(title, item.href.clone(), html);
    }

    if book.chapters.is_empty() {
        return Err(Error::MalformedArchive(
            "no content documents could be read".into(),
        ));
    }

    info!(
        id = %book.id,
        title = %book.metadata.title,
        chapters = book.chapters.len(),
        resources = book.resources.len(),
        "parsed book"
    );
    Ok(book)
}

/// Outcome of importing one file of a batch.
#[derive(Debug)]
pub struct ImportResult {
    pub path: PathBuf,
    pub result: Result<Book>,
}

/// Import several files; a failure is reported for its file only.
pub fn import_batch<I, P>(paths: I) -> Vec<ImportResult>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    paths
        .into_iter()
        .map(|path| {
            let path = path.as_ref().to_path_buf();
            let result = parse_book(&path);
            if let Err(e) = &result {
                warn!(path = %path.display(), error = %e, "import failed");
            }
            ImportResult { path, result }
        })
        .collect()
}

fn media_type_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "epub" => EPUB_MEDIA_TYPE,
        "pdf" => "application/pdf",
        "mobi" | "azw" | "azw3" => "application/x-mobipocket-ebook",
        "txt" => "text/plain",
        "html" | "htm" | "xhtml" => "text/html",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

/// Every file in the archive becomes a resource, typed by the manifest when
/// it lists the file.
fn load_resources<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    package: &Package,
    opf_dir: &str,
    book: &mut Book,
) -> Result<()> {
    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;

        let media_type = relative_to(opf_dir, &name)
            .and_then(|href| package.item_by_href(href))
            .map(|item| item.media_type.clone())
            .filter(|mt| !mt.is_empty())
            .unwrap_or_else(|| mime_from_extension(&name).to_string());
        book.add_resource(&name, data, media_type);
    }
    debug!(count = book.resources.len(), "loaded resources");
    Ok(())
}

/// Table of contents with hrefs rebased onto the package directory.
fn load_toc<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    package: &Package,
    opf_dir: &str,
) -> Result<Vec<TocEntry>> {
    if let Some(nav) = package.nav() {
        let path = resolve_path(opf_dir, &nav.href);
        if let Some(content) = read_text(archive, &path)? {
            let toc = parse_nav(&content);
            if !toc.is_empty() {
                return Ok(rebase(toc, &parent_dir(&nav.href)));
            }
        }
    }
    if let Some(ncx) = package.ncx() {
        let path = resolve_path(opf_dir, &ncx.href);
        if let Some(content) = read_text(archive, &path)? {
            return Ok(rebase(parse_ncx(&content)?, &parent_dir(&ncx.href)));
        }
    }
    debug!("book has no table of contents");
    Ok(Vec::new())
}

fn rebase(entries: Vec<TocEntry>, dir: &str) -> Vec<TocEntry> {
    entries
        .into_iter()
        .map(|mut entry| {
            if !entry.href.is_empty() {
                entry.href = resolve_path(dir, &entry.href);
            }
            entry.children = rebase(entry.children, dir);
            entry
        })
        .collect()
}

/// TOC label, else the first heading, else the href.
fn chapter_title(toc: &[TocEntry], href: &str, html: &str) -> String {
    if let Some(entry) = TocEntry::find_by_file(toc, href) {
        return entry.title.clone();
    }
    let dom = parse_html(html);
    dom.descendants(dom.document())
        .find(|&id| {
            matches!(
                dom.tag_name(id),
                Some("h1" | "h2" | "h3" | "h4" | "h5" | "h6")
            )
        })
        .map(|heading| {
            dom.text_content(heading)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| href.to_string())
}

/// Chapter files are looked up next to the package document, then under
/// `OEBPS/`, then at the archive root.
fn read_chapter<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    opf_dir: &str,
    href: &str,
) -> Result<Option<Vec<u8>>> {
    let href = href.split('#').next().unwrap_or(href);
    for candidate in [resolve_path(opf_dir, href), format!("OEBPS/{href}"), href.to_string()] {
        if let Some(bytes) = read_entry(archive, &candidate)? {
            return Ok(Some(bytes));
        }
    }
    Ok(None)
}

fn read_text<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<Option<String>> {
    Ok(read_entry(archive, path)?.map(|bytes| decode_text(strip_bom(&bytes)).into_owned()))
}

/// Read an archive entry; `None` when it does not exist.
fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<Option<Vec<u8>>> {
    let name = match archive.index_for_name(path) {
        Some(_) => path.to_string(),
        // Some packagers write percent-encoded hrefs for plain file names.
        None => match percent_encoding::percent_decode_str(path).decode_utf8() {
            Ok(decoded) if archive.index_for_name(&decoded).is_some() => decoded.into_owned(),
            _ => return Ok(None),
        },
    };
    let mut file = archive.by_name(&name)?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;
    Ok(Some(contents))
}

fn parent_dir(path: &str) -> String {
    path.rsplit_once('/')
        .map(|(dir, _)| dir.to_string())
        .unwrap_or_default()
}

/// Join `href` onto `base`, folding `.` and `..` segments.
fn resolve_path(base: &str, href: &str) -> String {
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }
    segments.join("/")
}

/// Path of an archive entry relative to `dir`, if it lives below it.
fn relative_to<'a>(dir: &str, path: &'a str) -> Option<&'a str> {
    if dir.is_empty() {
        return Some(path);
    }
    path.strip_prefix(dir)?.strip_prefix('/')
}
