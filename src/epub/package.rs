//! Package document parsing: `container.xml`, the OPF, and both table of
//! contents flavours (EPUB 2 NCX, EPUB 3 navigation document).

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::book::{Metadata, TocEntry};
use crate::dom::{ArenaDom, NodeId, parse_html};
use crate::error::{Error, Result};
use crate::util::local_name;

/// One `<item>` of the OPF manifest.
#[derive(Debug, Clone, Default)]
pub struct ManifestItem {
    pub id: String,
    /// Relative to the package document.
    pub href: String,
    pub media_type: String,
    pub properties: Vec<String>,
}

impl ManifestItem {
    fn has_property(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p == property)
    }
}

/// The parts of an OPF package document the importer uses.
#[derive(Debug, Clone, Default)]
pub struct Package {
    pub metadata: Metadata,
    /// Manifest in document order.
    pub manifest: Vec<ManifestItem>,
    /// Manifest ids in reading order.
    pub spine: Vec<String>,
    toc_id: Option<String>,
    cover_id: Option<String>,
}

impl Package {
    pub fn item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }

    pub fn item_by_href(&self, href: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.href == href)
    }

    /// EPUB 2 NCX, from the spine's `toc` attribute or its media type.
    pub fn ncx(&self) -> Option<&ManifestItem> {
        self.toc_id
            .as_deref()
            .and_then(|id| self.item(id))
            .or_else(|| {
                self.manifest
                    .iter()
                    .find(|item| item.media_type == "application/x-dtbncx+xml")
            })
    }

    /// EPUB 3 navigation document.
    pub fn nav(&self) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.has_property("nav"))
    }

    /// Cover image: `properties="cover-image"` wins over `<meta name="cover">`.
    pub fn cover(&self) -> Option<&ManifestItem> {
        self.manifest
            .iter()
            .find(|item| item.has_property("cover-image"))
            .or_else(|| self.cover_id.as_deref().and_then(|id| self.item(id)))
    }

    /// Parse an OPF document.
    pub fn parse(content: &str) -> Result<Package> {
        let mut reader = Reader::from_str(content);
        let mut package = Package::default();
        let mut in_metadata = false;
        let mut capturing: Option<Vec<u8>> = None;
        let mut text = String::new();

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let name = e.name();
                    let local = local_name(name.as_ref());
                    match local {
                        b"metadata" => in_metadata = true,
                        b"title" | b"creator" | b"language" | b"identifier" | b"publisher"
                        | b"description"
                            if in_metadata =>
                        {
                            capturing = Some(local.to_vec());
                            text.clear();
                        }
                        _ => package.handle_element(&e)?,
                    }
                }
                Event::Empty(e) => package.handle_element(&e)?,
                Event::Text(e) if capturing.is_some() => {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
                Event::GeneralRef(e) if capturing.is_some() => {
                    if let Some(c) = resolve_entity(&String::from_utf8_lossy(e.as_ref())) {
                        text.push(c);
                    }
                }
                Event::End(e) => {
                    let name = e.name();
                    let local = local_name(name.as_ref());
                    if local == b"metadata" {
                        in_metadata = false;
                    }
                    if capturing.as_deref() == Some(local) {
                        package.set_metadata_field(local, text.trim());
                        capturing = None;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(package)
    }

    fn handle_element(&mut self, e: &BytesStart<'_>) -> Result<()> {
        let name = e.name();
        match local_name(name.as_ref()) {
            b"item" => {
                let mut item = ManifestItem::default();
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8(attr.value.to_vec())?;
                    match attr.key.as_ref() {
                        b"id" => item.id = value,
                        b"href" => item.href = value,
                        b"media-type" => item.media_type = value,
                        b"properties" => {
                            item.properties = value.split_whitespace().map(String::from).collect()
                        }
                        _ => {}
                    }
                }
                if !item.id.is_empty() && !item.href.is_empty() {
                    self.manifest.push(item);
                }
            }
            b"itemref" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"idref" {
                        self.spine.push(String::from_utf8(attr.value.to_vec())?);
                    }
                }
            }
            b"spine" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"toc" {
                        self.toc_id = Some(String::from_utf8(attr.value.to_vec())?);
                    }
                }
            }
            b"meta" => {
                let mut is_cover = false;
                let mut content = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"name" => is_cover = attr.value.as_ref() == b"cover",
                        b"content" => content = Some(String::from_utf8(attr.value.to_vec())?),
                        _ => {}
                    }
                }
                if is_cover && self.cover_id.is_none() {
                    self.cover_id = content.filter(|c| !c.is_empty());
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn set_metadata_field(&mut self, field: &[u8], value: &str) {
        if value.is_empty() {
            return;
        }
        let metadata = &mut self.metadata;
        let value = value.to_string();
        match field {
            b"title" if metadata.title.is_empty() => metadata.title = value,
            b"creator" => metadata.authors.push(value),
            b"language" if metadata.language.is_empty() => metadata.language = value,
            b"identifier" if metadata.identifier.is_empty() => metadata.identifier = value,
            b"publisher" => metadata.publisher = Some(value),
            b"description" => metadata.description = Some(value),
            _ => {}
        }
    }
}

/// `full-path` of the first `<rootfile>` in `META-INF/container.xml`.
pub fn rootfile_path(container: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(container);
    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e) if local_name(e.name().as_ref()) == b"rootfile" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"full-path" {
                        return Ok(Some(String::from_utf8(attr.value.to_vec())?));
                    }
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Parse an NCX table of contents. Hrefs are returned as written.
pub fn parse_ncx(content: &str) -> Result<Vec<TocEntry>> {
    let mut reader = Reader::from_str(content);
    // Bottom entry collects the top-level navPoints.
    let mut stack = vec![TocEntry::new("", "")];
    let mut in_label = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                b"navPoint" => {
                    let mut entry = TocEntry::new("", "");
                    entry.play_order = e
                        .attributes()
                        .flatten()
                        .find(|a| a.key.as_ref() == b"playOrder")
                        .and_then(|a| String::from_utf8_lossy(&a.value).trim().parse().ok());
                    stack.push(entry);
                }
                b"text" => in_label = true,
                _ => {}
            },
            Ok(Event::Empty(e)) if local_name(e.name().as_ref()) == b"content" => {
                if let Some(src) = e.attributes().flatten().find(|a| a.key.as_ref() == b"src")
                    && let Some(entry) = stack.last_mut()
                {
                    entry.href = String::from_utf8(src.value.to_vec())?;
                }
            }
            Ok(Event::Text(e)) if in_label => {
                if let Some(entry) = stack.last_mut() {
                    entry.title.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) if in_label => {
                if let Some(entry) = stack.last_mut()
                    && let Some(c) = resolve_entity(&String::from_utf8_lossy(e.as_ref()))
                {
                    entry.title.push(c);
                }
            }
            Ok(Event::End(e)) => match local_name(e.name().as_ref()) {
                b"text" => in_label = false,
                b"navPoint" if stack.len() > 1 => {
                    if let Some(mut entry) = stack.pop() {
                        entry.title = entry.title.trim().to_string();
                        if let Some(parent) = stack.last_mut() {
                            adopt(parent, entry);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    let mut entries = stack
        .into_iter()
        .next()
        .map(|root| root.children)
        .unwrap_or_default();
    entries.sort();
    Ok(entries)
}

/// Attach `entry` to `parent`; entries without a target hand their children up.
fn adopt(parent: &mut TocEntry, entry: TocEntry) {
    if entry.href.is_empty() || entry.title.is_empty() {
        parent.children.extend(entry.children);
    } else {
        parent.children.push(entry);
    }
}

/// Parse the `toc` nav of an EPUB 3 navigation document.
pub fn parse_nav(content: &str) -> Vec<TocEntry> {
    let dom = parse_html(content);
    let navs: Vec<NodeId> = dom
        .descendants(dom.document())
        .filter(|&id| dom.tag_name(id) == Some("nav"))
        .collect();
    let toc_nav = navs
        .iter()
        .copied()
        .find(|&nav| {
            dom.get_attr(nav, "epub:type")
                .or_else(|| dom.get_attr(nav, "type"))
                .is_some_and(|t| t.split_whitespace().any(|t| t == "toc"))
        })
        .or_else(|| navs.first().copied());

    toc_nav
        .and_then(|nav| {
            dom.descendants(nav)
                .find(|&id| matches!(dom.tag_name(id), Some("ol" | "ul")))
        })
        .map(|list| nav_list(&dom, list))
        .unwrap_or_default()
}

fn nav_list(dom: &ArenaDom, list: NodeId) -> Vec<TocEntry> {
    let mut entries = Vec::new();
    for item in dom.children(list).filter(|&c| dom.tag_name(c) == Some("li")) {
        let label = dom
            .children(item)
            .find(|&c| matches!(dom.tag_name(c), Some("a" | "span")));
        let children = dom
            .children(item)
            .find(|&c| matches!(dom.tag_name(c), Some("ol" | "ul")))
            .map(|sub| nav_list(dom, sub))
            .unwrap_or_default();

        let mut entry = TocEntry::new(
            label
                .map(|l| dom.text_content(l).split_whitespace().collect::<Vec<_>>().join(" "))
                .unwrap_or_default(),
            label.and_then(|l| dom.get_attr(l, "href")).unwrap_or(""),
        );
        entry.children = children;
        entry.play_order = Some(entries.len());
        entries.push(entry);
    }
    entries
}

fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "apos" => Some('\''),
        "quot" => Some('"'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        _ => {
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}
