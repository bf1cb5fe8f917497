//! Markup tree: parsing chapter XHTML and answering layout-free style queries.
//!
//! The tree carries no layout. Visibility is derived from what markup can
//! express on its own: the `hidden` attribute, inline `display` /
//! `visibility` declarations, and elements that never render (`head`,
//! `script`, `style`, ...).

mod arena;
mod sink;

pub use arena::{ArenaDom, Attribute, Node, NodeData, NodeId};
pub use sink::ArenaSink;

use std::collections::HashMap;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

/// Parse an HTML or XHTML document into an arena tree.
pub fn parse_html(html: &str) -> ArenaDom {
    let sink = ArenaSink::new();
    parse_document(sink, ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes())
        .into_dom()
}

/// Elements that start a new block of text.
pub fn is_block_tag(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "li"
            | "dt"
            | "dd"
            | "blockquote"
            | "pre"
            | "div"
            | "section"
            | "article"
            | "main"
            | "aside"
            | "header"
            | "footer"
            | "nav"
            | "figure"
            | "figcaption"
            | "td"
            | "th"
            | "caption"
            | "table"
            | "tr"
            | "ul"
            | "ol"
            | "dl"
            | "body"
            | "html"
            | "address"
            | "hr"
    )
}

/// Elements that group blocks without being a paragraph themselves.
pub fn is_structural_tag(tag: &str) -> bool {
    matches!(
        tag,
        "html" | "body" | "main" | "article" | "section" | "div" | "header" | "footer" | "nav"
    )
}

/// Elements whose content is never rendered.
pub fn is_non_rendered_tag(tag: &str) -> bool {
    matches!(
        tag,
        "head" | "script" | "style" | "template" | "noscript" | "title" | "meta" | "link"
    )
}

/// `display` as far as word navigation cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Shown,
    None,
}

/// `visibility` as far as word navigation cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Style properties of one element that affect navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputedStyle {
    pub display: Display,
    pub visibility: Visibility,
}

impl ComputedStyle {
    pub const VISIBLE: ComputedStyle = ComputedStyle {
        display: Display::Shown,
        visibility: Visibility::Visible,
    };

    pub fn is_visible(&self) -> bool {
        self.display != Display::None && self.visibility != Visibility::Hidden
    }
}

impl ArenaDom {
    /// Style of a single element, ignoring ancestors except for inherited
    /// `visibility` which the caller resolves.
    pub fn own_style(&self, id: NodeId) -> ComputedStyle {
        let Some(tag) = self.tag_name(id) else {
            return ComputedStyle::VISIBLE;
        };
        let mut style = ComputedStyle::VISIBLE;
        if is_non_rendered_tag(tag) || self.get_attr(id, "hidden").is_some() {
            style.display = Display::None;
        }
        if let Some(inline) = self.get_attr(id, "style") {
            for declaration in inline.split(';') {
                let Some((property, value)) = declaration.split_once(':') else {
                    continue;
                };
                let value = value.trim().trim_end_matches("!important").trim();
                match property.trim().to_ascii_lowercase().as_str() {
                    "display" if value.eq_ignore_ascii_case("none") => {
                        style.display = Display::None;
                    }
                    "visibility" if value.eq_ignore_ascii_case("hidden")
                        || value.eq_ignore_ascii_case("collapse") =>
                    {
                        style.visibility = Visibility::Hidden;
                    }
                    _ => {}
                }
            }
        }
        style
    }
}

/// Per-query cache of element visibility.
///
/// An element is visible when neither it nor any ancestor has
/// `display: none` and it is not `visibility: hidden`. Create one per
/// navigation call; the markup may change between calls.
pub struct StyleCache<'a> {
    dom: &'a ArenaDom,
    visible: HashMap<NodeId, bool>,
}

impl<'a> StyleCache<'a> {
    pub fn new(dom: &'a ArenaDom) -> Self {
        Self {
            dom,
            visible: HashMap::new(),
        }
    }

    /// Whether `node` (element or text) renders with non-zero layout.
    pub fn is_visible(&mut self, node: NodeId) -> bool {
        let element = if self.dom.is_element(node) {
            node
        } else {
            self.dom.parent(node)
        };
        if element.is_none() || !self.dom.is_element(element) {
            return true;
        }
        if let Some(&cached) = self.visible.get(&element) {
            return cached;
        }

        let own = self.dom.own_style(element);
        let visible = if own.display == Display::None {
            false
        } else {
            let parent = self.dom.parent(element);
            let parent_visible = !self.dom.is_element(parent) || self.is_visible(parent);
            // A hidden ancestor hides this element unless it resets visibility,
            // which markup-level styles never do for `display: none`.
            parent_visible && own.visibility != Visibility::Hidden
        };
        self.visible.insert(element, visible);
        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_parse() {
        let dom = parse_html("<html><body><p>Hello</p></body></html>");
        let p = dom.find_by_tag("p").expect("should find p");
        assert_eq!(dom.text_content(p), "Hello");
    }

    #[test]
    fn test_parse_xhtml_chapter() {
        let dom = parse_html(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>T</title></head>
<body><h1>One</h1><p>Some <em>marked</em> text.</p></body></html>"#,
        );
        let body = dom.find_by_tag("body").expect("body");
        assert!(dom.text_content(body).contains("Some marked text."));
    }

    #[test]
    fn test_inline_style_visibility() {
        let dom = parse_html(
            r#"<body>
                <p id="a">shown</p>
                <p id="b" style="display: none">gone</p>
                <div style="visibility:hidden"><p id="c">hidden</p></div>
                <p id="d" hidden>attr</p>
            </body>"#,
        );
        let mut cache = StyleCache::new(&dom);
        for (id, expected) in [("a", true), ("b", false), ("c", false), ("d", false)] {
            let node = dom.get_by_id(id).expect("node");
            assert_eq!(cache.is_visible(node), expected, "element {id}");
        }
    }

    #[test]
    fn test_non_rendered_elements_are_invisible() {
        let dom = parse_html("<html><head><title>Title</title></head><body></body></html>");
        let title = dom.find_by_tag("title").expect("title");
        let mut cache = StyleCache::new(&dom);
        assert!(!cache.is_visible(title));
    }
}
