//! Render pass: a book's chapters assembled into one markup tree.
//!
//! The tree has a single `main` root holding one `article` per chapter, in
//! reading order. Each pass gets a new [`Generation`]; word ordinals are only
//! meaningful within the generation they were linearized from.
//!
//! A pass is built incrementally ([`RenderTree::begin`],
//! [`RenderTree::push_chapter`], [`RenderTree::finish`]). Until `finish`
//! returns the [`ContentReady`] signal the tree is not ready to linearize.

use tracing::debug;

use crate::book::Book;
use crate::dom::{ArenaDom, NodeData, NodeId, is_non_rendered_tag, parse_html};
use crate::segment::{Piece, segment};
use crate::settings::Settings;

/// Identifies one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Generation(pub u64);

/// Emitted when a render pass has produced all of its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentReady {
    pub document_id: String,
    pub generation: Generation,
}

/// Presentation choices that change the rendered markup.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderOptions {
    /// Bold the leading `fraction` of every word.
    pub bold_fraction: Option<f32>,
    /// Replace image sources with `data:` URLs of the packaged resource.
    pub inline_images: bool,
}

impl From<&Settings> for RenderOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            bold_fraction: settings
                .fast_reading_font
                .then_some(settings.fast_reading_fraction),
            inline_images: true,
        }
    }
}

/// Attribute carrying the chapter index on each `article`.
pub const CHAPTER_ATTR: &str = "data-chapter";

/// The rendered document.
#[derive(Debug, Clone)]
pub struct RenderTree {
    dom: ArenaDom,
    root: NodeId,
    articles: Vec<NodeId>,
    document_id: String,
    generation: Generation,
    ready: bool,
}

impl RenderTree {
    /// Start an empty pass for `document_id`.
    pub fn begin(document_id: impl Into<String>, generation: Generation) -> Self {
        let mut dom = ArenaDom::new();
        let root = dom.create_html_element("main", &[("id", "reader")]);
        dom.append(dom.document(), root);
        Self {
            dom,
            root,
            articles: Vec::new(),
            document_id: document_id.into(),
            generation,
            ready: false,
        }
    }

    /// Append the chapter at `index` as the next `article`.
    pub fn push_chapter(&mut self, book: &Book, index: usize, options: &RenderOptions) {
        let Some(chapter) = book.chapters.get(index) else {
            return;
        };
        let source = parse_html(&chapter.html);
        let index_attr = index.to_string();
        let article = self
            .dom
            .create_html_element("article", &[(CHAPTER_ATTR, index_attr.as_str())]);
        self.dom.append(self.root, article);

        let body = source.find_by_tag("body").unwrap_or(source.document());
        for child in source.children(body) {
            if source.tag_name(child).is_some_and(is_non_rendered_tag) {
                continue;
            }
            self.dom.import_subtree(&source, child, article);
        }

        if options.inline_images {
            self.inline_images(article, book);
        }
        if let Some(fraction) = options.bold_fraction {
            self.bold_prefixes(article, fraction);
        }
        self.articles.push(article);
    }

    /// Mark the pass complete.
    pub fn finish(&mut self) -> ContentReady {
        self.ready = true;
        debug!(
            document = %self.document_id,
            generation = self.generation.0,
            chapters = self.articles.len(),
            nodes = self.dom.len(),
            "render pass complete"
        );
        ContentReady {
            document_id: self.document_id.clone(),
            generation: self.generation,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn dom(&self) -> &ArenaDom {
        &self.dom
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Chapter articles in reading order.
    pub fn articles(&self) -> &[NodeId] {
        &self.articles
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Chapter index of the article containing `node`.
    pub fn chapter_of(&self, node: NodeId) -> Option<usize> {
        std::iter::once(node)
            .chain(self.dom.ancestors(node))
            .find_map(|id| self.articles.iter().position(|&a| a == id))
    }

    fn inline_images(&mut self, article: NodeId, book: &Book) {
        let images: Vec<NodeId> = self
            .dom
            .descendants(article)
            .filter(|&id| self.dom.tag_name(id) == Some("img"))
            .collect();
        for image in images {
            let Some(src) = self.dom.get_attr(image, "src") else {
                continue;
            };
            let Some(resource) = book.resource(src) else {
                debug!(src, "image resource not packaged");
                continue;
            };
            let url = resource.data_url();
            if let Some(node) = self.dom.get_mut(image)
                && let NodeData::Element { attrs, .. } = &mut node.data
                && let Some(attr) = attrs.iter_mut().find(|a| a.name.local.as_ref() == "src")
            {
                attr.value = url;
            }
        }
    }

    /// Replace each text node with bold-prefixed word pieces.
    fn bold_prefixes(&mut self, article: NodeId, fraction: f32) {
        let texts: Vec<NodeId> = self
            .dom
            .descendants(article)
            .filter(|&id| self.dom.text(id).is_some_and(|t| !t.trim().is_empty()))
            .filter(|&id| {
                !self
                    .dom
                    .ancestors(id)
                    .any(|a| matches!(self.dom.tag_name(a), Some("pre" | "code")))
            })
            .collect();

        for text_node in texts {
            let Some(text) = self.dom.text(text_node).map(str::to_owned) else {
                continue;
            };
            for piece in segment(&text, fraction) {
                match piece {
                    Piece::Space(space) => {
                        let node = self.dom.create_text(space.to_string());
                        self.dom.insert_before(text_node, node);
                    }
                    Piece::Word { bold, rest } => {
                        if !bold.is_empty() {
                            let b = self.dom.create_html_element("b", &[]);
                            self.dom.insert_before(text_node, b);
                            self.dom.append_text(b, bold);
                        }
                        if !rest.is_empty() {
                            let node = self.dom.create_text(rest.to_string());
                            self.dom.insert_before(text_node, node);
                        }
                    }
                }
            }
            self.dom.detach(text_node);
        }
    }
}

/// Hands out increasing generations and renders whole books.
#[derive(Debug, Default)]
pub struct Renderer {
    last: u64,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_generation(&mut self) -> Generation {
        self.last += 1;
        Generation(self.last)
    }

    /// Render every chapter of `book` in one pass.
    pub fn render(&mut self, book: &Book, options: &RenderOptions) -> (RenderTree, ContentReady) {
        let mut tree = RenderTree::begin(book.id.clone(), self.next_generation());
        for index in 0..book.chapters.len() {
            tree.push_chapter(book, index, options);
        }
        let ready = tree.finish();
        (tree, ready)
    }
}
