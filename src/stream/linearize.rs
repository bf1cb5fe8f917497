use tracing::debug;

use super::{Block, TextSpan, WordStream, WordUnit};
use crate::dom::{ArenaDom, NodeData, NodeId, is_block_tag, is_non_rendered_tag};
use crate::error::{Error, Result};
use crate::render::RenderTree;
use crate::segment::{trailing_punctuation, word_ranges};

/// Elements that end the word in progress without starting a block.
fn breaks_words(tag: &str) -> bool {
    matches!(tag, "br" | "img" | "input" | "select" | "textarea" | "video" | "audio" | "svg")
}

/// Linearize a finished render pass into a [`WordStream`].
///
/// Words are whitespace-delimited and may span inline markup: `<b>Sec</b>ond`
/// is one word. Every word belongs to its nearest enclosing block element.
/// Calling this twice on the same tree yields identical streams.
///
/// Returns [`Error::NotReady`] when the pass has not signalled
/// [`ContentReady`](crate::render::ContentReady) yet.
pub fn linearize(tree: &RenderTree) -> Result<WordStream> {
    if !tree.is_ready() {
        debug!(generation = tree.generation().0, "linearize before content ready");
        return Err(Error::NotReady);
    }

    let mut builder = Builder {
        dom: tree.dom(),
        stream: WordStream {
            document_id: tree.document_id().to_string(),
            generation: tree.generation(),
            ..WordStream::default()
        },
        chapter: 0,
        blocks_in_chapter: 0,
        pending: None,
    };
    for (chapter, &article) in tree.articles().iter().enumerate() {
        builder.chapter = chapter;
        builder.blocks_in_chapter = 0;
        builder.stream.chapter_starts.push(None);
        builder.walk(article, article);
        builder.flush();
    }

    let mut stream = builder.stream;
    for block in &stream.blocks {
        if let Some(last) = stream.units.get_mut(block.words.end - 1) {
            last.is_paragraph_end = true;
        }
    }
    debug!(
        generation = stream.generation.0,
        words = stream.units.len(),
        blocks = stream.blocks.len(),
        "linearized"
    );
    Ok(stream)
}

struct PendingWord {
    text: String,
    spans: Vec<TextSpan>,
    block: NodeId,
}

struct Builder<'a> {
    dom: &'a ArenaDom,
    stream: WordStream,
    chapter: usize,
    blocks_in_chapter: usize,
    pending: Option<PendingWord>,
}

impl Builder<'_> {
    fn walk(&mut self, parent: NodeId, block: NodeId) {
        let dom = self.dom;
        for child in dom.children(parent) {
            let Some(node) = dom.get(child) else {
                continue;
            };
            match &node.data {
                NodeData::Text(text) => self.text(child, text, block),
                NodeData::Element { name, .. } => {
                    let tag = name.local.as_ref();
                    if is_non_rendered_tag(tag) || breaks_words(tag) {
                        self.flush();
                    } else if is_block_tag(tag) {
                        self.flush();
                        self.walk(child, child);
                        self.flush();
                    } else {
                        self.walk(child, block);
                    }
                }
                NodeData::Document | NodeData::Other => {}
            }
        }
    }

    fn text(&mut self, node: NodeId, text: &str, block: NodeId) {
        let ranges = word_ranges(text);
        if ranges.first().is_none_or(|r| r.start > 0) {
            self.flush();
        }
        let count = ranges.len();
        for (i, range) in ranges.into_iter().enumerate() {
            if i > 0 {
                self.flush();
            }
            let pending = self.pending.get_or_insert_with(|| PendingWord {
                text: String::new(),
                spans: Vec::new(),
                block,
            });
            pending.text.push_str(&text[range.clone()]);
            pending.spans.push(TextSpan { node, range: range.clone() });
            if i + 1 == count && range.end < text.len() {
                self.flush();
            }
        }
    }

    fn flush(&mut self) {
        let Some(word) = self.pending.take() else {
            return;
        };
        let ordinal = self.stream.units.len();
        let stream = &mut self.stream;

        let continues_block = stream.blocks.last().is_some_and(|b| {
            b.node == word.block && b.chapter == self.chapter && b.words.end == ordinal
        });
        if continues_block {
            if let Some(block) = stream.blocks.last_mut() {
                block.words.end = ordinal + 1;
            }
        } else {
            stream.blocks.push(Block {
                node: word.block,
                chapter: self.chapter,
                index_in_chapter: self.blocks_in_chapter,
                words: ordinal..ordinal + 1,
                text: collapse(&self.dom.text_content(word.block)),
            });
            self.blocks_in_chapter += 1;
        }

        let chapter_start = &mut stream.chapter_starts[self.chapter];
        let is_chapter_start = chapter_start.is_none();
        if is_chapter_start {
            *chapter_start = Some(ordinal);
        }

        for span in &word.spans {
            stream
                .by_node
                .entry(span.node)
                .or_default()
                .push((span.range.clone(), ordinal));
        }

        stream.units.push(WordUnit {
            ordinal,
            trailing_punctuation: trailing_punctuation(&word.text),
            text: word.text,
            is_paragraph_end: false,
            is_chapter_start,
            block: stream.blocks.len() - 1,
            chapter: self.chapter,
            spans: word.spans,
        });
    }
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
