//! In-document search.
//!
//! Queries and text are folded (decomposed, diacritics stripped,
//! lower-cased) before matching, and every hit is mapped back to the
//! original text for display. A hit carries up to [`CONTEXT_WORDS`] words
//! of context on each side.

mod normalize;
mod session;

pub use normalize::{Folded, fold, fold_query};
pub use session::{DEBOUNCE_MS, SearchSession};

use std::ops::Range;

use regex_lite::Regex;
use tracing::{debug, warn};

use crate::dom::{ArenaDom, NodeId, is_non_rendered_tag, is_structural_tag};
use crate::render::{Generation, RenderTree};
use crate::stream::WordStream;

/// Words of context kept on each side of a match.
pub const CONTEXT_WORDS: usize = 3;

const MARK_OPEN: &str = "<mark>";
const MARK_CLOSE: &str = "</mark>";

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// The match with its context, as it appears in the document.
    pub matched_text: String,
    /// `matched_text` with the query span wrapped in `<mark>`, trimmed.
    pub preview: String,
    /// Block element containing the match.
    pub block: NodeId,
    pub chapter: usize,
    /// Byte range of the query span in the block's text content.
    pub range: Range<usize>,
    /// First word of the query span, when it is part of the word stream.
    pub ordinal: Option<usize>,
    pub generation: Generation,
}

/// Text of one searchable block.
struct BlockText {
    node: NodeId,
    chapter: usize,
    text: String,
    /// Start offset in `text` of each contributing text node.
    pieces: Vec<(usize, NodeId)>,
}

impl BlockText {
    fn new(dom: &ArenaDom, node: NodeId, chapter: usize) -> Self {
        let mut text = String::new();
        let mut pieces = Vec::new();
        for id in dom.descendants(node) {
            if let Some(t) = dom.text(id) {
                pieces.push((text.len(), id));
                text.push_str(t);
            }
        }
        Self {
            node,
            chapter,
            text,
            pieces,
        }
    }

    /// Text node and local offset for byte `offset` of the block text.
    fn locate(&self, offset: usize) -> Option<(NodeId, usize)> {
        let index = self.pieces.partition_point(|&(start, _)| start <= offset);
        let (start, node) = *self.pieces.get(index.checked_sub(1)?)?;
        Some((node, offset - start))
    }
}

/// Searchable blocks in document order: the children of each chapter,
/// looking through structural wrappers.
fn collect_blocks(tree: &RenderTree) -> Vec<BlockText> {
    fn visit(dom: &ArenaDom, parent: NodeId, chapter: usize, out: &mut Vec<BlockText>) {
        for child in dom.children(parent) {
            let Some(tag) = dom.tag_name(child) else {
                continue;
            };
            if is_non_rendered_tag(tag) {
                continue;
            }
            if is_structural_tag(tag) {
                visit(dom, child, chapter, out);
            } else {
                out.push(BlockText::new(dom, child, chapter));
            }
        }
    }

    let mut blocks = Vec::new();
    for (chapter, &article) in tree.articles().iter().enumerate() {
        visit(tree.dom(), article, chapter, &mut blocks);
    }
    blocks
}

fn context_pattern(query: &str) -> String {
    format!(
        r"(?:\S*\s*){{0,{n}}}({q})(?:\s*\S*){{0,{n}}}",
        n = CONTEXT_WORDS,
        q = regex_lite::escape(query)
    )
}

/// Find every occurrence of `query` in the rendered document.
///
/// `stream` must come from the same render generation as `tree`; it is used
/// to attach word ordinals to hits.
pub fn search(tree: &RenderTree, stream: &WordStream, query: &str) -> Vec<SearchResult> {
    let folded_query = fold_query(query);
    if folded_query.is_empty() {
        return Vec::new();
    }
    let regex = match Regex::new(&context_pattern(&folded_query)) {
        Ok(regex) => regex,
        Err(e) => {
            warn!(query, error = %e, "invalid search pattern");
            return Vec::new();
        }
    };

    let mut results = Vec::new();
    for block in collect_blocks(tree) {
        let folded = fold(&block.text);
        for caps in regex.captures_iter(&folded.text) {
            let (Some(full), Some(hit)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let (Some(full), Some(hit)) = (
                folded.source_range(full.start(), full.end()),
                folded.source_range(hit.start(), hit.end()),
            ) else {
                continue;
            };

            let source = &block.text;
            let preview = format!(
                "{}{MARK_OPEN}{}{MARK_CLOSE}{}",
                &source[full.start..hit.start],
                &source[hit.clone()],
                &source[hit.end..full.end]
            );
            let ordinal = block
                .locate(hit.start)
                .and_then(|(node, offset)| stream.ordinal_at(node, offset));

            results.push(SearchResult {
                matched_text: source[full].to_string(),
                preview: preview.trim().to_string(),
                block: block.node,
                chapter: block.chapter,
                range: hit,
                ordinal,
                generation: tree.generation(),
            });
        }
    }
    debug!(query, results = results.len(), "search complete");
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::linearize;
    use crate::test_support::render;

    fn run(chapters: &[&str], query: &str) -> Vec<SearchResult> {
        let (tree, _) = render(chapters);
        let stream = linearize(&tree).expect("linearize");
        search(&tree, &stream, query)
    }

    #[test]
    fn test_context_window() {
        let results = run(&["<p>The cat sat on the mat.</p>"], "cat");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].preview, "The <mark>cat</mark> sat on the");
        assert_eq!(results[0].matched_text, "The cat sat on the");
        assert_eq!(results[0].ordinal, Some(1));
    }

    #[test]
    fn test_context_is_limited_to_three_words() {
        let results = run(&["<p>one two three four five needle six seven eight nine</p>"], "needle");
        assert_eq!(results[0].preview, "three four five <mark>needle</mark> six seven eight");
    }

    #[test]
    fn test_case_and_diacritic_insensitive() {
        let results = run(&["<p>Un café crème, s'il vous plaît.</p>"], "CAFE");
        assert_eq!(results.len(), 1);
        assert!(results[0].preview.contains("<mark>café</mark>"));
    }

    #[test]
    fn test_every_occurrence_is_reported() {
        let results = run(&["<p>a cat</p><p>no match</p>", "<p>another cat</p>"], "cat");
        let chapters: Vec<usize> = results.iter().map(|r| r.chapter).collect();
        assert_eq!(chapters, vec![0, 1]);
        assert_eq!(results[1].ordinal, Some(5));
    }

    #[test]
    fn test_query_is_literal() {
        assert!(run(&["<p>abc</p>"], "a.c").is_empty());
        assert_eq!(run(&["<p>what (a.c) is</p>"], "(a.c)").len(), 1);
    }

    #[test]
    fn test_match_across_inline_markup() {
        let results = run(&["<div><p>big <em>red</em> dog</p></div>"], "red dog");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].preview, "big <mark>red dog</mark>");
        assert_eq!(results[0].ordinal, Some(1));
    }

    #[test]
    fn test_empty_query() {
        assert!(run(&["<p>anything</p>"], "   ").is_empty());
    }
}
