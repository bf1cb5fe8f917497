//! The word stream: every word of a rendered document in reading order.
//!
//! Ordinals are dense (`0..len`) and only valid for the render generation
//! they came from. Positions that must survive a re-render go through an
//! [`Anchor`], which names a word by chapter, block and offset instead.

mod linearize;

pub use linearize::linearize;

use std::collections::HashMap;
use std::ops::Range;

use crate::dom::NodeId;
use crate::render::Generation;

/// Where part of a word's text lives in the render tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub node: NodeId,
    /// Byte range within the text node.
    pub range: Range<usize>,
}

/// The atomic navigable element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordUnit {
    pub ordinal: usize,
    pub text: String,
    pub trailing_punctuation: Option<char>,
    /// Last word of its block.
    pub is_paragraph_end: bool,
    /// First word of its chapter.
    pub is_chapter_start: bool,
    /// Index into [`WordStream::blocks`].
    pub block: usize,
    pub chapter: usize,
    /// One span per text node the word touches, in document order.
    pub spans: Vec<TextSpan>,
}

/// A run of consecutive words sharing the same nearest block element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub node: NodeId,
    pub chapter: usize,
    /// Position among the chapter's blocks.
    pub index_in_chapter: usize,
    /// Ordinals of the block's words.
    pub words: Range<usize>,
    /// Whitespace-collapsed text of the block element.
    pub text: String,
}

/// Content-relative position that survives relinearization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Anchor {
    pub chapter: usize,
    pub block_in_chapter: usize,
    pub word_in_block: usize,
}

/// Linearized words of one render generation.
#[derive(Debug, Clone, Default)]
pub struct WordStream {
    document_id: String,
    generation: Generation,
    units: Vec<WordUnit>,
    blocks: Vec<Block>,
    /// Ordinal of the first word of each chapter, `None` for empty chapters.
    chapter_starts: Vec<Option<usize>>,
    /// Reverse lookup: text node → (byte range, ordinal), sorted by range.
    by_node: HashMap<NodeId, Vec<(Range<usize>, usize)>>,
}

impl WordStream {
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn unit_at(&self, ordinal: usize) -> Option<&WordUnit> {
        self.units.get(ordinal)
    }

    pub fn units(&self) -> &[WordUnit] {
        &self.units
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block_of(&self, ordinal: usize) -> Option<&Block> {
        self.unit_at(ordinal).and_then(|u| self.blocks.get(u.block))
    }

    pub fn chapter_count(&self) -> usize {
        self.chapter_starts.len()
    }

    /// First word of chapter `index`, or of the next chapter that has words.
    pub fn chapter_start(&self, index: usize) -> Option<usize> {
        self.chapter_starts.get(index..)?.iter().flatten().next().copied()
    }

    /// Word at byte `offset` of text node `node`.
    ///
    /// An offset in whitespace resolves to the following word of that node,
    /// or the word after the node's last word.
    pub fn ordinal_at(&self, node: NodeId, offset: usize) -> Option<usize> {
        let entries = self.by_node.get(&node)?;
        if let Some((_, ordinal)) = entries.iter().find(|(range, _)| offset < range.end) {
            return Some(*ordinal);
        }
        let last = entries.last()?.1;
        Some((last + 1).min(self.len().saturating_sub(1)))
    }

    /// `size` words starting at `ordinal`, joined by single spaces.
    pub fn group_text(&self, ordinal: usize, size: usize) -> Option<String> {
        let end = ordinal.saturating_add(size.max(1)).min(self.len());
        let words = self.units.get(ordinal..end)?;
        if words.is_empty() {
            return None;
        }
        Some(
            words
                .iter()
                .map(|u| u.text.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        )
    }

    pub fn anchor_of(&self, ordinal: usize) -> Option<Anchor> {
        let unit = self.unit_at(ordinal)?;
        let block = self.blocks.get(unit.block)?;
        Some(Anchor {
            chapter: block.chapter,
            block_in_chapter: block.index_in_chapter,
            word_in_block: ordinal - block.words.start,
        })
    }

    /// Ordinal for `anchor` in this generation.
    ///
    /// Falls back to the nearest earlier word when the exact block or word no
    /// longer exists, and to the chapter start when the chapter lost all
    /// of its earlier blocks.
    pub fn resolve(&self, anchor: &Anchor) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let in_chapter = |b: &&Block| b.chapter == anchor.chapter;
        let block = self
            .blocks
            .iter()
            .filter(in_chapter)
            .take_while(|b| b.index_in_chapter <= anchor.block_in_chapter)
            .last();
        match block {
            Some(block) if block.index_in_chapter == anchor.block_in_chapter => {
                Some((block.words.start + anchor.word_in_block).min(block.words.end - 1))
            }
            Some(block) => Some(block.words.end - 1),
            None => self
                .chapter_start(anchor.chapter)
                .or_else(|| Some(self.len() - 1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::stream_for;

    #[test]
    fn test_group_text() {
        let stream = stream_for(&["<p>one two three four five six seven eight nine ten</p>"]);
        assert_eq!(stream.group_text(0, 3).as_deref(), Some("one two three"));
        assert_eq!(stream.group_text(8, 3).as_deref(), Some("nine ten"));
        assert_eq!(stream.group_text(10, 3), None);
    }

    #[test]
    fn test_chapter_start_skips_empty_chapters() {
        let stream = stream_for(&["<p>a b</p>", "<p> </p>", "<p>c</p>"]);
        assert_eq!(stream.chapter_count(), 3);
        assert_eq!(stream.chapter_start(0), Some(0));
        assert_eq!(stream.chapter_start(1), Some(2));
        assert_eq!(stream.chapter_start(2), Some(2));
        assert_eq!(stream.chapter_start(3), None);
    }

    #[test]
    fn test_anchor_round_trip() {
        let stream = stream_for(&["<p>a b</p><p>c d e</p>", "<p>f g</p>"]);
        for ordinal in 0..stream.len() {
            let anchor = stream.anchor_of(ordinal).expect("anchor");
            assert_eq!(stream.resolve(&anchor), Some(ordinal));
        }
        assert_eq!(
            stream.anchor_of(3),
            Some(Anchor {
                chapter: 0,
                block_in_chapter: 1,
                word_in_block: 1
            })
        );
    }

    #[test]
    fn test_anchor_survives_inserted_chapter_content() {
        let before = stream_for(&["<p>a b</p><p>c d e</p>"]);
        let after = stream_for(&["<p>a b</p><p>c d e</p><p>appended</p>"]);
        let anchor = before.anchor_of(4).expect("anchor");
        assert_eq!(after.resolve(&anchor), Some(4));
    }

    #[test]
    fn test_resolve_clamps_missing_positions() {
        let stream = stream_for(&["<p>a b</p><p>c</p>"]);
        let past_block = Anchor {
            chapter: 0,
            block_in_chapter: 1,
            word_in_block: 9,
        };
        assert_eq!(stream.resolve(&past_block), Some(2));
        let past_chapter = Anchor {
            chapter: 0,
            block_in_chapter: 5,
            word_in_block: 0,
        };
        assert_eq!(stream.resolve(&past_chapter), Some(2));
    }
}
