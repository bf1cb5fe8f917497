//! Next/previous word navigation over a [`WordStream`].
//!
//! Inside a block the neighbour is simply the adjacent ordinal. Crossing out
//! of a block searches later (or earlier) blocks in document order for the
//! nearest visible word, skipping blocks that repeat the current block's
//! text.

use crate::dom::{ArenaDom, StyleCache};
use crate::render::RenderTree;
use crate::stream::{Block, WordStream};

/// Navigation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
}

/// Result of one locator hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Where the hop landed.
    pub ordinal: usize,
    /// Punctuation that paces this hop.
    ///
    /// Forward hops report the trailing punctuation of the word being left;
    /// backward hops report that of the word landed on.
    pub punctuation: Option<char>,
    /// The hop left its block.
    pub crossed_paragraph: bool,
}

/// Word locator bound to one render generation.
#[derive(Clone, Copy)]
pub struct Locator<'a> {
    stream: &'a WordStream,
    dom: &'a ArenaDom,
}

impl<'a> Locator<'a> {
    pub fn new(stream: &'a WordStream, tree: &'a RenderTree) -> Self {
        Self {
            stream,
            dom: tree.dom(),
        }
    }

    pub fn step(&self, ordinal: usize, direction: Direction) -> Option<Step> {
        match direction {
            Direction::Forward => self.next(ordinal),
            Direction::Backward => self.previous(ordinal),
        }
    }

    /// The word after `ordinal`, or `None` at the end of the document.
    pub fn next(&self, ordinal: usize) -> Option<Step> {
        let unit = self.stream.unit_at(ordinal)?;
        let punctuation = unit.trailing_punctuation;

        if let Some(next) = self.stream.unit_at(ordinal + 1)
            && next.block == unit.block
        {
            return Some(Step {
                ordinal: ordinal + 1,
                punctuation,
                crossed_paragraph: false,
            });
        }

        let blocks = self.stream.blocks();
        let current = blocks.get(unit.block)?;
        let mut styles = StyleCache::new(self.dom);
        blocks
            .get(unit.block + 1..)?
            .iter()
            .filter(|block| is_candidate(block, current))
            .find_map(|block| block.words.clone().find(|&o| self.is_visible(&mut styles, o)))
            .map(|ordinal| Step {
                ordinal,
                punctuation,
                crossed_paragraph: true,
            })
    }

    /// The word before `ordinal`, or `None` at the start of the document.
    pub fn previous(&self, ordinal: usize) -> Option<Step> {
        let unit = self.stream.unit_at(ordinal)?;

        if let Some(prev) = ordinal.checked_sub(1).and_then(|o| self.stream.unit_at(o))
            && prev.block == unit.block
        {
            return Some(Step {
                ordinal: ordinal - 1,
                punctuation: prev.trailing_punctuation,
                crossed_paragraph: false,
            });
        }

        let blocks = self.stream.blocks();
        let current = blocks.get(unit.block)?;
        let mut styles = StyleCache::new(self.dom);
        let landed = blocks
            .get(..unit.block)?
            .iter()
            .rev()
            .filter(|block| is_candidate(block, current))
            .find_map(|block| {
                block
                    .words
                    .clone()
                    .rev()
                    .find(|&o| self.is_visible(&mut styles, o))
            })?;
        Some(Step {
            ordinal: landed,
            punctuation: self.stream.unit_at(landed)?.trailing_punctuation,
            crossed_paragraph: true,
        })
    }

    fn is_visible(&self, styles: &mut StyleCache<'_>, ordinal: usize) -> bool {
        self.stream
            .unit_at(ordinal)
            .and_then(|u| u.spans.first())
            .is_none_or(|span| styles.is_visible(span.node))
    }
}

fn is_candidate(block: &Block, current: &Block) -> bool {
    !block.text.is_empty() && block.text != current.text
}
