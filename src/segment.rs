//! Text segmentation shared by the linearizer and the renderer.
//!
//! A word is a maximal run of non-whitespace characters. Nothing in here
//! knows about markup.

use std::ops::Range;

/// Byte ranges of the words in `text`.
pub fn word_ranges(text: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                ranges.push(s..i);
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        ranges.push(s..text.len());
    }
    ranges
}

/// Last character of `word` when it is punctuation.
pub fn trailing_punctuation(word: &str) -> Option<char> {
    word.chars()
        .next_back()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
}

/// Byte length of the bold prefix of `word`: `ceil(chars × fraction)`
/// characters.
pub fn bold_prefix_len(word: &str, fraction: f32) -> usize {
    let chars = word.chars().count();
    let bold_chars = ((chars as f32) * fraction.clamp(0.0, 1.0)).ceil() as usize;
    word.char_indices()
        .nth(bold_chars.min(chars))
        .map(|(i, _)| i)
        .unwrap_or(word.len())
}

/// Split `word` into its bold prefix and the rest.
pub fn split_bold(word: &str, fraction: f32) -> (&str, &str) {
    word.split_at(bold_prefix_len(word, fraction))
}

/// One piece of partially bolded text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Piece<'a> {
    Space(&'a str),
    Word { bold: &'a str, rest: &'a str },
}

/// Segment `text` into whitespace and words with bold prefixes.
pub fn segment(text: &str, fraction: f32) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut cursor = 0;
    for range in word_ranges(text) {
        if range.start > cursor {
            pieces.push(Piece::Space(&text[cursor..range.start]));
        }
        let (bold, rest) = split_bold(&text[range.clone()], fraction);
        pieces.push(Piece::Word { bold, rest });
        cursor = range.end;
    }
    if cursor < text.len() {
        pieces.push(Piece::Space(&text[cursor..]));
    }
    pieces
}
