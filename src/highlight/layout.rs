use super::{Geometry, Rect};
use crate::render::Generation;
use crate::settings::ScrollAlignment;
use crate::stream::WordStream;

/// Fixed-pitch reference layout of a word stream.
///
/// Words flow left to right and wrap at `columns` characters; a paragraph
/// end is followed by one blank line. Used by terminal front ends and for
/// exercising the projector without a real layout engine.
#[derive(Debug, Clone)]
pub struct MonospaceLayout {
    generation: Generation,
    /// Character length and paragraph-end flag of every word.
    words: Vec<(usize, bool)>,
    /// `(line, column)` of every word.
    positions: Vec<(usize, usize)>,
    lines: usize,
    columns: usize,
    char_width: f32,
    line_height: f32,
    origin: (f32, f32),
    viewport_height: f32,
    scroll_y: f32,
}

impl MonospaceLayout {
    pub fn new(stream: &WordStream, columns: usize) -> Self {
        let words = stream
            .units()
            .iter()
            .map(|u| (u.text.chars().count(), u.is_paragraph_end))
            .collect();
        let mut layout = Self {
            generation: stream.generation(),
            words,
            positions: Vec::new(),
            lines: 0,
            columns: columns.max(1),
            char_width: 8.0,
            line_height: 16.0,
            origin: (0.0, 0.0),
            viewport_height: 480.0,
            scroll_y: 0.0,
        };
        layout.reflow();
        layout
    }

    pub fn with_metrics(mut self, char_width: f32, line_height: f32) -> Self {
        self.char_width = char_width;
        self.line_height = line_height;
        self
    }

    /// Place the container at `(x, y)` in the viewport.
    pub fn with_origin(mut self, x: f32, y: f32) -> Self {
        self.origin = (x, y);
        self
    }

    pub fn with_viewport_height(mut self, height: f32) -> Self {
        self.viewport_height = height;
        self
    }

    /// Rewrap for a new container width.
    pub fn resize(&mut self, columns: usize) {
        self.columns = columns.max(1);
        self.reflow();
    }

    pub fn scroll_to(&mut self, y: f32) {
        self.scroll_y = y.max(0.0);
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn line_count(&self) -> usize {
        self.lines
    }

    pub fn line_of(&self, ordinal: usize) -> Option<usize> {
        self.positions.get(ordinal).map(|&(line, _)| line)
    }

    /// Scroll offset that brings `ordinal` into view with `alignment`.
    pub fn scroll_for(&self, ordinal: usize, alignment: ScrollAlignment) -> Option<f32> {
        let top = self.line_of(ordinal)? as f32 * self.line_height;
        let slack = (self.viewport_height - self.line_height).max(0.0);
        let offset = match alignment {
            ScrollAlignment::Start => top,
            ScrollAlignment::Center => top - slack / 2.0,
            ScrollAlignment::End => top - slack,
            ScrollAlignment::Nearest => {
                if top < self.scroll_y {
                    top
                } else if top > self.scroll_y + slack {
                    top - slack
                } else {
                    self.scroll_y
                }
            }
        };
        Some(offset.max(0.0))
    }

    fn reflow(&mut self) {
        self.positions.clear();
        let (mut line, mut column) = (0, 0);
        for &(len, paragraph_end) in &self.words {
            if column > 0 && column + 1 + len > self.columns {
                line += 1;
                column = 0;
            }
            if column > 0 {
                column += 1;
            }
            self.positions.push((line, column));
            column += len;
            if paragraph_end {
                line += 2;
                column = 0;
            }
        }
        self.lines = self.positions.last().map_or(0, |&(line, _)| line + 1);
    }
}

impl Geometry for MonospaceLayout {
    fn word_rect(&self, generation: Generation, ordinal: usize) -> Option<Rect> {
        if generation != self.generation {
            return None;
        }
        let &(line, column) = self.positions.get(ordinal)?;
        let &(len, _) = self.words.get(ordinal)?;
        Some(Rect::new(
            self.origin.0 + column as f32 * self.char_width,
            self.origin.1 + line as f32 * self.line_height - self.scroll_y,
            len as f32 * self.char_width,
            self.line_height,
        ))
    }

    fn container_rect(&self) -> Rect {
        Rect::new(
            self.origin.0,
            self.origin.1,
            self.columns as f32 * self.char_width,
            self.viewport_height,
        )
    }

    fn scroll_offset(&self) -> (f32, f32) {
        (0.0, self.scroll_y)
    }
}
