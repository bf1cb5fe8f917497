//! Highlight projection: current word group → rectangles to paint.
//!
//! Geometry comes from whatever lays the document out, through the
//! [`Geometry`] trait. Rectangles are reported relative to the scrolling
//! container's content box, so they stay valid while the container scrolls.

mod layout;

pub use layout::MonospaceLayout;

use tracing::debug;

use crate::render::Generation;
use crate::stream::WordStream;

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn translate(self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }
}

/// Layout information supplied by the view.
pub trait Geometry {
    /// Viewport rectangle of word `ordinal` as laid out for `generation`, or
    /// `None` if that word is not laid out.
    fn word_rect(&self, generation: Generation, ordinal: usize) -> Option<Rect>;

    /// Viewport rectangle of the scrolling container.
    fn container_rect(&self) -> Rect;

    /// Current `(x, y)` scroll offset of the container.
    fn scroll_offset(&self) -> (f32, f32);
}

/// Highlight geometry for one word group.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub generation: Generation,
    /// First word of the group.
    pub ordinal: usize,
    /// One entry per word of the group; `None` where the word cannot be
    /// resolved.
    pub rects: Vec<Option<Rect>>,
}

impl Frame {
    /// Whether anything in the group can be drawn.
    pub fn is_visible(&self) -> bool {
        self.rects.iter().any(Option::is_some)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Ready {
    document_id: String,
    generation: Generation,
    len: usize,
}

/// Turns word positions into container-relative rectangles.
///
/// Inert until [`on_stream_ready`](Self::on_stream_ready) names the render
/// generation to project; until then, and after [`reset`](Self::reset),
/// every projection is `None`.
#[derive(Debug, Default)]
pub struct HighlightProjector {
    ready: Option<Ready>,
    last: Option<Frame>,
}

impl HighlightProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start projecting for the generation `stream` was linearized from.
    pub fn on_stream_ready(&mut self, stream: &WordStream) {
        let ready = Ready {
            document_id: stream.document_id().to_string(),
            generation: stream.generation(),
            len: stream.len(),
        };
        if self.ready.as_ref() != Some(&ready) {
            debug!(generation = ready.generation.0, words = ready.len, "highlight ready");
            self.last = None;
        }
        self.ready = Some(ready);
    }

    /// Forget the current document, e.g. on document switch.
    pub fn reset(&mut self) {
        self.ready = None;
        self.last = None;
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_some()
    }

    /// Document the projector is bound to.
    pub fn document_id(&self) -> Option<&str> {
        self.ready.as_ref().map(|r| r.document_id.as_str())
    }

    /// Container-relative rectangle of one word.
    pub fn rect_of(&self, geometry: &impl Geometry, ordinal: usize) -> Option<Rect> {
        let ready = self.ready.as_ref()?;
        if ordinal >= ready.len {
            return None;
        }
        let rect = geometry.word_rect(ready.generation, ordinal)?;
        let container = geometry.container_rect();
        let (scroll_x, scroll_y) = geometry.scroll_offset();
        Some(rect.translate(scroll_x - container.x, scroll_y - container.y))
    }

    /// Project the group of `group_size` words starting at `ordinal`.
    ///
    /// Call again after a position change or a viewport resize. The frame
    /// is kept and available from [`last_frame`](Self::last_frame).
    pub fn project(&mut self, geometry: &impl Geometry, ordinal: usize, group_size: usize) -> Option<&Frame> {
        let ready = self.ready.as_ref()?;
        if ordinal >= ready.len {
            self.last = None;
            return None;
        }
        let end = ordinal.saturating_add(group_size.max(1)).min(ready.len);
        let frame = Frame {
            generation: ready.generation,
            ordinal,
            rects: (ordinal..end).map(|o| self.rect_of(geometry, o)).collect(),
        };
        self.last = Some(frame);
        self.last.as_ref()
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.last.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::stream_for;

    /// Every word is a 10×20 box on one row, container at (100, 50).
    struct Row {
        generation: Generation,
        scroll: (f32, f32),
    }

    impl Geometry for Row {
        fn word_rect(&self, generation: Generation, ordinal: usize) -> Option<Rect> {
            (generation == self.generation).then(|| {
                Rect::new(100.0 + ordinal as f32 * 10.0 - self.scroll.0, 50.0 - self.scroll.1, 10.0, 20.0)
            })
        }

        fn container_rect(&self) -> Rect {
            Rect::new(100.0, 50.0, 500.0, 400.0)
        }

        fn scroll_offset(&self) -> (f32, f32) {
            self.scroll
        }
    }

    #[test]
    fn test_inert_until_ready() {
        let stream = stream_for(&["<p>a b c</p>"]);
        let geometry = Row {
            generation: stream.generation(),
            scroll: (0.0, 0.0),
        };
        let mut projector = HighlightProjector::new();
        assert!(projector.project(&geometry, 0, 1).is_none());
        projector.on_stream_ready(&stream);
        assert!(projector.project(&geometry, 0, 1).is_some());
    }

    #[test]
    fn test_rects_are_container_relative() {
        let stream = stream_for(&["<p>a b c d</p>"]);
        let mut projector = HighlightProjector::new();
        projector.on_stream_ready(&stream);

        let unscrolled = Row {
            generation: stream.generation(),
            scroll: (0.0, 0.0),
        };
        let scrolled = Row {
            generation: stream.generation(),
            scroll: (0.0, 300.0),
        };
        let a = projector.project(&unscrolled, 1, 2).cloned().expect("frame");
        let b = projector.project(&scrolled, 1, 2).cloned().expect("frame");
        assert_eq!(a, b);
        assert_eq!(a.rects, vec![Some(Rect::new(10.0, 0.0, 10.0, 20.0)), Some(Rect::new(20.0, 0.0, 10.0, 20.0))]);
    }

    #[test]
    fn test_group_is_clamped_to_document() {
        let stream = stream_for(&["<p>a b c</p>"]);
        let geometry = Row {
            generation: stream.generation(),
            scroll: (0.0, 0.0),
        };
        let mut projector = HighlightProjector::new();
        projector.on_stream_ready(&stream);
        assert_eq!(projector.project(&geometry, 2, 3).map(|f| f.rects.len()), Some(1));
        assert!(projector.project(&geometry, 3, 1).is_none());
        assert!(projector.last_frame().is_none());
    }

    #[test]
    fn test_stale_generation_resolves_to_none() {
        let stream = stream_for(&["<p>a b</p>"]);
        let geometry = Row {
            generation: Generation(stream.generation().0 + 1),
            scroll: (0.0, 0.0),
        };
        let mut projector = HighlightProjector::new();
        projector.on_stream_ready(&stream);
        let frame = projector.project(&geometry, 0, 2).expect("frame");
        assert!(!frame.is_visible());
    }

    #[test]
    fn test_reset_drops_document() {
        let stream = stream_for(&["<p>a</p>"]);
        let geometry = Row {
            generation: stream.generation(),
            scroll: (0.0, 0.0),
        };
        let mut projector = HighlightProjector::new();
        projector.on_stream_ready(&stream);
        projector.project(&geometry, 0, 1);
        projector.reset();
        assert!(projector.last_frame().is_none());
        assert!(projector.rect_of(&geometry, 0).is_none());
        assert_eq!(projector.document_id(), None);
    }
}
