//! # lectern
//!
//! EPUB reader core with a paced, word-by-word sequential reading engine.
//!
//! ## Features
//!
//! - Import EPUB 2/3 files: metadata, cover, chapters, table of contents,
//!   packaged resources, Markdown renditions of every chapter
//! - Render a book into a single markup tree and linearize it into a dense
//!   [`WordStream`]
//! - Drive a [`ReadingSession`]: auto-advance with punctuation and paragraph
//!   aware pacing, manual stepping, held continuous movement, chapter jumps
//!   and resumable positions
//! - Project the highlighted word group onto layout geometry
//! - Diacritic-insensitive in-document search with context previews
//!
//! ## Quick Start
//!
//! ```no_run
//! use lectern::{
//!     ManualScheduler, MemoryPositionStore, ReadingSession, RenderOptions, Renderer, Settings,
//! };
//!
//! let book = lectern::parse_book("input.epub").unwrap();
//! let settings = Settings::default();
//!
//! let mut session = ReadingSession::new(ManualScheduler::new(), MemoryPositionStore::new(), settings.clone());
//! session.open_document(book.id.clone());
//!
//! let (tree, _ready) = Renderer::new().render(&book, &RenderOptions::from(&settings));
//! session.on_content_ready(tree).unwrap();
//!
//! session.toggle_play().unwrap();
//! session.advance_time(1_000);
//! println!("{:?}", session.current_word_group());
//! ```
//!
//! ## Searching
//!
//! ```
//! use lectern::{Book, RenderOptions, Renderer, linearize, search};
//!
//! let mut book = Book::new();
//! book.add_chapter("One", "one.xhtml", "<p>The cat sat on the mat.</p>");
//!
//! let (tree, _) = Renderer::new().render(&book, &RenderOptions::default());
//! let stream = linearize(&tree).unwrap();
//! let hits = search(&tree, &stream, "cat");
//! assert_eq!(hits[0].preview, "The <mark>cat</mark> sat on the");
//! ```

pub mod book;
pub mod dom;
pub mod epub;
pub mod error;
pub mod highlight;
pub mod locator;
pub mod markdown;
pub mod pacing;
pub mod position;
pub mod render;
pub mod scheduler;
pub mod search;
pub mod segment;
pub mod session;
pub mod settings;
pub mod stream;
pub(crate) mod util;

#[cfg(test)]
mod test_support;

pub use book::{Book, Chapter, Metadata, Resource, TocEntry};
pub use epub::{ImportResult, import_batch, parse_book, parse_book_bytes};
pub use error::{Error, Result};
pub use highlight::{Frame, Geometry, HighlightProjector, MonospaceLayout, Rect};
pub use locator::{Direction, Locator, Step};
pub use pacing::PacingConfig;
pub use position::{JsonPositionStore, MemoryPositionStore, PositionStore, ReadingPosition};
pub use render::{ContentReady, Generation, RenderOptions, RenderTree, Renderer};
pub use scheduler::{ClockScheduler, ManualScheduler, Scheduler, TimerKind, TimerToken};
pub use search::{SearchResult, SearchSession, search};
pub use session::{PlaybackState, ReadingSession, SessionEvent, StopReason};
pub use settings::{ScrollAlignment, Settings};
pub use stream::{Anchor, WordStream, WordUnit, linearize};
