//! HTML → Markdown conversion of chapter content.
//!
//! Chapters keep their original markup for rendering; the Markdown rendition
//! is what the CLI prints and what plain-text consumers store.
//!
//! - [`escape`]: escaping and code-fence sizing
//! - [`render`]: the tree walker

mod escape;
mod render;

pub use escape::{calculate_fence_length, calculate_inline_code_ticks, escape_inline, escape_markdown};
pub use render::{RenderContext, html_to_markdown};
