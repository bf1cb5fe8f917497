//! Fixtures shared by unit tests.

use crate::book::Book;
use crate::render::{ContentReady, RenderOptions, RenderTree, Renderer};
use crate::stream::{WordStream, linearize};

/// A book with one chapter per markup fragment.
pub(crate) fn book_from(chapters: &[&str]) -> Book {
    let mut book = Book::new();
    book.id = "doc".into();
    book.metadata.title = "Test".into();
    for (i, html) in chapters.iter().enumerate() {
        book.add_chapter(format!("Chapter {i}"), format!("ch{i}.xhtml"), *html);
    }
    book
}

pub(crate) fn render(chapters: &[&str]) -> (RenderTree, ContentReady) {
    Renderer::new().render(&book_from(chapters), &RenderOptions::default())
}

pub(crate) fn stream_for(chapters: &[&str]) -> WordStream {
    let (tree, _) = render(chapters);
    linearize(&tree).expect("linearize")
}
