//! Benchmarks for the reading pipeline.
//!
//! Run with: cargo bench

use criterion::{Criterion, criterion_group, criterion_main};

use lectern::{
    Book, Direction, Locator, ManualScheduler, MemoryPositionStore, ReadingSession, RenderOptions, Renderer, Settings,
    linearize, search,
};

const WORDS: &[&str] = &[
    "the", "whale", "sailed", "quietly,", "past", "an", "old", "café;", "nobody", "noticed.",
];

/// A book of `chapters` chapters with 40 paragraphs of 25 words each.
fn generated_book(chapters: usize) -> Book {
    let mut book = Book::new();
    for c in 0..chapters {
        let mut html = format!("<h2>Chapter {c}</h2>");
        for p in 0..40 {
            html.push_str("<p>");
            for w in 0..25 {
                if w > 0 {
                    html.push(' ');
                }
                html.push_str(WORDS[(c + p + w) % WORDS.len()]);
                if w % 7 == 3 {
                    html.push_str(&format!(" <em>word{p}x{w}</em>"));
                }
            }
            html.push_str("</p>");
        }
        book.add_chapter(format!("Chapter {c}"), format!("ch{c}.xhtml"), html);
    }
    book
}

// ============================================================================
// Render & Linearize
// ============================================================================

fn bench_render(c: &mut Criterion) {
    let book = generated_book(10);
    c.bench_function("render", |b| {
        b.iter(|| Renderer::new().render(&book, &RenderOptions::default()));
    });
}

fn bench_linearize(c: &mut Criterion) {
    let book = generated_book(10);
    let (tree, _) = Renderer::new().render(&book, &RenderOptions::default());
    c.bench_function("linearize", |b| {
        b.iter(|| linearize(&tree).unwrap());
    });
}

// ============================================================================
// Navigation
// ============================================================================

fn bench_locator_walk(c: &mut Criterion) {
    let book = generated_book(4);
    let (tree, _) = Renderer::new().render(&book, &RenderOptions::default());
    let stream = linearize(&tree).unwrap();
    c.bench_function("locator_walk", |b| {
        b.iter(|| {
            let locator = Locator::new(&stream, &tree);
            let mut ordinal = 0;
            while let Some(step) = locator.step(ordinal, Direction::Forward) {
                ordinal = step.ordinal;
            }
            ordinal
        });
    });
}

fn bench_playback(c: &mut Criterion) {
    let book = generated_book(2);
    c.bench_function("playback_to_end", |b| {
        b.iter(|| {
            let mut session = ReadingSession::new(ManualScheduler::new(), MemoryPositionStore::new(), Settings::default());
            session.open_document(book.id.clone());
            let (tree, _) = Renderer::new().render(&book, &RenderOptions::default());
            session.on_content_ready(tree).unwrap();
            session.toggle_play().unwrap();
            session.advance_time(u64::MAX / 2);
            session.current_ordinal()
        });
    });
}

// ============================================================================
// Search
// ============================================================================

fn bench_search(c: &mut Criterion) {
    let book = generated_book(10);
    let (tree, _) = Renderer::new().render(&book, &RenderOptions::default());
    let stream = linearize(&tree).unwrap();

    c.bench_function("search_common", |b| {
        b.iter(|| search(&tree, &stream, "whale"));
    });
    c.bench_function("search_folded", |b| {
        b.iter(|| search(&tree, &stream, "CAFE"));
    });
}

criterion_group!(
    benches,
    // Render & linearize
    bench_render,
    bench_linearize,
    // Navigation
    bench_locator_walk,
    bench_playback,
    // Search
    bench_search,
);
criterion_main!(benches);
