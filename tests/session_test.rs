mod common;

use common::sample_book;
use lectern::search::DEBOUNCE_MS;
use lectern::{
    Book, JsonPositionStore, ManualScheduler, PlaybackState, PositionStore, ReadingSession, RenderOptions, Renderer,
    Scheduler, SearchSession, SessionEvent, Settings, StopReason, TimerKind, parse_book_bytes,
};
use tempfile::TempDir;

type Session = ReadingSession<ManualScheduler, JsonPositionStore>;

fn book() -> Book {
    parse_book_bytes(&sample_book().build(), None).expect("parse")
}

fn open_session(book: &Book, store: JsonPositionStore) -> Session {
    let mut session = ReadingSession::new(ManualScheduler::new(), store, Settings::default());
    session.open_document(book.id.clone());
    let (tree, ready) = Renderer::new().render(book, &RenderOptions::default());
    assert_eq!(ready.document_id, book.id);
    session.on_content_ready(tree).expect("content");
    session.drain_events();
    session
}

#[test]
fn test_playback_paces_punctuation_and_paragraphs() {
    let dir = TempDir::new().expect("tempdir");
    let book = book();
    let store = JsonPositionStore::open(dir.path().join("positions.json")).expect("store");
    let mut session = open_session(&book, store);

    assert_eq!(session.current_word_group().as_deref(), Some("Opening"));
    session.toggle_play().expect("play");

    // "Opening" ends the heading: 200 + 1000
    session.advance_time(1199);
    assert_eq!(session.current_ordinal(), 0);
    session.advance_time(1);
    assert_eq!(session.current_word_group().as_deref(), Some("Hello,"));

    // comma: 200 + 150
    session.advance_time(349);
    assert_eq!(session.current_ordinal(), 1);
    session.advance_time(1);
    assert_eq!(session.current_word_group().as_deref(), Some("world."));

    // paragraph crossing wins over the '.' pause
    session.advance_time(1199);
    assert_eq!(session.current_ordinal(), 2);
    session.advance_time(1);
    assert_eq!(session.current_word_group().as_deref(), Some("New"));
    assert_eq!(session.scheduler().pending(TimerKind::Advance), 1);
}

#[test]
fn test_plays_to_end_of_book() {
    let dir = TempDir::new().expect("tempdir");
    let book = book();
    let store = JsonPositionStore::open(dir.path().join("positions.json")).expect("store");
    let mut session = open_session(&book, store);

    session.toggle_play().expect("play");
    session.advance_time(60_000);

    let last = session.stream().expect("stream").len() - 1;
    assert_eq!(session.current_ordinal(), last);
    assert_eq!(session.current_word_group().as_deref(), Some("mat."));
    assert_eq!(session.state(), PlaybackState::Stopped);
    assert!(session.drain_events().contains(&SessionEvent::PlaybackStopped {
        reason: StopReason::EndOfDocument
    }));
    assert_eq!(session.positions().get_last_position(&book.id), Some(last));
}

#[test]
fn test_position_survives_reopen() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("positions.json");
    let book = book();

    {
        let mut session = open_session(&book, JsonPositionStore::open(&path).expect("store"));
        session.step_forward().expect("step");
        session.step_forward().expect("step");
        session.close();
    }
    assert!(path.exists());

    let session = open_session(&book, JsonPositionStore::open(&path).expect("store"));
    assert_eq!(session.current_ordinal(), 2);
    assert_eq!(session.current_word_group().as_deref(), Some("world."));
    assert_eq!(session.state(), PlaybackState::Stopped);
}

#[test]
fn test_chapter_jump_starts_playback() {
    let dir = TempDir::new().expect("tempdir");
    let book = book();
    let store = JsonPositionStore::open(dir.path().join("positions.json")).expect("store");
    let mut session = open_session(&book, store);

    session.jump_to(0, Some(1)).expect("jump");
    assert_eq!(session.current_word_group().as_deref(), Some("The"));
    assert!(session.is_playing());
    assert_eq!(session.scheduler().pending(TimerKind::Advance), 1);
}

#[test]
fn test_debounced_search_then_select() {
    let dir = TempDir::new().expect("tempdir");
    let book = book();
    let store = JsonPositionStore::open(dir.path().join("positions.json")).expect("store");
    let mut session = open_session(&book, store);
    let mut search = SearchSession::new();

    search.input("ca", session.scheduler_mut());
    search.input("cat", session.scheduler_mut());
    assert_eq!(session.scheduler().pending(TimerKind::SearchDebounce), 1);

    session.scheduler_mut().advance(DEBOUNCE_MS);
    let fired = session.pump();
    assert_eq!(fired.len(), 1);

    let results = {
        let tree = session.tree().expect("tree");
        let stream = session.stream().expect("stream");
        search
            .on_timer(fired[0].token, tree, stream)
            .expect("debounced search")
            .to_vec()
    };
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].preview, "The <mark>cat</mark> sat on the");
    assert_eq!(results[0].chapter, 1);

    session.toggle_play().expect("play");
    session.select_search_result(&results[0]).expect("select");
    assert_eq!(session.current_word_group().as_deref(), Some("cat"));
    assert_eq!(session.state(), PlaybackState::Stopped);

    let events = session.drain_events();
    assert!(events.contains(&SessionEvent::PlaybackStopped {
        reason: StopReason::SearchJump
    }));
    assert!(events.contains(&SessionEvent::SelectionRequested {
        block: results[0].block,
        range: 4..7,
    }));
}
