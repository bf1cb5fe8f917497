mod common;

use common::{EpubBuilder, sample_book};
use lectern::{Error, import_batch, parse_book, parse_book_bytes};
use tempfile::TempDir;

#[test]
fn test_parse_metadata_and_chapters() {
    let book = parse_book_bytes(&sample_book().build(), None).expect("parse");

    assert_eq!(book.metadata.title, "Sample");
    assert_eq!(book.author(), "Ada Writer");
    assert_eq!(book.metadata.language, "en");
    assert_eq!(book.metadata.description.as_deref(), Some("A fixture book."));
    assert_eq!(book.chapter_titles(), vec!["Opening", "Second"]);
    assert_eq!(book.chapters[0].source_anchor, "text/ch0.xhtml");
    assert!(book.chapters[0].html.contains("<p>Hello, world.</p>"));
    assert_eq!(book.toc.len(), 2);
}

#[test]
fn test_chapter_markdown() {
    let book = parse_book_bytes(&sample_book().build(), None).expect("parse");
    assert_eq!(
        book.chapters[0].markdown,
        "# Opening\n\nHello, world.\n\nNew paragraph."
    );
}

#[test]
fn test_resources_and_cover() {
    let book = parse_book_bytes(&sample_book().build(), None).expect("parse");

    let cover = book.cover().expect("cover");
    assert_eq!(cover.media_type, "image/png");
    assert_eq!(cover.data, b"\x89PNG fake");
    assert!(book.resource("../images/pic.png").is_some());
    assert!(book.resource("OEBPS/Images/PIC.png").is_some());
    assert!(book.resource("mimetype").is_some());
}

#[test]
fn test_document_id_is_content_hash() {
    let data = sample_book().build();
    let a = parse_book_bytes(&data, None).expect("parse");
    let b = parse_book_bytes(&data, Some("application/epub+zip")).expect("parse");
    assert_eq!(a.id, b.id);
    assert_eq!(a.id.len(), 40);

    let other = parse_book_bytes(&sample_book().author("Someone Else").build(), None).expect("parse");
    assert_ne!(a.id, other.id);
}

#[test]
fn test_toc_label_beats_heading() {
    let data = EpubBuilder::new("Headings")
        .chapter("Listed", "<h2>Ignored Heading</h2><p>text</p>")
        .build();
    let book = parse_book_bytes(&data, None).expect("parse");
    assert_eq!(book.chapters[0].title, "Listed");
}

#[test]
fn test_rejects_declared_non_epub() {
    let err = parse_book_bytes(&sample_book().build(), Some("application/pdf")).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(_)));
}

#[test]
fn test_rejects_wrong_mimetype_entry() {
    let data = sample_book().mimetype("application/zip").build();
    let err = parse_book_bytes(&data, None).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(ref mt) if mt == "application/zip"));
}

#[test]
fn test_missing_container_is_malformed() {
    let data = sample_book().without_container().build();
    let err = parse_book_bytes(&data, None).unwrap_err();
    assert!(matches!(err, Error::MalformedArchive(_)));
}

#[test]
fn test_book_without_chapters_is_malformed() {
    let data = EpubBuilder::new("Empty").build();
    let err = parse_book_bytes(&data, None).unwrap_err();
    assert!(matches!(err, Error::MalformedArchive(_)));
}

#[test]
fn test_parse_book_from_disk() {
    let dir = TempDir::new().expect("tempdir");
    let path = sample_book().write_to(dir.path(), "sample.epub");
    let book = parse_book(&path).expect("parse");
    assert_eq!(book.chapters.len(), 2);

    let renamed = sample_book().write_to(dir.path(), "sample.pdf");
    assert!(matches!(parse_book(&renamed), Err(Error::UnsupportedFormat(_))));
}

#[test]
fn test_import_batch_reports_per_file() {
    let dir = TempDir::new().expect("tempdir");
    let good = sample_book().write_to(dir.path(), "good.epub");
    let broken = sample_book().without_container().write_to(dir.path(), "broken.epub");
    let text = dir.path().join("notes.txt");
    std::fs::write(&text, "just text").expect("write");
    let missing = dir.path().join("missing.epub");

    let results = import_batch([&good, &broken, &text, &missing]);
    assert_eq!(results.len(), 4);
    assert!(results[0].result.is_ok());
    assert!(matches!(results[1].result, Err(Error::MalformedArchive(_))));
    assert!(matches!(results[2].result, Err(Error::UnsupportedFormat(_))));
    assert!(matches!(results[3].result, Err(Error::Io(_))));
    assert_eq!(results[2].path, text);
}
