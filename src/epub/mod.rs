//! EPUB ingestion: archive → [`Book`](crate::Book).

mod package;
mod reader;

pub use package::{ManifestItem, Package, parse_nav, parse_ncx, rootfile_path};
pub use reader::{EPUB_MEDIA_TYPE, ImportResult, import_batch, parse_book, parse_book_bytes};
