//! Error types for lectern operations.

use thiserror::Error;

/// Errors that can occur while ingesting books or driving a reading session.
///
/// End of document is deliberately absent: the locator reports it as `None`
/// and the session turns it into a stop transition.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Malformed archive: {0}")]
    MalformedArchive(String),

    /// Linearization was requested before the render pass produced content.
    #[error("document content is not rendered yet")]
    NotReady,

    /// Playback was requested on a document without a single word.
    #[error("document has no readable words")]
    NoContent,
}

pub type Result<T> = std::result::Result<T, Error>;
