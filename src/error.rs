//! Error types for bookslice operations.

use thiserror::Error;

/// Errors that can occur while reading a book or writing its chapters.
///
/// Lookup misses during slicing (a document or anchor that cannot be found)
/// are not errors; they are logged and yield empty text.
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

    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("Missing required element: {0}")]
    MissingElement(String),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, Error>;
