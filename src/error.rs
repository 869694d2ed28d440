//! Error types for epub-combine operations.

use thiserror::Error;

/// Errors that can occur while combining EPUBs.
///
/// Input-side problems (a source that is not a ZIP, a malformed package
/// document) are logged and skipped by the combiner; only output-side
/// failures surface as an `Error` from [`crate::combine_epubs`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("Missing required element: {0}")]
    MissingElement(String),

    #[error("No input EPUBs given")]
    NoSources,

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, Error>;
