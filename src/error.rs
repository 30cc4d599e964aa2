//! Error types for the pdfgfx library.

use std::io;
use thiserror::Error;

/// Result type alias for pdfgfx operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while reading documents and handling assets.
///
/// Conditions the pipeline treats as ordinary outcomes (degenerate geometry,
/// missing captions, references that match nothing) are not errors and never
/// surface here.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading documents or writing exported assets.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is not recognized as a PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF header carries a version we do not understand.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The document is encrypted and cannot be read.
    #[error("Document is encrypted")]
    Encrypted,

    /// The PDF structure is corrupted or malformed.
    #[error("Corrupted PDF structure: {0}")]
    Corrupted(String),

    /// A required PDF object is missing.
    #[error("Missing required object: {0}")]
    MissingObject(String),

    /// Page index is out of range (0-based index, page count).
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// Error decoding or re-encoding an embedded image.
    #[error("Image extraction error: {0}")]
    ImageExtract(String),

    /// Error rasterizing a figure region.
    #[error("Rendering error: {0}")]
    Render(String),

    /// A string does not follow the asset naming grammar.
    #[error("Invalid asset name: {0}")]
    InvalidAssetName(String),

    /// A document id contains characters outside `[A-Za-z0-9_]`.
    #[error("Invalid document id: {0:?}")]
    InvalidDocumentId(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageExtract(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Encrypted;
        assert_eq!(err.to_string(), "Document is encrypted");

        let err = Error::PageOutOfRange(10, 5);
        assert_eq!(
            err.to_string(),
            "Page 10 is out of range (document has 5 pages)"
        );

        let err = Error::InvalidDocumentId("my-doc".to_string());
        assert_eq!(err.to_string(), "Invalid document id: \"my-doc\"");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
