//! Shared lopdf loading and page-text extraction helpers.

use std::path::Path;

use lopdf::Document;

use crate::error::ServiceError;

/// Loads a PDF from disk. Read failures map to `Io`; parse failures (corrupt,
/// truncated, encrypted without credentials) map to `UnsupportedInput`.
pub(crate) fn load_document(path: &Path) -> Result<Document, ServiceError> {
    let bytes = std::fs::read(path).map_err(|e| ServiceError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    Document::load_mem(&bytes)
        .map_err(|e| ServiceError::UnsupportedInput(format!("failed to parse PDF: {}", e)))
}

/// Extracts text per page, in page order. Pages whose text cannot be decoded
/// contribute an empty string rather than failing the document.
pub(crate) fn extract_page_texts(doc: &Document) -> Vec<String> {
    doc.get_pages()
        .keys()
        .map(|&page_num| doc.extract_text(&[page_num]).unwrap_or_default())
        .collect()
}

/// Whole-document text, page texts joined by newlines.
pub(crate) fn extract_text(doc: &Document) -> String {
    extract_page_texts(doc).join("\n")
}
