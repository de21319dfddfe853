pub mod compress;
pub mod convert;
pub mod ebook;
pub mod metadata;
pub mod scan;
pub mod text;
pub mod watermark;

use std::path::Path;

use serde::Serialize;

use crate::error::ServiceError;

/// The document-processing collaborator behind the batch runner.
///
/// File-producing operations write into a caller-supplied output path (the
/// runner hands out scoped temp paths); read-only operations return a
/// structured record instead.
pub trait DocumentService: Send + Sync {
    fn convert_to_docx(&self, input: &Path, output: &Path) -> Result<(), ServiceError>;

    /// Removes every image object and every text-show operation containing
    /// the literal `text` from all pages.
    fn strip_watermark(&self, input: &Path, text: &str, output: &Path)
        -> Result<(), ServiceError>;

    /// Re-encodes every embedded raster image as JPEG at `quality` (1-100).
    /// Images that fail to decode are left untouched; each such failure is
    /// returned as a warning alongside the success result.
    fn recompress_images(
        &self,
        input: &Path,
        quality: u8,
        output: &Path,
    ) -> Result<Vec<String>, ServiceError>;

    fn read_metadata(&self, input: &Path) -> Result<DocumentMetadata, ServiceError>;

    /// Advisory substring heuristics over the document — a triage aid, not a
    /// security boundary. False negatives are expected.
    fn scan_heuristics(&self, input: &Path) -> Result<ScanReport, ServiceError>;

    fn build_ebook(
        &self,
        input: &Path,
        title: &str,
        author: &str,
        output: &Path,
    ) -> Result<(), ServiceError>;
}

/// Production implementation on lopdf / image / zip / quick-xml.
#[derive(Default)]
pub struct PdfDocumentService;

impl PdfDocumentService {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentService for PdfDocumentService {
    fn convert_to_docx(&self, input: &Path, output: &Path) -> Result<(), ServiceError> {
        convert::convert_to_docx(input, output)
    }

    fn strip_watermark(
        &self,
        input: &Path,
        text: &str,
        output: &Path,
    ) -> Result<(), ServiceError> {
        watermark::strip_watermark(input, text, output)
    }

    fn recompress_images(
        &self,
        input: &Path,
        quality: u8,
        output: &Path,
    ) -> Result<Vec<String>, ServiceError> {
        compress::recompress_images(input, quality, output)
    }

    fn read_metadata(&self, input: &Path) -> Result<DocumentMetadata, ServiceError> {
        metadata::read_metadata(input)
    }

    fn scan_heuristics(&self, input: &Path) -> Result<ScanReport, ServiceError> {
        scan::scan_heuristics(input)
    }

    fn build_ebook(
        &self,
        input: &Path,
        title: &str,
        author: &str,
        output: &Path,
    ) -> Result<(), ServiceError> {
        ebook::build_ebook(input, title, author, output)
    }
}

/// Structured record returned by ExtractMetadata.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub file_size: u64,
    /// Latitude/longitude-shaped pairs spotted in page text. Best-effort
    /// enrichment, not validated GPS data.
    pub geo_candidates: Vec<GeoCandidate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoCandidate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Advisory findings returned by ScanSuspicious.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    /// Script markers found in the object graph (e.g. `/JavaScript`).
    pub script_markers: Vec<String>,
    /// Auto-action markers (e.g. `/OpenAction`, `/Launch`).
    pub action_markers: Vec<String>,
    /// Embedded-file markers (e.g. `/EmbeddedFile`).
    pub embedded_file_markers: Vec<String>,
    /// URI-scheme links extracted from annotations and page text.
    pub links: Vec<String>,
}

impl ScanReport {
    pub fn is_clean(&self) -> bool {
        self.script_markers.is_empty()
            && self.action_markers.is_empty()
            && self.embedded_file_markers.is_empty()
            && self.links.is_empty()
    }
}

pub(crate) fn is_image_stream(obj: &lopdf::Object) -> bool {
    if let lopdf::Object::Stream(stream) = obj {
        matches!(stream.dict.get(b"Subtype"),
            Ok(lopdf::Object::Name(name)) if name.as_slice() == b"Image")
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_report_is_clean() {
        let report = ScanReport::default();
        assert!(report.is_clean());

        let report = ScanReport {
            links: vec!["https://example.com".to_string()],
            ..Default::default()
        };
        assert!(!report.is_clean());
    }

    #[test]
    fn test_metadata_serializes() {
        let meta = DocumentMetadata {
            title: Some("Report".to_string()),
            page_count: 3,
            geo_candidates: vec![GeoCandidate {
                latitude: 47.3769,
                longitude: 8.5417,
            }],
            ..Default::default()
        };

        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"title\":\"Report\""));
        assert!(json.contains("\"page_count\":3"));
        assert!(json.contains("47.3769"));
    }
}
