//! Metadata extraction from the document information dictionary, plus a
//! best-effort sweep of page text for coordinate-shaped pairs.

use std::path::Path;
use std::sync::OnceLock;

use lopdf::{Dictionary, Document, Object};
use regex::Regex;
use tracing::info_span;

use crate::error::ServiceError;

use super::text::{extract_text, load_document};
use super::{DocumentMetadata, GeoCandidate};

pub fn read_metadata(input: &Path) -> Result<DocumentMetadata, ServiceError> {
    let _span = info_span!("service.metadata").entered();

    let file_size = std::fs::metadata(input)
        .map_err(|e| ServiceError::Io {
            path: input.to_path_buf(),
            source: e,
        })?
        .len();
    let doc = load_document(input)?;

    let info = info_dictionary(&doc);
    let field = |key: &[u8]| info.and_then(|dict| dict_text(dict, key));

    Ok(DocumentMetadata {
        title: field(b"Title"),
        author: field(b"Author"),
        subject: field(b"Subject"),
        keywords: field(b"Keywords"),
        creator: field(b"Creator"),
        producer: field(b"Producer"),
        creation_date: field(b"CreationDate"),
        modification_date: field(b"ModDate"),
        page_count: doc.get_pages().len(),
        file_size,
        geo_candidates: find_geo_candidates(&extract_text(&doc)),
    })
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn dict_text(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        Object::String(bytes, _) => {
            let text = decode_pdf_text(bytes);
            (!text.is_empty()).then_some(text)
        }
        _ => None,
    }
}

/// PDF text strings are either PDFDocEncoding (ASCII-compatible here) or
/// UTF-16BE with a byte-order mark.
fn decode_pdf_text(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&utf16)
    } else {
        String::from_utf8_lossy(bytes).to_string()
    }
}

fn geo_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(-?\d{1,2}\.\d{3,8})\s*,\s*(-?\d{1,3}\.\d{3,8})")
            .expect("geo pattern compiles")
    })
}

/// Decimal pairs that plausibly look like latitude/longitude. Purely
/// syntactic; values outside coordinate range are discarded.
pub(crate) fn find_geo_candidates(text: &str) -> Vec<GeoCandidate> {
    let mut candidates = Vec::new();
    for caps in geo_regex().captures_iter(text) {
        let (Ok(latitude), Ok(longitude)) = (caps[1].parse::<f64>(), caps[2].parse::<f64>())
        else {
            continue;
        };
        if latitude.abs() > 90.0 || longitude.abs() > 180.0 {
            continue;
        }
        let candidate = GeoCandidate {
            latitude,
            longitude,
        };
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;
    use tempfile::TempDir;

    use crate::testpdf::{self, PageSpec};

    fn write_and_read(pdf: &[u8]) -> DocumentMetadata {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in.pdf");
        std::fs::write(&input, pdf).unwrap();
        read_metadata(&input).unwrap()
    }

    #[test]
    fn test_reads_info_dictionary_fields() {
        let pdf = testpdf::build_pdf(
            &[PageSpec::text_only("Page one"), PageSpec::text_only("Page two")],
            Some(dictionary! {
                "Title" => Object::string_literal("Field Notes"),
                "Author" => Object::string_literal("R. Amundsen"),
                "Producer" => Object::string_literal("pdfsuite tests"),
                "CreationDate" => Object::string_literal("D:20240115120000Z"),
            }),
            None,
        );

        let meta = write_and_read(&pdf);

        assert_eq!(meta.title.as_deref(), Some("Field Notes"));
        assert_eq!(meta.author.as_deref(), Some("R. Amundsen"));
        assert_eq!(meta.producer.as_deref(), Some("pdfsuite tests"));
        assert_eq!(meta.creation_date.as_deref(), Some("D:20240115120000Z"));
        assert!(meta.subject.is_none());
        assert_eq!(meta.page_count, 2);
        assert_eq!(meta.file_size, pdf.len() as u64);
    }

    #[test]
    fn test_missing_info_dictionary_yields_empty_fields() {
        let pdf = testpdf::pdf_with_pages(&["No info here"]);

        let meta = write_and_read(&pdf);

        assert!(meta.title.is_none());
        assert!(meta.author.is_none());
        assert_eq!(meta.page_count, 1);
    }

    #[test]
    fn test_geo_candidates_from_page_text() {
        let pdf = testpdf::pdf_with_pages(&[
            "Site surveyed at 47.3769, 8.5417 near the river",
            "Not coordinates: 1234.5, 6789.0 and plain prose",
        ]);

        let meta = write_and_read(&pdf);

        assert_eq!(meta.geo_candidates.len(), 1);
        assert!((meta.geo_candidates[0].latitude - 47.3769).abs() < 1e-9);
        assert!((meta.geo_candidates[0].longitude - 8.5417).abs() < 1e-9);
    }

    #[test]
    fn test_find_geo_candidates_filters_and_dedupes() {
        let text = "at -33.8688, 151.2093 then again -33.8688, 151.2093; bogus 95.123, 10.456";
        let candidates = find_geo_candidates(text);
        assert_eq!(candidates.len(), 1);
        assert!((candidates[0].longitude - 151.2093).abs() < 1e-9);
    }

    #[test]
    fn test_decode_utf16_title() {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in "Über uns".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_pdf_text(&bytes), "Über uns");
    }
}
